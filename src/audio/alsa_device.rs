//! ALSA PCM device wrappers for the I2S speaker, the PDM microphone and the
//! UAC gadget card.

use alsa::pcm::{Access, Format, HwParams, PCM};
use alsa::{Direction, ValueOr};
use anyhow::{Context, Result};

use super::transport::{PcmSink, PcmSource, TransportError};

const BYTES_PER_SAMPLE: usize = 2;

/// Parameters negotiated with the ALSA hardware.
#[derive(Debug, Clone)]
pub struct AlsaParams {
    /// Actual sample rate after negotiation
    pub sample_rate: u32,
    /// Actual number of channels
    pub channels: u32,
    /// Period size in frames (one frame = channels × sample_width)
    pub period_size: usize,
}

impl AlsaParams {
    pub fn frame_bytes(&self) -> usize {
        self.channels as usize * BYTES_PER_SAMPLE
    }

    pub fn period_bytes(&self) -> usize {
        self.period_size * self.frame_bytes()
    }
}

/// An opened, blocking S16LE PCM. One `write`/`read` is one `writei`/`readi`.
pub struct AlsaPcm {
    pcm: PCM,
    params: AlsaParams,
    name: String,
}

impl AlsaPcm {
    pub fn params(&self) -> &AlsaParams {
        &self.params
    }

    fn recover(&self, e: alsa::Error) -> TransportError {
        log::warn!("ALSA {} error: {}, recovering...", self.name, e);
        if let Err(e2) = self.pcm.prepare() {
            log::error!("Failed to recover PCM {}: {}", self.name, e2);
        }
        TransportError::Failure(e.to_string())
    }
}

impl PcmSink for AlsaPcm {
    fn write(&mut self, buf: &[u8]) -> Result<usize, TransportError> {
        let frame_bytes = self.params.frame_bytes();
        if buf.len() < frame_bytes {
            return Err(TransportError::Failure(format!(
                "{} trailing bytes do not form a whole frame",
                buf.len()
            )));
        }
        match self.pcm.io_bytes().writei(buf) {
            Ok(frames) => Ok(frames * frame_bytes),
            Err(e) => Err(self.recover(e)),
        }
    }
}

impl PcmSource for AlsaPcm {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let frame_bytes = self.params.frame_bytes();
        match self.pcm.io_bytes().readi(buf) {
            Ok(frames) => Ok(frames * frame_bytes),
            Err(e) => Err(self.recover(e)),
        }
    }
}

/// Open a PCM device for capture (recording).
pub fn open_capture(
    device: &str,
    sample_rate: u32,
    channels: u32,
    period_size: Option<usize>,
) -> Result<AlsaPcm> {
    open_pcm(device, Direction::Capture, sample_rate, channels, period_size, "Capture")
}

/// Open a PCM device for playback.
pub fn open_playback(
    device: &str,
    sample_rate: u32,
    channels: u32,
    period_size: Option<usize>,
) -> Result<AlsaPcm> {
    open_pcm(
        device,
        Direction::Playback,
        sample_rate,
        channels,
        period_size,
        "Playback",
    )
}

fn open_pcm(
    device: &str,
    direction: Direction,
    sample_rate: u32,
    channels: u32,
    period_size: Option<usize>,
    dir_name: &str,
) -> Result<AlsaPcm> {
    // Blocking mode: writei/readi wait for DMA space without a timeout
    let pcm = PCM::new(device, direction, false)
        .with_context(|| format!("Failed to open PCM device '{}' for {}", device, dir_name))?;

    // Configure hardware parameters
    {
        let hwp =
            HwParams::any(&pcm).with_context(|| "Failed to initialize HwParams")?;
        hwp.set_access(Access::RWInterleaved)?;
        hwp.set_format(Format::S16LE)?;
        hwp.set_channels(channels)?;
        hwp.set_rate_near(sample_rate, ValueOr::Nearest)?;
        if let Some(ps) = period_size {
            hwp.set_period_size_near(ps as alsa::pcm::Frames, ValueOr::Nearest)?;
        }
        pcm.hw_params(&hwp)?;
    }

    // Read back actual negotiated parameters
    let (actual_rate, actual_channels, period_size) = {
        let hwp = pcm.hw_params_current()?;
        let rate = hwp.get_rate()?;
        let ch = hwp.get_channels()?;
        let ps = hwp.get_period_size()? as usize;
        (rate, ch, ps)
    };

    if actual_rate != sample_rate {
        log::warn!(
            "ALSA {}: device={} runs at {}Hz instead of {}Hz, no resampling is done",
            dir_name,
            device,
            actual_rate,
            sample_rate,
        );
    }

    let params = AlsaParams {
        sample_rate: actual_rate,
        channels: actual_channels,
        period_size,
    };

    log::info!(
        "ALSA {}: device={}, rate={}, channels={}, period_size={}",
        dir_name,
        device,
        actual_rate,
        actual_channels,
        period_size,
    );

    Ok(AlsaPcm {
        pcm,
        params,
        name: format!("{} {}", dir_name, device),
    })
}
