//! Device-side driver for the kernel UAC gadget function.
//!
//! The gadget shows up as an ALSA card: audio the host plays arrives on its
//! capture PCM, audio for the host goes to its playback PCM, and the host's
//! volume/mute requests land on a mixer element. This module turns those into
//! [`UacCallbacks`] calls.
//!
//! Uses std::thread (NOT tokio tasks) for the transfer paths so a blocking
//! hardware write never stalls the async runtime.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use alsa::mixer::{Mixer, Selem, SelemChannelId, SelemId};
use anyhow::{Context, Result};
use tokio::sync::mpsc;

use crate::audio::alsa_device::{self, AlsaParams};
use crate::audio::transport::{OutputTransport, PcmSource};
use crate::config::Config;
use crate::uac::UacCallbacks;

/// A control request from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    Mute(bool),
    /// Volume level, 0-100
    Volume(u32),
}

/// Map a raw mixer value in `[min, max]` linearly onto 0-100.
pub fn mixer_to_level(raw: i64, min: i64, max: i64) -> u32 {
    if max <= min {
        return 100;
    }
    let raw = raw.clamp(min, max);
    let span = max - min;
    (((raw - min) * 100 + span / 2) / span) as u32
}

fn period_duration(params: &AlsaParams) -> Duration {
    Duration::from_micros(
        params.period_size as u64 * 1_000_000 / u64::from(params.sample_rate.max(1)),
    )
}

/// Threads servicing the gadget endpoints.
///
/// - Speaker thread: gadget capture → `callbacks.output` (gain + I2S write)
/// - Mic thread: `callbacks.input` (PDM read) → gadget playback
/// - Control thread: gadget mixer → `ControlEvent`s on `control_tx`
pub struct UacGadget {
    running: Arc<AtomicBool>,
    speaker_handle: Option<JoinHandle<()>>,
    mic_handle: Option<JoinHandle<()>>,
    control_handle: Option<JoinHandle<()>>,
}

impl UacGadget {
    pub fn start<C: UacCallbacks + 'static>(
        config: &Config,
        callbacks: Arc<C>,
        control_tx: mpsc::Sender<ControlEvent>,
    ) -> Result<Self> {
        let running = Arc::new(AtomicBool::new(true));

        log::info!(
            "UacGadget starting: capture: \"{}\", playback: \"{}\", mixer: \"{}\"/\"{}\", mic: {}",
            config.gadget_capture_device,
            config.gadget_playback_device,
            config.gadget_mixer_card,
            config.gadget_mixer_control,
            config.mic_enabled,
        );

        let speaker_handle = {
            let running = running.clone();
            let config = config.clone();
            let callbacks = callbacks.clone();
            thread::Builder::new()
                .name("uac-speaker".into())
                .spawn(move || {
                    if let Err(e) = speaker_thread(&config, &*callbacks, &running) {
                        log::error!("Speaker thread error: {:#}", e);
                    }
                })?
        };

        // The default gadget has no microphone interface, so nothing ever
        // asks for input unless it is switched on.
        let mic_handle = if config.mic_enabled {
            let running = running.clone();
            let config = config.clone();
            let callbacks = callbacks.clone();
            Some(
                thread::Builder::new()
                    .name("uac-mic".into())
                    .spawn(move || {
                        if let Err(e) = mic_thread(&config, &*callbacks, &running) {
                            log::error!("Microphone thread error: {:#}", e);
                        }
                    })?,
            )
        } else {
            None
        };

        let control_handle = {
            let running = running.clone();
            let config = config.clone();
            thread::Builder::new()
                .name("uac-control".into())
                .spawn(move || {
                    if let Err(e) = control_thread(&config, control_tx, &running) {
                        log::error!("Control thread error: {:#}", e);
                    }
                })?
        };

        Ok(Self {
            running,
            speaker_handle: Some(speaker_handle),
            mic_handle,
            control_handle: Some(control_handle),
        })
    }

    /// Signal threads to stop and wait for the control thread.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(h) = self.control_handle.take() {
            let _ = h.join();
        }
        // Streaming threads may sit in a blocking read until the host sends
        // another packet. We detach them here to avoid blocking.
        self.speaker_handle.take();
        self.mic_handle.take();
    }
}

impl Drop for UacGadget {
    fn drop(&mut self) {
        self.stop();
    }
}

// ======================== Speaker thread ========================

fn speaker_thread(config: &Config, callbacks: &dyn UacCallbacks, running: &AtomicBool) -> Result<()> {
    let period_size_opt = if config.speaker_period_size > 0 {
        Some(config.speaker_period_size)
    } else {
        None
    };
    let mut gadget = alsa_device::open_capture(
        config.gadget_capture_device,
        config.speaker_sample_rate,
        config.speaker_channels,
        period_size_opt,
    )
    .context("Failed to open gadget capture")?;

    let params = gadget.params().clone();
    let backoff = period_duration(&params);
    let mut buf = vec![0u8; params.period_bytes()];
    let mut dropped: u64 = 0;

    log::info!(
        "Speaker streaming started: rate={}, ch={}, period={} ({} bytes)",
        params.sample_rate,
        params.channels,
        params.period_size,
        buf.len(),
    );

    while running.load(Ordering::Relaxed) {
        match gadget.read(&mut buf) {
            Ok(0) => continue,
            Ok(n) => {
                if let Err(e) = callbacks.output(&mut buf[..n]) {
                    dropped += 1;
                    log::debug!("Speaker transfer {} failed: {}", dropped, e);
                }
            }
            Err(e) => {
                log::debug!("Gadget capture error: {}", e);
                thread::sleep(backoff);
            }
        }
    }

    log::info!("Speaker streaming stopped, {} transfers dropped", dropped);
    Ok(())
}

// ======================== Microphone thread ========================

fn mic_thread(config: &Config, callbacks: &dyn UacCallbacks, running: &AtomicBool) -> Result<()> {
    let gadget = alsa_device::open_playback(
        config.gadget_playback_device,
        config.mic_sample_rate,
        config.mic_channels,
        None,
    )
    .context("Failed to open gadget playback")?;

    let params = gadget.params().clone();
    let backoff = period_duration(&params);
    let mut buf = vec![0u8; params.period_bytes()];
    let mut to_host = OutputTransport::new(Some(gadget));

    log::info!(
        "Microphone streaming started: rate={}, ch={}, period={}",
        params.sample_rate,
        params.channels,
        params.period_size,
    );

    while running.load(Ordering::Relaxed) {
        match callbacks.input(&mut buf) {
            Ok(0) => continue,
            Ok(n) => {
                if let Err(e) = to_host.write(&buf[..n]) {
                    log::debug!("Gadget playback error: {}", e);
                }
            }
            Err(e) => {
                log::debug!("Microphone transfer failed: {}", e);
                thread::sleep(backoff);
            }
        }
    }

    log::info!("Microphone streaming stopped");
    Ok(())
}

// ======================== Control thread ========================

/// Current (raw volume, muted) of the element, from whichever direction it
/// exposes.
fn read_selem(selem: &Selem) -> Result<(Option<u32>, Option<bool>)> {
    let ch = SelemChannelId::mono();
    let volume = if selem.has_capture_volume() {
        let (min, max) = selem.get_capture_volume_range();
        Some(mixer_to_level(selem.get_capture_volume(ch)?, min, max))
    } else if selem.has_playback_volume() {
        let (min, max) = selem.get_playback_volume_range();
        Some(mixer_to_level(selem.get_playback_volume(ch)?, min, max))
    } else {
        None
    };
    // switch on = audio passes
    let muted = if selem.has_capture_switch() {
        Some(selem.get_capture_switch(ch)? == 0)
    } else if selem.has_playback_switch() {
        Some(selem.get_playback_switch(ch)? == 0)
    } else {
        None
    };
    Ok((volume, muted))
}

fn control_thread(
    config: &Config,
    control_tx: mpsc::Sender<ControlEvent>,
    running: &AtomicBool,
) -> Result<()> {
    let mixer = Mixer::new(config.gadget_mixer_card, false)
        .with_context(|| format!("Failed to open mixer '{}'", config.gadget_mixer_card))?;
    let id = SelemId::new(config.gadget_mixer_control, 0);
    let poll = Duration::from_millis(config.control_poll_ms);

    let mut last_volume: Option<u32> = None;
    let mut last_muted: Option<bool> = None;

    log::info!("Control polling started: every {}ms", config.control_poll_ms);

    while running.load(Ordering::Relaxed) {
        mixer.handle_events()?;
        let selem = mixer.find_selem(&id).with_context(|| {
            format!("Mixer control '{}' not found", config.gadget_mixer_control)
        })?;
        let (volume, muted) = read_selem(&selem)?;

        let mut events = Vec::with_capacity(2);
        if muted.is_some() && muted != last_muted {
            last_muted = muted;
            events.extend(muted.map(ControlEvent::Mute));
        }
        if volume.is_some() && volume != last_volume {
            last_volume = volume;
            events.extend(volume.map(ControlEvent::Volume));
        }
        for event in events {
            if control_tx.blocking_send(event).is_err() {
                log::warn!("Failed to send control event, receiver dropped");
                return Ok(());
            }
        }

        thread::sleep(poll);
    }

    log::info!("Control polling stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixer_endpoints() {
        assert_eq!(mixer_to_level(-25600, -25600, 0), 0);
        assert_eq!(mixer_to_level(0, -25600, 0), 100);
        assert_eq!(mixer_to_level(0, 0, 255), 0);
        assert_eq!(mixer_to_level(255, 0, 255), 100);
    }

    #[test]
    fn test_mixer_rounds_to_nearest() {
        assert_eq!(mixer_to_level(-12800, -25600, 0), 50);
        assert_eq!(mixer_to_level(127, 0, 255), 50);
        assert_eq!(mixer_to_level(1, 0, 3), 33);
        assert_eq!(mixer_to_level(2, 0, 3), 67);
    }

    #[test]
    fn test_mixer_out_of_range_clamps() {
        assert_eq!(mixer_to_level(-99999, -100, 0), 0);
        assert_eq!(mixer_to_level(500, -100, 0), 100);
    }

    #[test]
    fn test_mixer_degenerate_range() {
        assert_eq!(mixer_to_level(7, 7, 7), 100);
        assert_eq!(mixer_to_level(0, 10, 0), 100);
    }

    #[test]
    fn test_period_duration() {
        let params = AlsaParams {
            sample_rate: 16000,
            channels: 1,
            period_size: 256,
        };
        assert_eq!(period_duration(&params), Duration::from_millis(16));
    }
}
