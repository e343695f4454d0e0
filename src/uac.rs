//! Glue between the USB audio class callbacks and the hardware transports.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::audio::gain::GainControl;
use crate::audio::processor::apply_gain;
use crate::audio::transport::{
    InputTransport, OutputTransport, PcmSink, PcmSource, TransportError,
};

/// The four entry points the USB audio class layer drives.
///
/// `output` and `input` are called once per isochronous transfer from the
/// streaming contexts. `set_mute` and `set_volume` come from control requests
/// and may run concurrently with a transfer.
pub trait UacCallbacks: Send + Sync {
    /// Host -> device audio (speaker). `buf` holds S16LE samples and is
    /// modified in place.
    fn output(&self, buf: &mut [u8]) -> Result<(), TransportError>;

    /// Device -> host audio (microphone). Returns how many bytes of `buf`
    /// were filled.
    fn input(&self, buf: &mut [u8]) -> Result<usize, TransportError>;

    fn set_mute(&self, muted: bool);

    /// `level` is the host volume, 0-100.
    fn set_volume(&self, level: u32);
}

/// Each direction sits behind its own lock, so a speaker transfer blocked
/// on the hardware never holds up the microphone path or a control request.
pub struct StreamingEndpointBridge<S, R> {
    gain: Arc<GainControl>,
    output: Mutex<OutputTransport<S>>,
    input: Mutex<InputTransport<R>>,
}

fn relock<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicked transfer leaves the transport itself intact
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S: PcmSink, R: PcmSource> StreamingEndpointBridge<S, R> {
    pub fn new(
        gain: Arc<GainControl>,
        output: OutputTransport<S>,
        input: InputTransport<R>,
    ) -> Self {
        Self {
            gain,
            output: Mutex::new(output),
            input: Mutex::new(input),
        }
    }

    pub fn gain(&self) -> &Arc<GainControl> {
        &self.gain
    }

    pub fn has_output(&self) -> bool {
        relock(&self.output).is_available()
    }

    pub fn has_input(&self) -> bool {
        relock(&self.input).is_available()
    }
}

impl<S: PcmSink, R: PcmSource> UacCallbacks for StreamingEndpointBridge<S, R> {
    fn output(&self, buf: &mut [u8]) -> Result<(), TransportError> {
        let mut output = relock(&self.output);
        if !output.is_available() {
            return Err(TransportError::Unavailable);
        }
        let len = buf.len();
        apply_gain(buf, self.gain.current_state());
        output.write(buf).inspect_err(|e| {
            log::warn!("Speaker transfer of {} bytes dropped: {}", len, e);
        })
    }

    fn input(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let mut input = relock(&self.input);
        if !input.is_available() {
            return Err(TransportError::Unavailable);
        }
        let len = buf.len();
        input.read(buf).inspect_err(|e| {
            log::warn!("Microphone transfer of {} bytes failed: {}", len, e);
        })
    }

    fn set_mute(&self, muted: bool) {
        self.gain.set_mute(muted);
    }

    fn set_volume(&self, level: u32) {
        self.gain.set_volume(level);
    }
}
