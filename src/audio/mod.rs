//! audio - Gain, sample processing and hardware transports for the speaker
//! and microphone paths.
//!
//! Uses ALSA for the I2S/PDM channels. The USB side lives in `uac` and
//! `gadget`.

pub mod alsa_device;
pub mod gain;
pub mod processor;
pub mod transport;

pub use gain::{GainControl, GainState};
pub use transport::{InputTransport, OutputTransport, TransportError};
