//! uac_bridge - USB Audio Class gadget to I2S bridge.
//!
//! Audio the USB host plays is gain-adjusted and written to the I2S
//! speaker. When enabled, the PDM microphone is read back to the host.

pub mod audio;
pub mod config;
pub mod gadget;
pub mod uac;
