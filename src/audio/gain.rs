//! Host-controlled mute and volume, shared between the USB control path and
//! the streaming path.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};

/// Gain applied at volume level 0 (about -60 dB).
pub const SILENCE_FLOOR_FACTOR: f32 = 0.001;

const MIN_LEVEL_DB: f32 = -40.0;
const MAX_LEVEL_DB: f32 = 0.0;
const MAX_LEVEL: u32 = 100;

/// Snapshot of the gain in effect for one transfer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainState {
    pub muted: bool,
    /// Linear amplitude factor in [0.001, 1.0]
    pub factor: f32,
}

/// Map a host volume level (0-100) onto a linear gain factor.
///
/// Levels 1..=100 follow a logarithmic curve from -40 dB to 0 dB. Level 0 is
/// pinned to a -60 dB floor instead of extending the curve. Anything above 100
/// is treated as 100.
pub fn volume_to_factor(level: u32) -> f32 {
    let level = level.min(MAX_LEVEL);
    if level == 0 {
        return SILENCE_FLOOR_FACTOR;
    }
    let db = MIN_LEVEL_DB + (level - 1) as f32 * (MAX_LEVEL_DB - MIN_LEVEL_DB) / 99.0;
    10f32.powf(db / 20.0)
}

/// Lock-free mute/volume state.
///
/// The factor is kept as raw `f32` bits in an `AtomicU32` so a reader never
/// sees a half-written float. Mute and factor are separate words; a transfer
/// may pair a fresh mute flag with the previous factor, which only lasts one
/// transfer.
pub struct GainControl {
    factor_bits: AtomicU32,
    muted: AtomicBool,
    level: AtomicU8,
}

impl Default for GainControl {
    fn default() -> Self {
        Self::new(MAX_LEVEL, false)
    }
}

impl GainControl {
    pub fn new(level: u32, muted: bool) -> Self {
        let level = level.min(MAX_LEVEL);
        Self {
            factor_bits: AtomicU32::new(volume_to_factor(level).to_bits()),
            muted: AtomicBool::new(muted),
            level: AtomicU8::new(level as u8),
        }
    }

    pub fn set_mute(&self, muted: bool) {
        self.muted.store(muted, Ordering::Release);
    }

    pub fn set_volume(&self, level: u32) {
        let level = level.min(MAX_LEVEL);
        self.factor_bits
            .store(volume_to_factor(level).to_bits(), Ordering::Release);
        self.level.store(level as u8, Ordering::Relaxed);
    }

    pub fn current_state(&self) -> GainState {
        GainState {
            muted: self.muted.load(Ordering::Acquire),
            factor: f32::from_bits(self.factor_bits.load(Ordering::Acquire)),
        }
    }

    /// Last volume level requested by the host.
    pub fn volume(&self) -> u32 {
        u32::from(self.level.load(Ordering::Relaxed))
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Relaxed)
    }
}
