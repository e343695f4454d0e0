//! In-place gain for 16-bit PCM transfers.

use super::gain::GainState;

#[inline]
fn scale(sample: i16, gain: GainState) -> i16 {
    if gain.muted {
        return 0;
    }
    let scaled = (f32::from(sample) * gain.factor).round();
    scaled.clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16
}

/// Apply `gain` to little-endian S16 samples packed in `buf`.
///
/// A trailing odd byte is not a whole sample and is left as is.
pub fn apply_gain(buf: &mut [u8], gain: GainState) {
    for bytes in buf.chunks_exact_mut(2) {
        let sample = i16::from_le_bytes([bytes[0], bytes[1]]);
        bytes.copy_from_slice(&scale(sample, gain).to_le_bytes());
    }
}

pub fn apply_gain_samples(samples: &mut [i16], gain: GainState) {
    for sample in samples.iter_mut() {
        *sample = scale(*sample, gain);
    }
}
