//! Gain primitives.

/*
Gain and Decibels
=================

A gain stage multiplies every sample by a constant:

    output[i] = input[i] × gain

  gain > 1.0  →  louder
  gain = 1.0  →  unchanged (unity)
  gain < 1.0  →  quieter
  gain = 0.0  →  silence

Control surfaces usually speak decibels because hearing is logarithmic:

    gain = 10^(dB / 20)        dB = 20 × log₁₀(gain)

    0 dB = ×1.0    -6 dB ≈ ×0.5    -20 dB = ×0.1    +6 dB ≈ ×2.0

Anything at or below MIN_DB is treated as silence so that "-inf" faders map
to an exact zero instead of a denormal-prone tiny value.
*/

/// Level at or below which a decibel value maps to silence.
pub const MIN_DB: f32 = -96.0;

/// Convert decibels to a linear gain factor.
#[inline]
pub fn db_to_gain(db: f32) -> f32 {
    if db <= MIN_DB || db.is_nan() {
        0.0
    } else {
        10.0_f32.powf(db / 20.0)
    }
}

/// Convert a linear gain factor to decibels, floored at [`MIN_DB`].
#[inline]
pub fn gain_to_db(gain: f32) -> f32 {
    if gain <= 0.0 || gain.is_nan() {
        MIN_DB
    } else {
        (20.0 * gain.log10()).max(MIN_DB)
    }
}

/// Multiply a signal by a constant gain factor (in-place).
#[inline]
pub fn apply_gain(signal: &mut [f32], gain: f32) {
    for sample in signal.iter_mut() {
        *sample *= gain;
    }
}

/// Write `input × gain` into `out`. Extra samples on either side are ignored.
#[inline]
pub fn gain_into(input: &[f32], gain: f32, out: &mut [f32]) {
    for (o, &s) in out.iter_mut().zip(input.iter()) {
        *o = s * gain;
    }
}
