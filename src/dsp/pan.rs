//! Pan laws and mono-to-stereo splitting.

/*
Equal-Power Panning
===================

Panning places a mono signal between two speakers by giving each side its
own gain. The position runs from -1.0 (hard left) through 0.0 (center) to
+1.0 (hard right).

LINEAR law:
    left  = (1 - p) / 2
    right = (1 + p) / 2

    At center both sides sit at 0.5, and since uncorrelated power adds
    (not amplitude) the source sounds quieter in the middle.

EQUAL-POWER law (what we implement):
    θ     = (p + 1) × π/4          (0 .. π/2)
    left  = cos θ
    right = sin θ

    left² + right² = 1 for every position, so perceived loudness stays
    constant while the source moves. At center both gains are √½ ≈ 0.707
    (-3 dB).

       gain
       1.0 ┤╲                 ╱
           │  ╲             ╱
     0.707 ┤    ╲    ✕    ╱      ← both sides meet at -3 dB
           │      ╲     ╱
       0.0 ┼────────────────────
          -1.0     0.0     +1.0
                 position
*/

use std::f32::consts::FRAC_PI_4;

/// Left/right gains for a pan position using the equal-power law.
///
/// Positions outside `[-1.0, 1.0]` are clamped; NaN pans to center.
#[inline]
pub fn equal_power(position: f32) -> (f32, f32) {
    let position = if position.is_nan() {
        0.0
    } else {
        position.clamp(-1.0, 1.0)
    };
    let theta = (position + 1.0) * FRAC_PI_4;
    (theta.cos(), theta.sin())
}

/// Split a mono signal into left and right with the given gains.
#[inline]
pub fn split(mono: &[f32], left_gain: f32, right_gain: f32, left: &mut [f32], right: &mut [f32]) {
    for ((&s, l), r) in mono.iter().zip(left.iter_mut()).zip(right.iter_mut()) {
        *l = s * left_gain;
        *r = s * right_gain;
    }
}
