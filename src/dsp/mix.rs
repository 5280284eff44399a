//! Summing primitives for combining module outputs.

/*
Additive Mixing
===============

Every item in a network writes into the same output by ADDING to it. Two
siblings on the same channel are heard together, and nothing is averaged
or weighted on the way in:

    sibling A:  [ 0.5,  0.5, -0.5]
    sibling B:  [ 0.5,  0.8,  0.2]
    channel:    [ 1.0,  1.3, -0.3]   ← may leave [-1.0, +1.0]

Keeping the sum unweighted means adding a module never changes the level
of the ones already there. Headroom is the job of a gain stage above them
(a parent `Gain`, or the master).

Order does not matter for the result beyond float rounding, so children
can be rendered in registration order.
*/

/// Add signal B into signal A in-place (summing).
///
/// Only the overlapping length is touched.
///
/// ⚠️ WARNING: Can exceed [-1.0, +1.0] range!
#[inline]
pub fn sum_in_place(a: &mut [f32], b: &[f32]) {
    for (sa, &sb) in a.iter_mut().zip(b.iter()) {
        *sa += sb;
    }
}
