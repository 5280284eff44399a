//! Low-level DSP primitives used by the built-in modules.
//!
//! These are allocation-free slice operations, safe to call from `process`.

/// Gain and level conversion.
pub mod gain;
/// Additive summing.
pub mod mix;
/// Pan laws.
pub mod pan;
