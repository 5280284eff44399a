//! Benchmarks for sample-level primitives.

mod gain;
mod mix;
mod pan;

pub use gain::bench_gain;
pub use mix::bench_mix;
pub use pan::bench_pan;
