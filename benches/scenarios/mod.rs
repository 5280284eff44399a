//! Whole-network benchmarks.
//!
//! These build module trees the way an application would and measure a
//! full callback: drain, render, mix.

mod messages;
mod render;

pub use messages::bench_messages;
pub use render::bench_render;
