//! Benchmarks for summing primitives.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_net::dsp::mix;

use crate::BLOCK_SIZES;

pub fn bench_mix(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/mix");

    for &size in BLOCK_SIZES {
        let signal: Vec<f32> = (0..size).map(|i| (i as f32 * 0.01).sin()).collect();
        let mut bus = vec![0.0f32; size];

        group.bench_with_input(BenchmarkId::new("sum_in_place", size), &size, |b, _| {
            b.iter(|| mix::sum_in_place(black_box(&mut bus), black_box(&signal)))
        });
    }

    group.finish();
}
