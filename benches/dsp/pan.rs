//! Benchmarks for panning primitives.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_net::dsp::pan;

use crate::BLOCK_SIZES;

pub fn bench_pan(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/pan");

    for &size in BLOCK_SIZES {
        let mono: Vec<f32> = (0..size).map(|i| (i as f32 * 0.01).sin()).collect();
        let mut left = vec![0.0f32; size];
        let mut right = vec![0.0f32; size];
        let (lg, rg) = pan::equal_power(0.3);

        group.bench_with_input(BenchmarkId::new("split", size), &size, |b, _| {
            b.iter(|| {
                pan::split(
                    black_box(&mono),
                    black_box(lg),
                    black_box(rg),
                    black_box(&mut left),
                    black_box(&mut right),
                )
            })
        });
    }

    group.bench_function("equal_power", |b| {
        b.iter(|| pan::equal_power(black_box(-0.4)))
    });

    group.finish();
}
