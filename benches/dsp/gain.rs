//! Benchmarks for gain primitives.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_net::dsp::gain;

use crate::BLOCK_SIZES;

pub fn bench_gain(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/gain");

    for &size in BLOCK_SIZES {
        let signal: Vec<f32> = (0..size)
            .map(|i| (i as f32 / size as f32) * 2.0 - 1.0)
            .collect();
        let mut output = vec![0.0f32; size];

        group.bench_with_input(BenchmarkId::new("gain_into", size), &size, |b, _| {
            b.iter(|| gain::gain_into(black_box(&signal), black_box(0.5), black_box(&mut output)))
        });

        let mut signal_copy = signal.clone();
        group.bench_with_input(BenchmarkId::new("apply_gain", size), &size, |b, _| {
            b.iter(|| {
                signal_copy.copy_from_slice(&signal);
                gain::apply_gain(black_box(&mut signal_copy), black_box(0.5))
            })
        });
    }

    group.bench_function("db_to_gain", |b| {
        b.iter(|| gain::db_to_gain(black_box(-12.0)))
    });

    group.finish();
}
