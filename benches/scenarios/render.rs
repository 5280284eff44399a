//! Benchmarks for rendering module trees.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_net::{
    graph::{GraphItem, Network, Routing},
    io::AudioBuffer,
    module::{Gain, Panner, Sample, SamplePlayer},
    NetworkConfig,
};

use crate::BLOCK_SIZES;

const SAMPLE_RATE: f32 = 48_000.0;

fn noise_sample() -> Sample {
    // Cheap deterministic noise; content does not matter for timing
    let mut state = 0x1234_5678u32;
    let samples = (0..SAMPLE_RATE as usize)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state as f32 / u32::MAX as f32 * 2.0 - 1.0
        })
        .collect();
    Sample::mono(samples, SAMPLE_RATE)
}

/// `tracks` x (gain <- panner <- looping player)
fn build(tracks: usize) -> Network {
    let mut network = Network::new(NetworkConfig::new().sample_rate(SAMPLE_RATE));
    let sample = noise_sample();

    for i in 0..tracks {
        let player = SamplePlayer::new("player", sample.clone()).playing().looping(true);
        let item = GraphItem::new(Gain::new(format!("track{i}"), 0.5)).with_child(
            GraphItem::new(Panner::new("pan", i as f32 / tracks as f32 * 2.0 - 1.0))
                .with_child(GraphItem::new(player)),
        );
        network.add_item(None, item).expect("add track");
    }
    network.start().expect("start");
    network
}

pub fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/render");

    for &size in BLOCK_SIZES {
        let mut output = AudioBuffer::new(2, size);

        let mut empty = build(0);
        group.bench_with_input(BenchmarkId::new("empty", size), &size, |b, &n| {
            b.iter(|| empty.process(None, black_box(&mut output), n, 0.0))
        });

        let mut small = build(4);
        group.bench_with_input(BenchmarkId::new("4_tracks", size), &size, |b, &n| {
            b.iter(|| small.process(None, black_box(&mut output), n, 0.0))
        });

        let mut large = build(32);
        group.bench_with_input(BenchmarkId::new("32_tracks", size), &size, |b, &n| {
            b.iter(|| large.process(None, black_box(&mut output), n, 0.0))
        });

        // Flat: many leaves pinned to one channel
        let mut flat = Network::new(NetworkConfig::new().input_channels(1));
        for i in 0..32 {
            flat.add_item(
                None,
                GraphItem::new(Gain::new(format!("g{i}"), 0.1)).with_routing(Routing::Channel(0)),
            )
            .expect("add gain");
        }
        flat.start().expect("start");
        let mut input = AudioBuffer::new(1, size);
        input.fill(0.5);
        group.bench_with_input(BenchmarkId::new("32_pinned_leaves", size), &size, |b, &n| {
            b.iter(|| flat.process(Some(black_box(&input)), black_box(&mut output), n, 0.0))
        });
    }

    group.finish();
}
