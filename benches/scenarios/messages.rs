//! Benchmarks for the control path: enqueue and drain.

use std::hint::black_box;

use criterion::{BatchSize, BenchmarkId, Criterion};
use saavy_net::{
    graph::{GraphItem, Network},
    io::AudioBuffer,
    module::{Gain, Panner},
    ControlMessage, NetworkConfig,
};

const FRAMES: usize = 128;

fn build() -> Network {
    let mut network = Network::new(NetworkConfig::new().queue_capacity(4096));
    for i in 0..16 {
        let item = GraphItem::new(Gain::new(format!("track{i}"), 0.5))
            .with_child(GraphItem::new(Panner::new("pan", 0.0)));
        network.add_item(None, item).expect("add track");
    }
    network.start().expect("start");
    network
}

pub fn bench_messages(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/messages");

    group.bench_function("send", |b| {
        let mut network = build();
        let sender = network.sender();
        let mut output = AudioBuffer::new(2, FRAMES);
        b.iter_batched(
            || ControlMessage::new("track3/pan/setpan").with_f32(0.25),
            |msg| {
                let _ = sender.send(black_box(msg));
                // Keep the queue from filling up
                network.process(None, &mut output, FRAMES, 0.0);
                network.collect();
            },
            BatchSize::SmallInput,
        )
    });

    for &count in &[1usize, 16, 256] {
        group.bench_with_input(BenchmarkId::new("drain", count), &count, |b, &count| {
            let mut network = build();
            let sender = network.sender();
            let mut output = AudioBuffer::new(2, FRAMES);
            b.iter_batched(
                || {
                    for i in 0..count {
                        let path = format!("track{}/setgain", i % 16);
                        let _ = sender.send(ControlMessage::new(path).with_f32(0.5));
                    }
                },
                |()| {
                    network.process(None, black_box(&mut output), FRAMES, 0.0);
                },
                BatchSize::PerIteration,
            );
            network.collect();
        });
    }

    group.bench_function("broadcast", |b| {
        let mut network = build();
        let sender = network.sender();
        let mut output = AudioBuffer::new(2, FRAMES);
        b.iter_batched(
            || {
                let _ = sender.send(ControlMessage::new("setgain").with_f32(0.5));
            },
            |()| network.process(None, black_box(&mut output), FRAMES, 0.0),
            BatchSize::PerIteration,
        );
        network.collect();
    });

    group.finish();
}
