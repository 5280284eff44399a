//! Network setup and lifecycle for the monitor

use std::f32::consts::TAU;

use color_eyre::eyre::{Result as EyreResult, WrapErr};
use tracing::{info, warn};

use saavy_net::{
    graph::{GraphItem, Network},
    io::{CpalBackend, NullBackend},
    module::{Gain, Panner, Sample, SamplePlayer},
    NetworkConfig,
};

use crate::ui::{UiApp, UiInit};

/// Samples mirrored to the scope, in multiples of the scope window
const TAP_CAPACITY: usize = 1024 * 16;
const NULL_BACKEND_FRAMES: usize = 256;
const TONE_RATE: f32 = 48_000.0;

/// Path of each item in the demo tree
pub const MASTER: &str = "master";
pub const PAN: &str = "master/pan";
pub const TONE: &str = "master/pan/tone";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Device,
    Null,
}

pub struct App {
    output: Output,
}

impl App {
    pub fn new(output: Output) -> Self {
        Self { output }
    }

    pub fn run(self) -> EyreResult<()> {
        let mut network = Network::new(NetworkConfig::new());
        let tap = network
            .attach_tap(TAP_CAPACITY)
            .wrap_err("failed to attach scope tap")?;

        network
            .add_item(None, demo_tree())
            .wrap_err("failed to add demo items")?;

        let backend_name = match self.output {
            Output::Device => match network.start_with(CpalBackend::new()) {
                Ok(()) => "device",
                Err(err) => {
                    warn!(error = %err, "no audio device; nothing will be heard");
                    return Err(err).wrap_err("failed to start audio output (try --null)");
                }
            },
            Output::Null => {
                network
                    .start_with(NullBackend::new(NULL_BACKEND_FRAMES))
                    .wrap_err("failed to start null backend")?;
                "null"
            }
        };
        info!(backend = backend_name, "monitor running");

        let init = UiInit {
            spec: network.spec(),
            backend: backend_name,
            paths: vec![MASTER, PAN, TONE],
        };

        let mut terminal = ratatui::init();
        let result = UiApp::new(&mut network, tap, init).run(&mut terminal);
        ratatui::restore();

        network.stop();
        result
    }
}

/// master (gain) <- pan (panner) <- tone (looping sample)
fn demo_tree() -> GraphItem {
    let tone = SamplePlayer::new("tone", chord_sample()).playing().looping(true);

    GraphItem::new(Gain::new("master", 0.5)).with_child(
        GraphItem::new(Panner::new("pan", 0.0)).with_child(GraphItem::new(tone)),
    )
}

/// Two seconds of a just-tuned A minor triad with a slow tremolo. Every
/// partial completes whole cycles, so the loop point is seamless.
fn chord_sample() -> Sample {
    let frames = (TONE_RATE * 2.0) as usize;
    let partials = [220.0, 264.0, 330.0];

    let samples = (0..frames)
        .map(|i| {
            let t = i as f32 / TONE_RATE;
            let tremolo = 0.75 + 0.25 * (TAU * 2.0 * t).sin();
            let sum: f32 = partials.iter().map(|&f| (TAU * f * t).sin()).sum();
            sum / partials.len() as f32 * tremolo * 0.5
        })
        .collect();

    Sample::mono(samples, TONE_RATE)
}
