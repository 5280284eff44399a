//! Network configuration.
//!
//! Plain structs with defaults and builder-style setters. With the `serde`
//! feature they can be loaded from any serde format.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::MAX_CYCLE_SIZE;

/// Stream layout negotiated between the network and the audio backend.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamSpec {
    /// Sample rate in Hz
    pub sample_rate: f32,
    /// Channels of live input handed to leaf items
    pub input_channels: usize,
    /// Channels of the destination buffer
    pub output_channels: usize,
    /// Largest frame count a single render pass may request
    pub max_frames: usize,
}

impl Default for StreamSpec {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            input_channels: 0,
            output_channels: 2,
            max_frames: MAX_CYCLE_SIZE,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConfig {
    pub stream: StreamSpec,
    /// Capacity of the control queue (commands in flight)
    pub queue_capacity: usize,
    /// Capacity of the ring carrying processed commands back for cleanup.
    /// Raised to at least `max_items + 1`. While it is full the render side
    /// leaves commands queued.
    pub report_capacity: usize,
    /// Top-level item slots reserved up front. Adds beyond this are rejected.
    pub max_items: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            stream: StreamSpec::default(),
            queue_capacity: 1024,
            report_capacity: 2048,
            max_items: 256,
        }
    }
}

impl NetworkConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample_rate(mut self, sample_rate: f32) -> Self {
        self.stream.sample_rate = sample_rate;
        self
    }

    pub fn input_channels(mut self, channels: usize) -> Self {
        self.stream.input_channels = channels;
        self
    }

    pub fn output_channels(mut self, channels: usize) -> Self {
        self.stream.output_channels = channels;
        self
    }

    /// Set the control queue capacity. The report ring is sized to twice
    /// this so a full drain always has room to hand commands back.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self.report_capacity = self.queue_capacity * 2;
        self
    }

    pub fn max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }
}
