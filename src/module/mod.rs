//! The processing module contract and the built-in modules.
//!
//! A module is the unit of work in the network. The network owns every
//! module it renders; modules only see their own input and output buffers and
//! the control messages addressed to them.

/// Constant or message-controlled gain stage.
pub mod gain;
/// Mono-to-stereo equal-power panner.
pub mod panner;
/// In-memory sample playback.
pub mod sample_player;

pub use gain::Gain;
pub use panner::Panner;
pub use sample_player::{Sample, SamplePlayer};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{config::StreamSpec, io::AudioBuffer, message::ControlMessage};

/// Channel counts negotiated in [`Module::prepare`].
///
/// The network fills in the counts it would like; the module may lower (or
/// raise) them to what it actually produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelLayout {
    pub inputs: usize,
    pub outputs: usize,
}

impl ChannelLayout {
    pub fn new(inputs: usize, outputs: usize) -> Self {
        Self { inputs, outputs }
    }
}

/// Context passed to modules during rendering
///
/// - sample_rate: Audio sample rate (e.g., 48000.0)
/// - time: Stream time of the first frame, in seconds
/// - frame: Running frame counter of the first frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessCtx {
    pub sample_rate: f32,
    pub time: f64,
    pub frame: u64,
}

/// Named attribute value for inspection and persistence.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Float(f32),
    Int(i64),
    Bool(bool),
    Text(String),
}

impl AttributeValue {
    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            AttributeValue::Float(v) => Some(v),
            AttributeValue::Int(v) => Some(v as f32),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            AttributeValue::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            AttributeValue::Bool(v) => Some(v),
            _ => None,
        }
    }
}

/// Core trait for audio processing modules
///
/// `process` runs on the realtime thread: it must not allocate, lock, or
/// block. Everything else runs on control threads.
pub trait Module: Send {
    /// Routing id. Not required to be unique.
    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);

    /// Negotiate channel counts and allocate state.
    ///
    /// Returning `false` keeps the module out of the graph.
    fn prepare(&mut self, layout: &mut ChannelLayout, spec: &StreamSpec) -> bool;

    /// Render `frames` samples from `input` into `output`.
    ///
    /// `output` arrives zeroed with `layout.outputs` channels; `input` has
    /// `layout.inputs` channels.
    fn process(
        &mut self,
        input: &AudioBuffer,
        output: &mut AudioBuffer,
        frames: usize,
        ctx: &ProcessCtx,
    );

    /// Handle a control message addressed to this module.
    ///
    /// Default implementation ignores every command. Overrides must treat
    /// `data` as untrusted: missing or mistyped fields read as defaults.
    fn event_process(&mut self, _command: &str, _data: &mut ControlMessage) {
        // Default: do nothing
    }

    /// Release held resources. Called off the render thread, after the
    /// module has left the graph.
    fn stop(&mut self) -> bool {
        true
    }

    /// Names accepted by [`Module::attribute`].
    fn attribute_names(&self) -> &[&'static str] {
        &[]
    }

    fn attribute(&self, _name: &str) -> Option<AttributeValue> {
        None
    }
}

/// Allow boxed modules to be used as modules (for dynamic dispatch)
impl Module for Box<dyn Module> {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn set_id(&mut self, id: String) {
        (**self).set_id(id)
    }

    fn prepare(&mut self, layout: &mut ChannelLayout, spec: &StreamSpec) -> bool {
        (**self).prepare(layout, spec)
    }

    fn process(
        &mut self,
        input: &AudioBuffer,
        output: &mut AudioBuffer,
        frames: usize,
        ctx: &ProcessCtx,
    ) {
        (**self).process(input, output, frames, ctx)
    }

    fn event_process(&mut self, command: &str, data: &mut ControlMessage) {
        (**self).event_process(command, data)
    }

    fn stop(&mut self) -> bool {
        (**self).stop()
    }

    fn attribute_names(&self) -> &[&'static str] {
        (**self).attribute_names()
    }

    fn attribute(&self, name: &str) -> Option<AttributeValue> {
        (**self).attribute(name)
    }
}
