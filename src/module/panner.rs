use crate::{
    config::StreamSpec,
    dsp::pan::{equal_power, split},
    io::AudioBuffer,
    message::{ControlMessage, Vec2},
    module::{AttributeValue, ChannelLayout, Module, ProcessCtx},
};

/// Mono in, stereo out. Children of a panner item are mixed into its single
/// input before panning.
///
/// Commands:
/// - `setpan <f32>`: position, -1.0 (left) to 1.0 (right)
/// - `setlevel <f32>`: output level
/// - `settarget <vec2>`: `x` is the position, `y` the level
pub struct Panner {
    id: String,
    position: f32,
    level: f32,
    left: f32,
    right: f32,
}

impl Panner {
    pub fn new(id: impl Into<String>, position: f32) -> Self {
        let mut panner = Self {
            id: id.into(),
            position: 0.0,
            level: 1.0,
            left: 0.0,
            right: 0.0,
        };
        panner.set_position(position);
        panner
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn set_position(&mut self, position: f32) {
        if position.is_finite() {
            self.position = position.clamp(-1.0, 1.0);
        }
        (self.left, self.right) = equal_power(self.position);
    }

    pub fn set_level(&mut self, level: f32) {
        if level.is_finite() {
            self.level = level.max(0.0);
        }
    }
}

impl Module for Panner {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn prepare(&mut self, layout: &mut ChannelLayout, _spec: &StreamSpec) -> bool {
        // A panner pinned to a single channel has nowhere to pan to
        if layout.outputs < 2 {
            return false;
        }
        layout.inputs = 1;
        layout.outputs = 2;
        true
    }

    fn process(
        &mut self,
        input: &AudioBuffer,
        output: &mut AudioBuffer,
        frames: usize,
        _ctx: &ProcessCtx,
    ) {
        let mono = input.channel(0);
        let mono = &mono[..frames.min(mono.len())];

        let mut channels = output.channels_mut();
        if let (Some(left), Some(right)) = (channels.next(), channels.next()) {
            split(
                mono,
                self.left * self.level,
                self.right * self.level,
                left,
                right,
            );
        }
    }

    fn event_process(&mut self, command: &str, data: &mut ControlMessage) {
        match command {
            "setpan" => {
                if let Some(position) = data.try_read_f32() {
                    self.set_position(position);
                }
            }
            "setlevel" => {
                if let Some(level) = data.try_read_f32() {
                    self.set_level(level);
                }
            }
            "settarget" => {
                if let Some(Vec2 { x, y }) = data.try_read_vec2() {
                    self.set_position(x);
                    self.set_level(y);
                }
            }
            _ => {}
        }
    }

    fn attribute_names(&self) -> &[&'static str] {
        &["position", "level"]
    }

    fn attribute(&self, name: &str) -> Option<AttributeValue> {
        match name {
            "position" => Some(AttributeValue::Float(self.position)),
            "level" => Some(AttributeValue::Float(self.level)),
            _ => None,
        }
    }
}
