use crate::{
    config::StreamSpec,
    dsp::gain::{db_to_gain, gain_into, gain_to_db},
    io::AudioBuffer,
    message::ControlMessage,
    module::{AttributeValue, ChannelLayout, Module, ProcessCtx},
};

/// Multichannel gain stage.
///
/// Commands:
/// - `setgain <f32>`: linear gain
/// - `setdb <f32>`: gain in decibels
/// - `mute <bool>`: silence without forgetting the gain
pub struct Gain {
    id: String,
    gain: f32,
    muted: bool,
    channels: usize,
}

impl Gain {
    pub fn new(id: impl Into<String>, gain: f32) -> Self {
        Self {
            id: id.into(),
            gain: sanitize(gain),
            muted: false,
            channels: 0,
        }
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = sanitize(gain);
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }
}

fn sanitize(gain: f32) -> f32 {
    if gain.is_finite() {
        gain
    } else {
        0.0
    }
}

impl Module for Gain {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn prepare(&mut self, layout: &mut ChannelLayout, _spec: &StreamSpec) -> bool {
        // One input per output; the narrower side wins
        let channels = layout.inputs.min(layout.outputs);
        if channels == 0 {
            return false;
        }
        layout.inputs = channels;
        layout.outputs = channels;
        self.channels = channels;
        true
    }

    fn process(
        &mut self,
        input: &AudioBuffer,
        output: &mut AudioBuffer,
        frames: usize,
        _ctx: &ProcessCtx,
    ) {
        let gain = if self.muted { 0.0 } else { self.gain };
        for ch in 0..self.channels {
            let src = input.channel(ch);
            let dst = output.channel_mut(ch);
            let n = frames.min(src.len()).min(dst.len());
            gain_into(&src[..n], gain, &mut dst[..n]);
        }
    }

    fn event_process(&mut self, command: &str, data: &mut ControlMessage) {
        match command {
            "setgain" => {
                if let Some(gain) = data.try_read_f32().filter(|g| g.is_finite()) {
                    self.set_gain(gain);
                }
            }
            "setdb" => {
                if let Some(db) = data.try_read_f32() {
                    self.set_gain(db_to_gain(db));
                }
            }
            "mute" => {
                // Accept a bool or an int flag
                let flag = data.try_read_bool().or_else(|| data.try_read_i32().map(|v| v != 0));
                if let Some(muted) = flag {
                    self.muted = muted;
                }
            }
            _ => {}
        }
    }

    fn attribute_names(&self) -> &[&'static str] {
        &["gain", "db", "muted"]
    }

    fn attribute(&self, name: &str) -> Option<AttributeValue> {
        match name {
            "gain" => Some(AttributeValue::Float(self.gain)),
            "db" => Some(AttributeValue::Float(gain_to_db(self.gain))),
            "muted" => Some(AttributeValue::Bool(self.muted)),
            _ => None,
        }
    }
}
