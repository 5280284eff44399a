use std::sync::Arc;

use crate::{
    config::StreamSpec,
    io::AudioBuffer,
    message::ControlMessage,
    module::{AttributeValue, ChannelLayout, Module, ProcessCtx},
};

/// Immutable in-memory PCM, shared between players.
///
/// Decoding files is left to the caller; a sample is just planar `f32`
/// channels at a known rate.
#[derive(Debug, Clone)]
pub struct Sample {
    channels: Arc<[Vec<f32>]>,
    sample_rate: f32,
    frames: usize,
}

impl Sample {
    pub fn from_channels(channels: Vec<Vec<f32>>, sample_rate: f32) -> Self {
        let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
        Self {
            channels: channels.into(),
            sample_rate,
            frames,
        }
    }

    pub fn mono(samples: Vec<f32>, sample_rate: f32) -> Self {
        Self::from_channels(vec![samples], sample_rate)
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn duration(&self) -> f64 {
        if self.sample_rate > 0.0 {
            self.frames as f64 / self.sample_rate as f64
        } else {
            0.0
        }
    }

    fn channel(&self, index: usize) -> &[f32] {
        self.channels.get(index).map(Vec::as_slice).unwrap_or(&[])
    }
}

const MAX_SPEED: f32 = 16.0;

/// Plays a [`Sample`], resampling linearly to the stream rate.
///
/// A mono sample is spread over every output channel; wider samples map
/// channel to channel.
///
/// Commands:
/// - `play`, `pause`, `rewind`
/// - `setposition <f32>`: seconds from the start
/// - `setspeed <f32>`: playback rate, 1.0 = original pitch
/// - `setloop <bool>`
/// - `setgain <f32>`
pub struct SamplePlayer {
    id: String,
    sample: Sample,
    /// Read position in sample frames (fractional)
    position: f64,
    /// Sample frames advanced per output frame at speed 1.0
    rate_ratio: f64,
    speed: f32,
    gain: f32,
    playing: bool,
    looping: bool,
    channels: usize,
}

impl SamplePlayer {
    pub fn new(id: impl Into<String>, sample: Sample) -> Self {
        Self {
            id: id.into(),
            sample,
            position: 0.0,
            rate_ratio: 1.0,
            speed: 1.0,
            gain: 1.0,
            playing: false,
            looping: false,
            channels: 0,
        }
    }

    /// Start playing as soon as the player is live.
    pub fn playing(mut self) -> Self {
        self.playing = true;
        self
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Current position in seconds.
    pub fn position(&self) -> f64 {
        if self.sample.sample_rate > 0.0 {
            self.position / self.sample.sample_rate as f64
        } else {
            0.0
        }
    }

    fn seek(&mut self, seconds: f32) {
        if !seconds.is_finite() {
            return;
        }
        let frame = seconds.max(0.0) as f64 * self.sample.sample_rate as f64;
        self.position = frame.min(self.sample.frames as f64);
    }

    /// Linearly interpolated sample at the current position.
    #[inline]
    fn read(&self, channel: &[f32], index: usize, frac: f32) -> f32 {
        let len = self.sample.frames;
        let next = if index + 1 < len {
            index + 1
        } else if self.looping {
            0
        } else {
            index
        };
        let a = channel[index];
        let b = channel[next];
        a + (b - a) * frac
    }
}

impl Module for SamplePlayer {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn prepare(&mut self, layout: &mut ChannelLayout, spec: &StreamSpec) -> bool {
        let available = self.sample.num_channels();
        if available == 0 || layout.outputs == 0 || spec.sample_rate <= 0.0 {
            return false;
        }

        layout.inputs = 0;
        if available > 1 {
            layout.outputs = layout.outputs.min(available);
        }
        self.channels = layout.outputs;
        self.rate_ratio = self.sample.sample_rate as f64 / spec.sample_rate as f64;
        true
    }

    fn process(
        &mut self,
        _input: &AudioBuffer,
        output: &mut AudioBuffer,
        frames: usize,
        _ctx: &ProcessCtx,
    ) {
        let len = self.sample.frames;
        if !self.playing || len == 0 {
            return;
        }

        let step = self.speed as f64 * self.rate_ratio;
        let mono = self.sample.num_channels() == 1;

        for i in 0..frames {
            if self.position >= len as f64 {
                if self.looping {
                    self.position %= len as f64;
                } else {
                    self.position = len as f64;
                    self.playing = false;
                    break;
                }
            }

            let index = self.position as usize;
            let frac = (self.position - index as f64) as f32;

            for ch in 0..self.channels {
                let src = self.sample.channel(if mono { 0 } else { ch });
                let value = self.read(src, index, frac) * self.gain;
                if let Some(out) = output.channel_mut(ch).get_mut(i) {
                    *out = value;
                }
            }

            self.position += step;
        }
    }

    fn event_process(&mut self, command: &str, data: &mut ControlMessage) {
        match command {
            "play" => {
                if self.position >= self.sample.frames as f64 {
                    self.position = 0.0;
                }
                self.playing = true;
            }
            "pause" => self.playing = false,
            "rewind" => self.position = 0.0,
            "setposition" => {
                if let Some(seconds) = data.try_read_f32() {
                    self.seek(seconds);
                }
            }
            "setspeed" => {
                if let Some(speed) = data.try_read_f32().filter(|s| s.is_finite()) {
                    self.speed = speed.clamp(0.0, MAX_SPEED);
                }
            }
            "setloop" => {
                if let Some(looping) = data.try_read_bool() {
                    self.looping = looping;
                }
            }
            "setgain" => {
                if let Some(gain) = data.try_read_f32().filter(|g| g.is_finite()) {
                    self.gain = gain;
                }
            }
            _ => {}
        }
    }

    fn attribute_names(&self) -> &[&'static str] {
        &["playing", "position", "duration", "speed", "looping", "gain"]
    }

    fn attribute(&self, name: &str) -> Option<AttributeValue> {
        match name {
            "playing" => Some(AttributeValue::Bool(self.playing)),
            "position" => Some(AttributeValue::Float(self.position() as f32)),
            "duration" => Some(AttributeValue::Float(self.sample.duration() as f32)),
            "speed" => Some(AttributeValue::Float(self.speed)),
            "looping" => Some(AttributeValue::Bool(self.looping)),
            "gain" => Some(AttributeValue::Float(self.gain)),
            _ => None,
        }
    }
}
