// Purpose - audio buffers and the platform boundary (backends)

pub mod backend;
pub mod device;

pub use backend::{AudioBackend, NullBackend};
pub use device::CpalBackend;

use crate::dsp::mix::sum_in_place;

/// Planar multi-channel sample buffer.
///
/// Out-of-range channel accesses yield empty slices rather than panicking so
/// that routing code on the render thread can clamp channel mismatches
/// without branching on errors.
#[derive(Debug, Clone, Default)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Allocate `channels` zeroed channels of `frames` samples each.
    pub fn new(channels: usize, frames: usize) -> Self {
        Self {
            channels: vec![vec![0.0; frames]; channels],
        }
    }

    pub fn from_channels(channels: Vec<Vec<f32>>) -> Self {
        Self { channels }
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Length of the shortest channel.
    pub fn frames(&self) -> usize {
        self.channels.iter().map(Vec::len).min().unwrap_or(0)
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        self.channels.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        match self.channels.get_mut(index) {
            Some(channel) => channel.as_mut_slice(),
            None => Default::default(),
        }
    }

    pub fn channels(&self) -> impl Iterator<Item = &[f32]> {
        self.channels.iter().map(Vec::as_slice)
    }

    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut [f32]> {
        self.channels.iter_mut().map(Vec::as_mut_slice)
    }

    /// Zero the first `frames` samples of every channel.
    pub fn clear(&mut self, frames: usize) {
        for channel in &mut self.channels {
            let end = frames.min(channel.len());
            channel[..end].fill(0.0);
        }
    }

    /// Set every sample of every channel to `value`.
    pub fn fill(&mut self, value: f32) {
        for channel in &mut self.channels {
            channel.fill(value);
        }
    }

    /// Copy `frames` samples starting at `offset` in `src` into the start of
    /// this buffer. Channels `src` does not have are zeroed.
    pub fn copy_from(&mut self, src: &AudioBuffer, offset: usize, frames: usize) {
        for (index, dst) in self.channels.iter_mut().enumerate() {
            let len = frames.min(dst.len());
            let dst = &mut dst[..len];
            let samples = src.channel(index).get(offset..).unwrap_or(&[]);
            let copied = dst.len().min(samples.len());
            dst[..copied].copy_from_slice(&samples[..copied]);
            dst[copied..].fill(0.0);
        }
    }

    /// Add the first `frames` samples of each channel into `dest`, starting at
    /// destination channel `first_channel` and sample `offset`.
    ///
    /// Channels that fall outside `dest` are dropped.
    pub fn accumulate_into(
        &self,
        dest: &mut AudioBuffer,
        first_channel: usize,
        offset: usize,
        frames: usize,
    ) {
        let targets = dest.channels.iter_mut().skip(first_channel);
        for (src, dst) in self.channels.iter().zip(targets) {
            let Some(dst) = dst.get_mut(offset..) else {
                continue;
            };
            let len = frames.min(src.len());
            sum_in_place(dst, &src[..len]);
        }
    }

    /// Write `frames` samples into an interleaved buffer of `channels` width.
    ///
    /// Destination channels beyond this buffer's width receive silence.
    pub fn write_interleaved(&self, out: &mut [f32], channels: usize, frames: usize) {
        if channels == 0 {
            return;
        }
        for (i, frame) in out.chunks_mut(channels).take(frames).enumerate() {
            for (ch, sample) in frame.iter_mut().enumerate() {
                *sample = self.channel(ch).get(i).copied().unwrap_or(0.0);
            }
        }
    }
}
