use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use tracing::{debug, info};

use crate::{
    config::StreamSpec,
    error::{NetworkError, Result},
    graph::Renderer,
    io::AudioBuffer,
};

/// Something that drives a [`Renderer`] from its own callback thread.
///
/// The network calls `negotiate`, then `launch` with the renderer, and
/// finally `halt` when it stops. `halt` must not return until the callback
/// has finished and the renderer has been dropped.
pub trait AudioBackend {
    /// Agree on a stream layout, starting from the configured one.
    fn negotiate(&mut self, desired: StreamSpec) -> Result<StreamSpec>;

    /// Start calling the renderer. Takes ownership of it.
    fn launch(&mut self, renderer: Renderer) -> Result<()>;

    fn halt(&mut self);
}

/// Backend without a device: a plain thread that renders into a scratch
/// buffer at roughly real-time pace. Handy for tests and headless runs.
pub struct NullBackend {
    frames: usize,
    paced: bool,
    running: Arc<AtomicBool>,
    callbacks: Arc<AtomicU64>,
    thread: Option<JoinHandle<()>>,
}

impl NullBackend {
    /// Render `frames` frames per callback.
    pub fn new(frames: usize) -> Self {
        Self {
            frames: frames.max(1),
            paced: true,
            running: Arc::new(AtomicBool::new(false)),
            callbacks: Arc::new(AtomicU64::new(0)),
            thread: None,
        }
    }

    /// Render back to back instead of sleeping between callbacks.
    pub fn unpaced(mut self) -> Self {
        self.paced = false;
        self
    }

    /// Callbacks completed so far.
    pub fn callbacks(&self) -> u64 {
        self.callbacks.load(Ordering::Acquire)
    }

    /// Shared counter, readable after the backend has been moved into a
    /// network.
    pub fn callback_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.callbacks)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl AudioBackend for NullBackend {
    fn negotiate(&mut self, desired: StreamSpec) -> Result<StreamSpec> {
        Ok(desired)
    }

    fn launch(&mut self, mut renderer: Renderer) -> Result<()> {
        if self.thread.is_some() {
            return Err(NetworkError::Backend("null backend already running".into()));
        }

        let spec = renderer.spec();
        let frames = self.frames;
        let period = Duration::from_secs_f64(frames as f64 / spec.sample_rate.max(1.0) as f64);
        let paced = self.paced;
        let running = Arc::clone(&self.running);
        let callbacks = Arc::clone(&self.callbacks);

        running.store(true, Ordering::Release);
        let handle = thread::Builder::new()
            .name("saavy-net-render".into())
            .spawn(move || {
                let mut output = AudioBuffer::new(spec.output_channels, frames);
                let mut time = 0.0;
                while running.load(Ordering::Acquire) {
                    renderer.process(None, &mut output, frames, time);
                    time += period.as_secs_f64();
                    callbacks.fetch_add(1, Ordering::AcqRel);
                    if paced {
                        thread::sleep(period);
                    } else {
                        thread::yield_now();
                    }
                }
                // Renderer drops here, off any realtime constraint
            })
            .map_err(|err| {
                self.running.store(false, Ordering::Release);
                NetworkError::Backend(err.to_string())
            })?;

        self.thread = Some(handle);
        info!(frames, sample_rate = spec.sample_rate, "null backend running");
        Ok(())
    }

    fn halt(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                debug!("null backend thread panicked");
            }
        }
    }
}

impl Drop for NullBackend {
    fn drop(&mut self) {
        self.halt();
    }
}
