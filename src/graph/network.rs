use rtrb::{Consumer, RingBuffer};
use tracing::{debug, error, info, trace, warn};

use crate::{
    config::{NetworkConfig, StreamSpec},
    error::{NetworkError, Result, SendError},
    graph::{
        command::{Command, Outcome, Report},
        item::GraphItem,
        renderer::Renderer,
        sender::MessageSender,
    },
    io::{AudioBackend, AudioBuffer},
    message::ControlMessage,
    module::{AttributeValue, Module},
};

/// Lifecycle of a [`Network`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkState {
    /// Built, accepting items, not rendering
    Created,
    /// Rendering, either attached or through a backend
    Started,
    /// Torn down; terminal
    Stopped,
}

/// A tree of modules rendered from an audio callback and edited through a
/// lock-free command queue.
///
/// A network is driven in one of two ways:
///
/// - attached: [`Network::start`], then call [`Network::process`] from your
///   own callback.
/// - through a backend: [`Network::start_with`] hands the renderer to an
///   [`AudioBackend`] that calls it from its own thread.
///
/// In both cases [`Network::collect`] should be called periodically from the
/// control side; it stops and drops whatever the render side has let go of.
pub struct Network {
    config: NetworkConfig,
    state: NetworkState,
    sender: MessageSender,
    reports: Consumer<Report>,
    /// Present until handed to a backend
    renderer: Option<Renderer>,
    backend: Option<Box<dyn AudioBackend>>,
}

impl Network {
    pub fn new(config: NetworkConfig) -> Self {
        let (producer, commands) = RingBuffer::new(config.queue_capacity.max(1));
        // A bare `clear` hands back every top-level item at once
        let report_capacity = config.report_capacity.max(config.max_items + 1);
        let (reports_tx, reports) = RingBuffer::new(report_capacity);
        let spec = config.stream;

        debug!(
            sample_rate = spec.sample_rate,
            inputs = spec.input_channels,
            outputs = spec.output_channels,
            queue = config.queue_capacity,
            "network created"
        );

        Self {
            sender: MessageSender::new(producer, spec),
            renderer: Some(Renderer::new(commands, reports_tx, spec, config.max_items)),
            reports,
            state: NetworkState::Created,
            backend: None,
            config,
        }
    }

    pub fn state(&self) -> NetworkState {
        self.state
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Layout items are currently prepared for.
    pub fn spec(&self) -> StreamSpec {
        self.sender.spec()
    }

    /// A new handle for posting commands from other threads.
    pub fn sender(&self) -> MessageSender {
        self.sender.clone()
    }

    pub fn send(&self, msg: ControlMessage) -> std::result::Result<(), SendError<ControlMessage>> {
        self.sender.send(msg)
    }

    pub fn add_item(&self, parent: Option<&str>, item: GraphItem) -> Result<()> {
        self.sender.add_item(parent, item)
    }

    pub fn add_module<M: Module + 'static>(&self, module: M) -> Result<()> {
        self.sender.add_module(module)
    }

    pub fn remove_item(&self, path: &str) -> std::result::Result<(), SendError<ControlMessage>> {
        self.sender.remove_item(path)
    }

    /// Mirror channel 0 of the rendered output into a ring of `capacity`
    /// samples, for meters and scopes. Samples that do not fit are dropped.
    ///
    /// Must be called before the renderer is handed to a backend.
    pub fn attach_tap(&mut self, capacity: usize) -> Result<Consumer<f32>> {
        if self.state == NetworkState::Stopped {
            return Err(NetworkError::Stopped);
        }
        let renderer = self.renderer.as_mut().ok_or(NetworkError::NotAttached)?;
        let (tx, rx) = RingBuffer::new(capacity.max(1));
        renderer.set_tap(tx);
        Ok(rx)
    }

    /// Start in attached mode: the caller drives [`Network::process`].
    ///
    /// Starting twice is a no-op; starting after stop is an error.
    pub fn start(&mut self) -> Result<()> {
        match self.state {
            NetworkState::Started => return Ok(()),
            NetworkState::Stopped => return Err(NetworkError::Stopped),
            NetworkState::Created => {}
        }

        if self.renderer.is_none() {
            return Err(NetworkError::NotAttached);
        }

        self.state = NetworkState::Started;
        info!("network started (attached)");
        Ok(())
    }

    /// Start by handing the renderer to `backend`.
    ///
    /// Items already queued are applied, then re-prepared if the negotiated
    /// layout differs from the configured one. If launching fails the
    /// network ends up stopped.
    pub fn start_with<B: AudioBackend + 'static>(&mut self, mut backend: B) -> Result<()> {
        match self.state {
            NetworkState::Started => return Ok(()),
            NetworkState::Stopped => return Err(NetworkError::Stopped),
            NetworkState::Created => {}
        }

        let spec = backend.negotiate(self.config.stream)?;
        let mut renderer = self.renderer.take().ok_or(NetworkError::NotAttached)?;

        let handle = self.sender.clone();
        {
            let mut sender = handle.lock();
            // Apply everything already queued, emptying the report ring as we go
            loop {
                self.collect();
                if renderer.drain() == 0 {
                    break;
                }
            }
            if spec != renderer.spec() {
                info!(
                    sample_rate = spec.sample_rate,
                    outputs = spec.output_channels,
                    "re-preparing for negotiated layout"
                );
                renderer.reconfigure(spec);
                sender.set_spec(spec);
            }
        }
        self.collect();

        if let Err(err) = backend.launch(renderer) {
            error!(error = %err, "backend failed to launch");
            self.state = NetworkState::Stopped;
            self.collect();
            return Err(err);
        }

        self.backend = Some(Box::new(backend));
        self.state = NetworkState::Started;
        info!("network started");
        Ok(())
    }

    /// Render one callback's worth of audio in attached mode.
    ///
    /// Outside the started state, or when a backend owns the renderer, the
    /// output is silence.
    pub fn process(
        &mut self,
        input: Option<&AudioBuffer>,
        output: &mut AudioBuffer,
        frames: usize,
        time: f64,
    ) {
        match (self.state, self.renderer.as_mut()) {
            (NetworkState::Started, Some(renderer)) => renderer.process(input, output, frames, time),
            _ => output.clear(frames.min(output.frames())),
        }
    }

    /// Stop rendering, stop every module, and release everything.
    ///
    /// Idempotent. Senders report `Disconnected` afterwards.
    pub fn stop(&mut self) {
        if self.state == NetworkState::Stopped {
            return;
        }

        if let Some(mut backend) = self.backend.take() {
            backend.halt();
        }
        if let Some(mut renderer) = self.renderer.take() {
            renderer.teardown();
        }
        self.collect();

        self.state = NetworkState::Stopped;
        info!("network stopped");
    }

    /// Handle everything the render side has handed back: stop removed
    /// modules, log outcomes and faults, free the memory.
    ///
    /// Returns the number of reports handled.
    pub fn collect(&mut self) -> usize {
        let mut count = 0;
        while let Ok(report) = self.reports.pop() {
            count += 1;
            match report {
                Report::Processed { command, outcome } => log_outcome(command, outcome),
                Report::Added { label, parent } => {
                    debug!(id = %label, parent = parent.as_deref().unwrap_or(""), "item added");
                }
                Report::Removed(mut item) => {
                    debug!(id = item.id(), "item removed");
                    item.stop();
                }
                Report::Fault(label) => {
                    warn!(module = %label, "module panicked in process; skipping it for the affected cycles");
                }
            }
        }
        count
    }

    /// Read an attribute of the live item at `path`. Attached mode only.
    pub fn attribute(&self, path: &str, name: &str) -> Result<Option<AttributeValue>> {
        let renderer = self.renderer.as_ref().ok_or(NetworkError::NotAttached)?;
        Ok(renderer.attribute(path, name))
    }

    /// Paths of every live item, depth-first. Attached mode only.
    pub fn item_paths(&self) -> Result<Vec<String>> {
        let renderer = self.renderer.as_ref().ok_or(NetworkError::NotAttached)?;
        Ok(renderer.item_paths())
    }

    /// Make this network's sender the process-wide default.
    pub fn install(&self) -> Option<MessageSender> {
        crate::registry::install(self.sender())
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::new(NetworkConfig::default())
    }
}

impl Drop for Network {
    fn drop(&mut self) {
        self.stop();
    }
}

fn log_outcome(command: Command, outcome: Outcome) {
    match command {
        Command::Message(msg) => match outcome {
            Outcome::Delivered(count) => trace!(address = msg.address(), count, "delivered"),
            Outcome::Applied => debug!(address = msg.address(), "applied"),
            Outcome::NoTarget => debug!(address = msg.address(), "no module matched"),
            Outcome::Rejected => warn!(address = msg.address(), "malformed container command"),
        },
        Command::Add { parent, mut item } => {
            match outcome {
                Outcome::NoTarget => warn!(
                    id = item.id(),
                    parent = parent.as_deref().unwrap_or(""),
                    "parent not found; item dropped"
                ),
                _ => warn!(id = item.id(), "no free slot; item dropped"),
            }
            item.stop();
        }
    }
}
