use std::{fmt, sync::Arc};

use parking_lot::{Mutex, MutexGuard};
use rtrb::Producer;
use tracing::warn;

use crate::{
    config::StreamSpec,
    error::{NetworkError, Result, SendError},
    graph::{
        command::Command,
        item::{GraphItem, Routing},
    },
    message::ControlMessage,
    module::Module,
};

pub(crate) struct SenderState {
    producer: Producer<Command>,
    /// Layout that submitted items are prepared for
    spec: StreamSpec,
}

impl SenderState {
    pub(crate) fn set_spec(&mut self, spec: StreamSpec) {
        self.spec = spec;
    }

    fn enqueue<T>(
        &mut self,
        value: T,
        wrap: impl FnOnce(T) -> Command,
    ) -> std::result::Result<(), SendError<T>> {
        if self.producer.is_abandoned() {
            return Err(SendError::Disconnected(value));
        }
        if self.producer.is_full() {
            return Err(SendError::Full(value));
        }
        // Producers are serialized by the lock, so the free slot stays free
        let pushed = self.producer.push(wrap(value));
        debug_assert!(pushed.is_ok());
        Ok(())
    }
}

/// Cloneable handle for posting commands to a network from any thread.
///
/// The underlying queue is single-producer; senders take a short lock among
/// themselves so that the render thread never contends with anyone.
/// Commands from one sender arrive in the order they were sent.
#[derive(Clone)]
pub struct MessageSender {
    state: Arc<Mutex<SenderState>>,
}

impl MessageSender {
    pub(crate) fn new(producer: Producer<Command>, spec: StreamSpec) -> Self {
        Self {
            state: Arc::new(Mutex::new(SenderState { producer, spec })),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, SenderState> {
        self.state.lock()
    }

    /// Post a message. Returns it back if the queue is full or the network
    /// is gone.
    pub fn send(&self, msg: ControlMessage) -> std::result::Result<(), SendError<ControlMessage>> {
        self.state.lock().enqueue(msg, Command::Message)
    }

    /// Prepare `item` on the calling thread and queue it for insertion at the
    /// top level, or under the item at `parent`.
    ///
    /// On any failure the item's modules are stopped and dropped here.
    pub fn add_item(&self, parent: Option<&str>, mut item: GraphItem) -> Result<()> {
        if let Err(err) = item.validate_ids() {
            warn!(error = %err, "rejecting item");
            item.stop();
            return Err(err);
        }

        // Hold the lock across prepare so the layout cannot change underneath
        let mut state = self.state.lock();
        if let Err(err) = item.prepare(&state.spec) {
            drop(state);
            warn!(error = %err, "item not added");
            item.stop();
            return Err(err);
        }

        let parent = parent.map(str::to_owned);
        state
            .enqueue(item, |item| Command::Add { parent, item })
            .map_err(|err| {
                let error = if err.is_full() {
                    NetworkError::QueueFull
                } else {
                    NetworkError::Stopped
                };
                let mut item = err.into_inner();
                warn!(id = item.id(), error = %error, "item not added");
                item.stop();
                error
            })
    }

    /// Shorthand for adding a single module at the top level.
    pub fn add_module<M: Module + 'static>(&self, module: M) -> Result<()> {
        self.add_item(None, GraphItem::new(module))
    }

    /// Queue removal of the item at `path` along with its children.
    pub fn remove_item(&self, path: &str) -> std::result::Result<(), SendError<ControlMessage>> {
        self.send(ControlMessage::new("remove").with_str(path))
    }

    /// Queue a routing change for the item at `path`.
    pub fn route_item(
        &self,
        path: &str,
        routing: Routing,
    ) -> std::result::Result<(), SendError<ControlMessage>> {
        self.send(
            ControlMessage::new("route")
                .with_str(path)
                .with_i32(routing.index()),
        )
    }

    /// Queue removal of every item.
    pub fn clear(&self) -> std::result::Result<(), SendError<ControlMessage>> {
        self.send(ControlMessage::new("clear"))
    }

    /// Layout that new items are prepared for.
    pub fn spec(&self) -> StreamSpec {
        self.state.lock().spec
    }

    /// Whether the render side still exists.
    pub fn is_connected(&self) -> bool {
        !self.state.lock().producer.is_abandoned()
    }
}

impl fmt::Debug for MessageSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageSender")
            .field("connected", &self.is_connected())
            .finish()
    }
}
