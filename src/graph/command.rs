//! Values carried between the control side and the render thread.
//!
//! Commands travel control → render. Everything the render thread is done
//! with travels back as a [`Report`] so that it is dropped (and any module
//! stopped) on the control side.

use std::{fmt, sync::Arc};

use crate::{graph::item::GraphItem, message::ControlMessage};

pub(crate) enum Command {
    /// Deliver to a module, or a reserved container command
    Message(ControlMessage),
    /// Insert a prepared item at the top level or under `parent`
    Add {
        parent: Option<String>,
        item: GraphItem,
    },
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Message(msg) => f.debug_tuple("Message").field(&msg.address()).finish(),
            Command::Add { parent, item } => f
                .debug_struct("Add")
                .field("parent", parent)
                .field("id", &item.id())
                .finish(),
        }
    }
}

/// What happened to a command on the render thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Delivered to this many modules
    Delivered(usize),
    /// Structural edit applied
    Applied,
    /// Nothing matched the address
    NoTarget,
    /// Malformed arguments or no room for the item
    Rejected,
}

pub(crate) enum Report {
    /// A command handed back after it was applied
    Processed { command: Command, outcome: Outcome },
    /// An item went live
    Added {
        label: Arc<str>,
        parent: Option<String>,
    },
    /// An item left the graph and still needs stopping
    Removed(GraphItem),
    /// A module panicked in `process` for the first time
    Fault(Arc<str>),
}
