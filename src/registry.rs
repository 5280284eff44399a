//! Process-wide default sender.
//!
//! Lets code that has no handle to a network (plugins, scripting glue) post
//! messages to whichever network installed itself last.

use parking_lot::RwLock;

use crate::{error::SendError, graph::MessageSender, message::ControlMessage};

static DEFAULT: RwLock<Option<MessageSender>> = parking_lot::const_rwlock(None);

/// Install `sender` as the default. Returns the one it replaces.
pub fn install(sender: MessageSender) -> Option<MessageSender> {
    DEFAULT.write().replace(sender)
}

pub fn uninstall() -> Option<MessageSender> {
    DEFAULT.write().take()
}

pub fn sender() -> Option<MessageSender> {
    DEFAULT.read().clone()
}

/// Send through the default sender. Without one the message comes back as
/// `Disconnected`.
pub fn send(msg: ControlMessage) -> Result<(), SendError<ControlMessage>> {
    match DEFAULT.read().as_ref() {
        Some(sender) => sender.send(msg),
        None => Err(SendError::Disconnected(msg)),
    }
}
