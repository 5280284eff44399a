use std::fmt;

use thiserror::Error;

/// Errors surfaced to control-side callers. The render path never returns
/// errors; it skips and reports instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NetworkError {
    #[error("module `{id}` failed to prepare")]
    PrepareFailed { id: String },
    #[error("invalid module id `{0}`: ids must be non-empty and must not contain `/`")]
    InvalidId(String),
    #[error("invalid target channel {0}: must be -1 or a channel index")]
    InvalidRouting(i32),
    #[error("control queue is full")]
    QueueFull,
    #[error("network has been stopped")]
    Stopped,
    #[error("network is not driven by the caller")]
    NotAttached,
    #[error("audio backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, NetworkError>;

/// Failure to enqueue a command. The rejected value is handed back so the
/// caller can retry or drop it.
#[derive(Clone, PartialEq, Eq, Error)]
pub enum SendError<T> {
    /// The control queue has no free slot.
    #[error("control queue is full")]
    Full(T),
    /// The render side has been torn down.
    #[error("render side is gone")]
    Disconnected(T),
}

impl<T> SendError<T> {
    pub fn into_inner(self) -> T {
        match self {
            SendError::Full(value) | SendError::Disconnected(value) => value,
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, SendError::Full(_))
    }
}

impl<T> fmt::Debug for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::Full(_) => f.write_str("Full(..)"),
            SendError::Disconnected(_) => f.write_str("Disconnected(..)"),
        }
    }
}

impl<T> From<SendError<T>> for NetworkError {
    fn from(err: SendError<T>) -> Self {
        match err {
            SendError::Full(_) => NetworkError::QueueFull,
            SendError::Disconnected(_) => NetworkError::Stopped,
        }
    }
}
