//! The module tree and the machinery that renders and edits it.
//!
//! A [`Network`] owns a tree of [`GraphItem`]s. Control threads post
//! commands through a [`MessageSender`]; the [`Renderer`] applies them at the
//! top of each audio callback and then renders the tree. Items removed from
//! the tree travel back to the control side to be stopped and freed.

/// Values exchanged between control and render side.
pub mod command;
/// Tree nodes and output routing.
pub mod item;
/// Lifecycle owner and control-side facade.
pub mod network;
/// Render-thread side: drain, render, teardown.
pub mod renderer;
/// Cloneable multi-producer handle.
pub mod sender;

pub use command::Outcome;
pub use item::{GraphItem, Routing};
pub use network::{Network, NetworkState};
pub use renderer::Renderer;
pub use sender::MessageSender;
