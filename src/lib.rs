pub mod config;
pub mod dsp; // Sample-level primitives
pub mod error;
pub mod graph; // Module tree, renderer and control queue
pub mod io; // Buffers and audio backends
pub mod message; // Typed control messages
pub mod module; // Module trait and built-in modules
pub mod registry;

pub use config::{NetworkConfig, StreamSpec};
pub use error::{NetworkError, Result, SendError};
pub use graph::{GraphItem, MessageSender, Network, NetworkState, Routing};
pub use io::AudioBuffer;
pub use message::{ControlMessage, Vec2};
pub use module::{ChannelLayout, Module, ProcessCtx};

/// Largest number of frames rendered in one pass. Longer callbacks are
/// split into passes of at most this size.
pub const MAX_CYCLE_SIZE: usize = 1024;
