//! Async client for the i3/Sway compositor IPC socket.

pub mod client;
pub mod error;
pub mod events;
pub mod protocol;

pub use client::{socket_path, CompositorClient};
pub use error::{IpcError, Result};
pub use events::CompositorEvent;
pub use protocol::{EventType, Frame, IpcCodec, MessageType};
