//! JSON-RPC 2.0 client and wire types for the i3pm daemon's Unix socket.

pub mod client;
pub mod error;
pub mod helpers;
pub mod protocol;
pub mod transport;

pub use client::{socket_path, ClientError, RpcClient};
pub use error::Result;
pub use helpers::{event_to_notification, notification_to_event};
pub use protocol::{Message, Notification, Request, RequestId, Response, RpcError};
pub use transport::{CodecError, JsonRpcCodec};
