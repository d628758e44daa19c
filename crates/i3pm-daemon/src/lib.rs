//! The i3pm daemon library: everything `main.rs` needs to bind the socket
//! and serve requests, factored out so integration tests can drive the
//! same server loop without a separate process.

pub mod config_watcher;
pub mod error;
pub mod handlers;
pub mod server;
pub mod session;
