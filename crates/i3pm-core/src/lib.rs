//! Domain logic for the i3pm project-window manager: state modeling,
//! window-identity matching, project orchestration, and the workspace-mode
//! keyboard state machine. Transport-agnostic — `i3pm-daemon` wires this up
//! to the JSON-RPC server and the compositor IPC client.

pub mod badges;
pub mod config;
pub mod correlation;
pub mod error;
pub mod layout;
pub mod matcher;
pub mod orchestrator;
pub mod roles;
pub mod scratchpad;
pub mod state;
pub mod telemetry;
pub mod workspace_mode;

pub use error::{Error, Result};
