//! Error types for the i3pm daemon, and their mapping to the wire
//! [`RpcError`] taxonomy.

use i3pm_rpc::protocol::{self, RpcError};

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("core error: {0}")]
    Core(#[from] i3pm_core::Error),

    #[error("codec error: {0}")]
    Codec(#[from] i3pm_rpc::CodecError),

    #[error("compositor error: {0}")]
    Compositor(#[from] i3pm_ipc::IpcError),

    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("watcher error: {0}")]
    Watcher(#[from] notify::Error),
}

pub type Result<T> = std::result::Result<T, DaemonError>;

impl From<DaemonError> for RpcError {
    fn from(err: DaemonError) -> Self {
        match err {
            DaemonError::Io(e) => RpcError::new(protocol::FILESYSTEM_ERROR, e.to_string()),
            DaemonError::Json(e) => RpcError::internal_error(e.to_string()),
            DaemonError::Core(e) => core_error_to_rpc(&e),
            DaemonError::Codec(e) => RpcError::internal_error(e.to_string()),
            DaemonError::Compositor(e) => RpcError::new(protocol::COMPOSITOR_IPC_ERROR, e.to_string()),
            DaemonError::InvalidParams(msg) => RpcError::invalid_params(msg),
            DaemonError::MethodNotFound(name) => RpcError::method_not_found_named(&name),
            DaemonError::Watcher(e) => RpcError::new(protocol::FILESYSTEM_ERROR, e.to_string()),
        }
    }
}

fn core_error_to_rpc(err: &i3pm_core::Error) -> RpcError {
    match err {
        i3pm_core::Error::Io(e) => RpcError::new(protocol::FILESYSTEM_ERROR, e.to_string()),
        i3pm_core::Error::Json(e) => RpcError::internal_error(e.to_string()),
        i3pm_core::Error::CompositorIpc(e) => RpcError::new(protocol::COMPOSITOR_IPC_ERROR, e.to_string()),
        i3pm_core::Error::Validation(msg) => RpcError::validation_failed(msg.clone()),
        i3pm_core::Error::Configuration(msg) => RpcError::new(protocol::CONFIGURATION_ERROR, msg.clone()),
        i3pm_core::Error::ProjectNotFound(name) => RpcError::with_suggestion(
            protocol::VALIDATION_FAILED,
            format!("project not found: {name}"),
            "use project.list to see configured projects",
        ),
        i3pm_core::Error::WindowNotFound(id) => {
            RpcError::validation_failed(format!("window not found: {id}"))
        }
        i3pm_core::Error::NoTerminalEmulator => RpcError::with_suggestion(
            protocol::CONFIGURATION_ERROR,
            "no terminal emulator found",
            "install ghostty or alacritty",
        ),
        i3pm_core::Error::Vcs(msg) => RpcError::new(protocol::VCS_ERROR, msg.clone()),
        i3pm_core::Error::State(msg) => RpcError::new(protocol::STATE_ERROR, msg.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_maps_to_validation_failed_code() {
        let err = DaemonError::Core(i3pm_core::Error::Validation("bad mark".into()));
        let rpc: RpcError = err.into();
        assert_eq!(rpc.code, protocol::VALIDATION_FAILED);
    }

    #[test]
    fn project_not_found_carries_a_suggestion() {
        let err = DaemonError::Core(i3pm_core::Error::ProjectNotFound("nixos".into()));
        let rpc: RpcError = err.into();
        assert!(rpc.data.unwrap()["suggestion"].as_str().unwrap().contains("project.list"));
    }

    #[test]
    fn compositor_error_maps_to_its_own_code_range() {
        let err = DaemonError::Compositor(i3pm_ipc::IpcError::Timeout);
        let rpc: RpcError = err.into();
        assert_eq!(rpc.code, protocol::COMPOSITOR_IPC_ERROR);
    }

    #[test]
    fn method_not_found_uses_the_standard_jsonrpc_code() {
        let err = DaemonError::MethodNotFound("window.frobnicate".into());
        let rpc: RpcError = err.into();
        assert_eq!(rpc.code, protocol::METHOD_NOT_FOUND);
        assert!(rpc.message.contains("window.frobnicate"));
    }
}
