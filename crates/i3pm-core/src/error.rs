//! Top-level error type for `i3pm-core`.

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("compositor ipc error: {0}")]
    CompositorIpc(#[from] i3pm_ipc::IpcError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("project not found: {0}")]
    ProjectNotFound(String),
    #[error("window not found: {0}")]
    WindowNotFound(i64),
    #[error("no terminal emulator found (tried ghostty, alacritty)")]
    NoTerminalEmulator,
    #[error("vcs error: {0}")]
    Vcs(String),
    #[error("state invariant violated: {0}")]
    State(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_message() {
        let err = Error::Validation("workspace_num must be 1..=70".to_string());
        assert_eq!(err.to_string(), "validation failed: workspace_num must be 1..=70");
    }

    #[test]
    fn project_not_found_message() {
        let err = Error::ProjectNotFound("nixos".to_string());
        assert_eq!(err.to_string(), "project not found: nixos");
    }
}
