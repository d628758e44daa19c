pub type Result<T> = std::result::Result<T, IpcError>;

#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("framing error: {0}")]
    Codec(#[from] crate::protocol::CodecError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("compositor socket not found: set SWAYSOCK or I3SOCK")]
    NoSocketPath,
    #[error("request timed out")]
    Timeout,
    #[error("compositor connection is unavailable")]
    Unavailable,
    #[error("frame with type code {0:#x} is not a recognized event")]
    NotAnEvent(u32),
}
