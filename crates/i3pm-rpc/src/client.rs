//! Client for talking to the i3pm daemon over its Unix domain socket.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::net::UnixStream;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_util::codec::Framed;

use crate::protocol::{Message, Notification, Request, RequestId, Response, RpcError};
use crate::transport::{CodecError, JsonRpcCodec};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("rpc error: {0}")]
    Rpc(#[from] RpcError),
    #[error("connection closed")]
    Disconnected,
    #[error("could not determine a socket path: set XDG_RUNTIME_DIR or HOME")]
    NoSocketPath,
}

/// Resolves the daemon's Unix socket path.
///
/// Prefers `${XDG_RUNTIME_DIR}/i3-project-daemon.sock`, falling back to
/// `${HOME}/.local/state/i3-project-daemon.sock` when `XDG_RUNTIME_DIR`
/// isn't set (e.g. outside a logind session).
///
/// # Errors
///
/// Returns [`ClientError::NoSocketPath`] if neither environment variable is set.
pub fn socket_path() -> Result<PathBuf, ClientError> {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        if !runtime_dir.is_empty() {
            return Ok(PathBuf::from(runtime_dir).join("i3-project-daemon.sock"));
        }
    }
    if let Ok(home) = std::env::var("HOME") {
        if !home.is_empty() {
            return Ok(PathBuf::from(home)
                .join(".local/state")
                .join("i3-project-daemon.sock"));
        }
    }
    Err(ClientError::NoSocketPath)
}

type PendingMap = Arc<Mutex<HashMap<RequestId, oneshot::Sender<Response>>>>;

/// An open connection to the i3pm daemon.
///
/// Requests are matched to responses via a pending-request map keyed by
/// [`RequestId`]; unsolicited notifications (broadcast events) are forwarded
/// to a channel drained with [`RpcClient::recv`].
pub struct RpcClient {
    writer: Arc<Mutex<futures_util::stream::SplitSink<Framed<UnixStream, JsonRpcCodec>, Message>>>,
    pending: PendingMap,
    events: Mutex<mpsc::UnboundedReceiver<Notification>>,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Connects to the daemon at the default resolved socket path.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket path can't be resolved or the connection fails.
    pub async fn connect() -> Result<Self, ClientError> {
        Self::connect_to(&socket_path()?).await
    }

    /// Connects to the daemon at an explicit socket path.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn connect_to(path: &Path) -> Result<Self, ClientError> {
        let stream = UnixStream::connect(path).await?;
        let framed = Framed::new(stream, JsonRpcCodec);
        let (writer, mut reader) = framed.split();

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let reader_pending = Arc::clone(&pending);
        tokio::spawn(async move {
            while let Some(frame) = reader.next().await {
                let Ok(message) = frame else { break };
                match message {
                    Message::Response(resp) => {
                        if let Some(tx) = reader_pending.lock().await.remove(&resp.id) {
                            let _ = tx.send(resp);
                        }
                    }
                    Message::Notification(notif) => {
                        let _ = event_tx.send(notif);
                    }
                    Message::Request(_) => {
                        // The daemon never sends us requests; ignore.
                    }
                }
            }
        });

        Ok(Self {
            writer: Arc::new(Mutex::new(writer)),
            pending,
            events: Mutex::new(event_rx),
            next_id: AtomicU64::new(1),
        })
    }

    fn alloc_id(&self) -> RequestId {
        RequestId::Number(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Sends a request and waits for a typed response.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is closed, the request times out,
    /// or the daemon responds with an RPC-level error.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<T, ClientError> {
        let id = self.alloc_id();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);

        let request = Message::Request(Request::new(method, params, id.clone()));
        if let Err(err) = self.writer.lock().await.send(request).await {
            self.pending.lock().await.remove(&id);
            return Err(err.into());
        }

        let response = tokio::time::timeout(REQUEST_TIMEOUT, rx)
            .await
            .map_err(|_| ClientError::Timeout(REQUEST_TIMEOUT))?
            .map_err(|_| ClientError::Disconnected)?;

        if let Some(error) = response.error {
            return Err(ClientError::Rpc(error));
        }
        let result = response.result.unwrap_or(Value::Null);
        Ok(serde_json::from_value(result)?)
    }

    /// Sends a fire-and-forget notification (no response expected).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is closed.
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), ClientError> {
        let notification = Message::Notification(Notification::new(method, params));
        self.writer.lock().await.send(notification).await?;
        Ok(())
    }

    /// Awaits the next broadcast event notification from the daemon.
    ///
    /// Returns `None` once the connection has closed and no further events
    /// will arrive.
    pub async fn recv(&self) -> Option<Notification> {
        self.events.lock().await.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_path_prefers_xdg_runtime_dir() {
        // SAFETY: test-local env mutation, not shared across threads in this test binary.
        unsafe {
            std::env::set_var("XDG_RUNTIME_DIR", "/run/user/1000");
        }
        let path = socket_path().unwrap();
        assert_eq!(path, PathBuf::from("/run/user/1000/i3-project-daemon.sock"));
        unsafe {
            std::env::remove_var("XDG_RUNTIME_DIR");
        }
    }

    #[test]
    fn socket_path_falls_back_to_home() {
        unsafe {
            std::env::remove_var("XDG_RUNTIME_DIR");
            std::env::set_var("HOME", "/home/test");
        }
        let path = socket_path().unwrap();
        assert_eq!(
            path,
            PathBuf::from("/home/test/.local/state/i3-project-daemon.sock")
        );
    }
}
