//! Persistent client for the i3/Sway IPC socket.
//!
//! Two connections are kept open: a request/reply connection guarded by a
//! mutex (the protocol has no request ids, so replies must be read back in
//! send order), and a dedicated `SUBSCRIBE` connection that auto-reconnects
//! with capped exponential backoff on disconnect.

use std::path::PathBuf;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::UnixStream;
use tokio::sync::{mpsc, Mutex};
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use crate::error::IpcError;
use crate::events::{decode_event, CompositorEvent};
use crate::protocol::{IpcCodec, MessageType};

const INITIAL_BACKOFF: Duration = Duration::from_millis(250);
const MAX_BACKOFF: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolves the compositor's IPC socket path from `SWAYSOCK` or `I3SOCK`.
///
/// # Errors
///
/// Returns [`IpcError::NoSocketPath`] if neither variable is set.
pub fn socket_path() -> Result<PathBuf, IpcError> {
    std::env::var("SWAYSOCK")
        .or_else(|_| std::env::var("I3SOCK"))
        .map(PathBuf::from)
        .map_err(|_| IpcError::NoSocketPath)
}

pub struct CompositorClient {
    socket_path: PathBuf,
    command_conn: Mutex<Framed<UnixStream, IpcCodec>>,
}

impl CompositorClient {
    /// Connects the command/reply channel to the compositor's default socket.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket path can't be resolved or connected to.
    pub async fn connect() -> Result<Self, IpcError> {
        let path = socket_path()?;
        Self::connect_to(path).await
    }

    /// Connects the command/reply channel to an explicit socket path.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn connect_to(path: PathBuf) -> Result<Self, IpcError> {
        let stream = UnixStream::connect(&path).await?;
        Ok(Self {
            socket_path: path,
            command_conn: Mutex::new(Framed::new(stream, IpcCodec)),
        })
    }

    async fn request(&self, msg_type: MessageType, payload: &[u8]) -> Result<Vec<u8>, IpcError> {
        let mut conn = self.command_conn.lock().await;
        conn.send((msg_type.code(), payload.to_vec())).await?;

        let frame = tokio::time::timeout(REQUEST_TIMEOUT, conn.next())
            .await
            .map_err(|_| IpcError::Timeout)?
            .ok_or(IpcError::Unavailable)??;

        Ok(frame.payload)
    }

    /// Runs a Sway/i3 command string (e.g. `"workspace 3"`), returning the
    /// raw JSON array of per-command results.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is unavailable or the reply isn't valid JSON.
    pub async fn run_command(&self, command: &str) -> Result<Value, IpcError> {
        let payload = self.request(MessageType::RunCommand, command.as_bytes()).await?;
        Ok(serde_json::from_slice(&payload)?)
    }

    /// Fetches the full window/container tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is unavailable or the reply isn't valid JSON.
    pub async fn get_tree(&self) -> Result<Value, IpcError> {
        let payload = self.request(MessageType::GetTree, b"").await?;
        Ok(serde_json::from_slice(&payload)?)
    }

    /// Fetches the workspace list.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is unavailable or the reply isn't valid JSON.
    pub async fn get_workspaces(&self) -> Result<Value, IpcError> {
        let payload = self.request(MessageType::GetWorkspaces, b"").await?;
        Ok(serde_json::from_slice(&payload)?)
    }

    /// Fetches the output (monitor) list.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is unavailable or the reply isn't valid JSON.
    pub async fn get_outputs(&self) -> Result<Value, IpcError> {
        let payload = self.request(MessageType::GetOutputs, b"").await?;
        Ok(serde_json::from_slice(&payload)?)
    }

    /// Fetches the list of currently-set marks across all windows.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is unavailable or the reply isn't valid JSON.
    pub async fn get_marks(&self) -> Result<Vec<String>, IpcError> {
        let payload = self.request(MessageType::GetMarks, b"").await?;
        Ok(serde_json::from_slice(&payload)?)
    }

    /// Subscribes to the given event names (e.g. `["window", "workspace"]`)
    /// on a dedicated connection that reconnects automatically on failure.
    ///
    /// Returns a channel of decoded events; a [`CompositorEvent::Reconnected`]
    /// is pushed after every successful reconnect so subscribers know to
    /// refresh any cached tree state.
    #[must_use]
    pub fn subscribe(&self, events: Vec<String>) -> mpsc::UnboundedReceiver<CompositorEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let socket_path = self.socket_path.clone();
        tokio::spawn(subscription_loop(socket_path, events, tx));
        rx
    }
}

async fn subscription_loop(
    socket_path: PathBuf,
    events: Vec<String>,
    tx: mpsc::UnboundedSender<CompositorEvent>,
) {
    let mut backoff = INITIAL_BACKOFF;
    let mut first_attempt = true;

    loop {
        match subscribe_once(&socket_path, &events, &tx, first_attempt).await {
            Ok(()) => {
                // Connection closed cleanly (compositor shutdown); stop retrying forever
                // only if the receiver has gone away.
                if tx.is_closed() {
                    return;
                }
            }
            Err(err) => {
                warn!(error = %err, "compositor event connection dropped, retrying");
            }
        }

        first_attempt = false;
        if tx.is_closed() {
            return;
        }
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

async fn subscribe_once(
    socket_path: &PathBuf,
    events: &[String],
    tx: &mpsc::UnboundedSender<CompositorEvent>,
    first_attempt: bool,
) -> Result<(), IpcError> {
    let stream = UnixStream::connect(socket_path).await?;
    let mut conn = Framed::new(stream, IpcCodec);

    let payload = serde_json::to_vec(events)?;
    conn.send((MessageType::Subscribe.code(), payload)).await?;

    let ack = conn.next().await.ok_or(IpcError::Unavailable)??;
    debug!(ack = %String::from_utf8_lossy(&ack.payload), "subscribed to compositor events");

    if !first_attempt {
        info!("compositor event connection re-established");
        if tx.send(CompositorEvent::Reconnected).is_err() {
            return Ok(());
        }
    }

    while let Some(frame) = conn.next().await {
        let frame = frame?;
        if !frame.is_event() {
            continue;
        }
        let event = decode_event(&frame)?;
        if tx.send(event).is_err() {
            return Ok(());
        }
    }

    Ok(())
}
