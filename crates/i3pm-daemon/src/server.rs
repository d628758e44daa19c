//! The daemon's accept loop, session bookkeeping, and compositor event
//! ingestion: the part of the system that turns a freshly-bound Unix socket
//! and a live compositor connection into a running service.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use i3pm_core::badges::BadgeStore;
use i3pm_core::config::Directories;
use i3pm_core::matcher::{self, LaunchRegistry};
use i3pm_core::orchestrator::ProjectOrchestrator;
use i3pm_core::scratchpad::ScratchpadRegistry;
use i3pm_core::state::focus::FocusTracker;
use i3pm_core::state::StateStore;
use i3pm_core::telemetry::EventRing;
use i3pm_core::workspace_mode::WorkspaceModeMachine;
use i3pm_ipc::{CompositorClient, CompositorEvent};
use i3pm_rpc::helpers::event_to_notification;
use i3pm_rpc::protocol::{Message, Request, Response, RpcError};
use i3pm_rpc::transport::JsonRpcCodec;
use i3pm_types::{Application, CoreEvent, EventCategory, EventRecord, Output, Scope, Window};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, RwLock};
use tokio_util::codec::Framed;
use tracing::{debug, error, info, warn};

use crate::config_watcher::spawn_config_watcher;
use crate::error::{DaemonError, Result};
use crate::handlers::{self, HandlerContext};
use crate::session::{ClientInfo, Session, SessionId};

/// Bound of a single subscriber's outgoing queue; a subscriber that falls
/// this far behind is dropped rather than let it stall every broadcast.
const SUBSCRIBER_QUEUE_BOUND: usize = 256;

pub struct DaemonState {
    pub state: Arc<StateStore>,
    pub focus: Arc<FocusTracker>,
    pub launch_registry: Arc<LaunchRegistry>,
    pub scratchpads: Arc<ScratchpadRegistry>,
    pub badges: Arc<BadgeStore>,
    pub workspace_mode: Arc<WorkspaceModeMachine>,
    pub events: Arc<EventRing>,
    pub orchestrator: Arc<ProjectOrchestrator>,
    pub compositor: Arc<CompositorClient>,
    pub dirs: Arc<Directories>,
    pub applications: Arc<RwLock<Vec<Application>>>,
    clients: RwLock<HashMap<SessionId, Session>>,
    client_senders: RwLock<HashMap<SessionId, mpsc::Sender<Message>>>,
}

impl DaemonState {
    async fn register_client(&self, id: SessionId, sender: mpsc::Sender<Message>) {
        self.clients.write().await.insert(id.clone(), Session::Pending(ClientInfo::new(id.clone())));
        self.client_senders.write().await.insert(id, sender);
    }

    async fn deregister_client(&self, id: &SessionId) {
        self.clients.write().await.remove(id);
        self.client_senders.write().await.remove(id);
    }

    async fn promote_to_subscriber(&self, id: &SessionId) {
        if let Some(session) = self.clients.write().await.get_mut(id) {
            session.promote_to_subscriber();
        }
    }

    /// Serializes a domain event once and fans it out to every subscribed
    /// session, dropping any whose queue is full rather than blocking the
    /// whole broadcast on one slow reader.
    pub async fn broadcast(&self, event: &CoreEvent) {
        let notification = event_to_notification(event);
        let clients = self.clients.read().await;
        let senders = self.client_senders.read().await;

        for (id, session) in clients.iter() {
            if !session.is_subscriber() {
                continue;
            }
            let Some(sender) = senders.get(id) else { continue };
            let message = Message::Notification(notification.clone());
            if sender.try_send(message).is_err() {
                warn!("dropping slow event subscriber {id}");
            }
        }
    }

    async fn record_event(&self, event: &CoreEvent) {
        let notification = event_to_notification(event);
        self.events
            .push(EventRecord {
                timestamp: unix_timestamp(),
                event_type: notification.method,
                payload: notification.params.unwrap_or(serde_json::Value::Null),
                enrichment: None,
                correlation_id: None,
                depth: 0,
                category: EventCategory::Window,
            })
            .await;
    }
}

#[must_use]
pub fn unix_timestamp() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Builds the daemon's state from disk-backed configuration and a live
/// compositor connection. Does not bind the socket or start any loop.
///
/// # Errors
///
/// Returns an error if the project/application config files fail to parse
/// or the compositor connection cannot be established.
pub async fn build_state(dirs: Directories) -> Result<Arc<DaemonState>> {
    dirs.ensure_exists()?;

    let projects = i3pm_core::config::settings::ProjectsFile::load(&dirs.projects_file)?;
    let applications =
        i3pm_core::config::rules::load_merged_applications(&dirs.applications_file, &dirs.config.join("applications.d"))?;

    let state = Arc::new(StateStore::new());
    for project in projects.projects {
        state.upsert_project(project).await;
    }

    let focus = Arc::new(FocusTracker::new(
        dirs.project_focus_state_file.clone(),
        dirs.workspace_focus_state_file.clone(),
    ));

    let compositor = Arc::new(CompositorClient::connect().await.map_err(DaemonError::Compositor)?);
    let launch_registry = Arc::new(LaunchRegistry::new());
    let applications = Arc::new(RwLock::new(applications));
    let orchestrator = Arc::new(ProjectOrchestrator::new(
        state.clone(),
        focus.clone(),
        dirs.layouts_dir.clone(),
        launch_registry.clone(),
        applications.clone(),
    ));

    Ok(Arc::new(DaemonState {
        state,
        focus,
        launch_registry,
        scratchpads: Arc::new(ScratchpadRegistry::new()),
        badges: Arc::new(BadgeStore::new()),
        workspace_mode: Arc::new(WorkspaceModeMachine::new(100)),
        events: Arc::new(EventRing::new(500)),
        orchestrator,
        compositor,
        dirs: Arc::new(dirs),
        applications,
        clients: RwLock::new(HashMap::new()),
        client_senders: RwLock::new(HashMap::new()),
    }))
}

/// Runs the daemon: binds the socket, seeds state from the compositor's
/// current tree, and accepts connections until the process is killed.
///
/// # Errors
///
/// Returns an error if the socket cannot be bound or the compositor
/// connection drops irrecoverably during startup.
pub async fn run(custom_socket_path: Option<PathBuf>) -> Result<()> {
    let path = match custom_socket_path {
        Some(p) => p,
        None => i3pm_core::config::dirs::socket_path()?,
    };

    cleanup_stale_socket(&path).await?;

    let listener = UnixListener::bind(&path)?;
    set_owner_only_permissions(&path)?;
    info!("i3pm daemon listening on {}", path.display());

    let dirs = Directories::new();
    let daemon = build_state(dirs).await?;

    seed_from_compositor(&daemon).await;

    let ingest = daemon.clone();
    tokio::spawn(async move {
        compositor_event_loop(ingest).await;
    });

    let watched_dir = daemon.dirs.config.clone();
    let watcher_daemon = daemon.clone();
    tokio::spawn(async move {
        spawn_config_watcher_task(watched_dir, watcher_daemon).await;
    });

    loop {
        match listener.accept().await {
            Ok((stream, _addr)) => {
                let daemon = daemon.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_connection(stream, daemon).await {
                        error!("connection error: {err}");
                    }
                });
            }
            Err(err) => error!("accept error: {err}"),
        }
    }
}

/// Watches the config directory and reloads the merged application rule set
/// whenever `applications.json` or an `applications.d/*.json` fragment
/// changes, so rule edits take effect without restarting the daemon.
async fn spawn_config_watcher_task(config_dir: PathBuf, daemon: Arc<DaemonState>) {
    let (reload_tx, mut reload_rx) = mpsc::unbounded_channel::<()>();
    spawn_config_watcher(config_dir, reload_tx);

    while reload_rx.recv().await.is_some() {
        debug!("config reload event received");
        let dirs = &daemon.dirs;
        match i3pm_core::config::rules::load_merged_applications(&dirs.applications_file, &dirs.config.join("applications.d")) {
            Ok(merged) => {
                let count = merged.len();
                *daemon.applications.write().await = merged;
                info!("reloaded {count} application rule(s)");
            }
            Err(err) => error!("failed to reload application rules: {err}"),
        }
    }
}

async fn cleanup_stale_socket(path: &Path) -> Result<()> {
    if path.exists() {
        if UnixStream::connect(path).await.is_ok() {
            return Err(DaemonError::Io(std::io::Error::new(
                std::io::ErrorKind::AddrInUse,
                "another i3pm daemon is already running",
            )));
        }
        info!("removing stale socket at {}", path.display());
        std::fs::remove_file(path)?;
    }
    Ok(())
}

fn set_owner_only_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

/// Verifies the connecting peer's UID matches the daemon's own, per the
/// peer-credential authentication scheme; any mismatch is rejected without
/// a response (the connection is simply closed).
///
/// The daemon's own UID is read from `/proc/self`'s owner rather than
/// calling `getuid(2)` directly, avoiding a dependency on `libc`/`nix` for
/// a single syscall.
fn authenticate(stream: &UnixStream) -> bool {
    use std::os::unix::fs::MetadataExt;
    let Ok(cred) = stream.peer_cred() else { return false };
    let Ok(own) = std::fs::metadata("/proc/self") else { return false };
    cred.uid() == own.uid()
}

async fn handle_connection(stream: UnixStream, daemon: Arc<DaemonState>) -> Result<()> {
    if !authenticate(&stream) {
        warn!("rejected connection from peer with mismatched uid");
        return Ok(());
    }

    let framed = Framed::new(stream, JsonRpcCodec);
    let (mut sink, mut stream) = framed.split();

    let session_id = SessionId::new();
    debug!("accepted connection: {session_id}");

    let (tx, mut rx) = mpsc::channel::<Message>(SUBSCRIBER_QUEUE_BOUND);
    daemon.register_client(session_id.clone(), tx).await;

    let send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if sink.send(message).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = stream.next().await {
        let message = match frame {
            Ok(message) => message,
            Err(err) => {
                warn!("codec error on session {session_id}: {err}");
                break;
            }
        };

        match message {
            Message::Request(request) => {
                let response = process_request(&daemon, &session_id, request).await;
                if let Some(response) = response {
                    let senders = daemon.client_senders.read().await;
                    if let Some(sender) = senders.get(&session_id) {
                        let _ = sender.send(Message::Response(response)).await;
                    }
                }
            }
            Message::Notification(_) | Message::Response(_) => {
                // The daemon has nothing to do with unsolicited notifications
                // or responses from a client; ignore.
            }
        }
    }

    daemon.deregister_client(&session_id).await;
    send_task.abort();
    debug!("connection closed: {session_id}");
    Ok(())
}

async fn process_request(daemon: &Arc<DaemonState>, session_id: &SessionId, request: Request) -> Option<Response> {
    let Some(id) = request.id.clone() else {
        // A request with no id is a notification; dispatch but never reply.
        let _ = dispatch(daemon, session_id, &request).await;
        return None;
    };

    if request.method == "events.subscribe" {
        daemon.promote_to_subscriber(session_id).await;
        return Some(Response::success(id, serde_json::json!({"subscribed": true})));
    }

    match dispatch(daemon, session_id, &request).await {
        Ok(value) => Some(Response::success(id, value)),
        Err(err) => Some(Response::error(id, RpcError::from(err))),
    }
}

async fn dispatch(
    daemon: &Arc<DaemonState>,
    session_id: &SessionId,
    request: &Request,
) -> Result<serde_json::Value> {
    let ctx = HandlerContext { daemon: daemon.clone(), session_id: session_id.clone() };
    handlers::handle(&ctx, &request.method, request.params.clone()).await
}

/// Reads the compositor's current tree/outputs once at startup so the
/// state store isn't empty until the next event arrives.
async fn seed_from_compositor(daemon: &Arc<DaemonState>) {
    if let Ok(outputs) = daemon.compositor.get_outputs().await {
        if let Some(outputs) = parse_outputs(&outputs) {
            daemon.orchestrator.reconcile_outputs(outputs).await;
        }
    }
}

fn parse_outputs(value: &serde_json::Value) -> Option<Vec<Output>> {
    let array = value.as_array()?;
    Some(
        array
            .iter()
            .filter_map(|o| {
                let name = o.get("name")?.as_str()?.to_string();
                let active = o.get("active").and_then(serde_json::Value::as_bool).unwrap_or(false);
                let rect = o.get("rect")?;
                let width = rect.get("width")?.as_u64()? as u32;
                let height = rect.get("height")?.as_u64()? as u32;
                let scale = o.get("scale").and_then(serde_json::Value::as_f64).unwrap_or(1.0);
                Some(Output { name, active, width, height, scale, role: i3pm_types::OutputRole::Unassigned })
            })
            .collect(),
    )
}

/// Subscribes to the compositor's event stream and keeps the state store
/// (and subscriber broadcast) in sync for as long as the daemon runs.
async fn compositor_event_loop(daemon: Arc<DaemonState>) {
    let mut events = daemon.compositor.subscribe(vec![
        "window".to_string(),
        "workspace".to_string(),
        "output".to_string(),
        "shutdown".to_string(),
    ]);

    while let Some(event) = events.recv().await {
        let produced = match event {
            CompositorEvent::Window(payload) => handle_window_event(&daemon, &payload).await,
            CompositorEvent::Workspace(payload) => handle_workspace_event(&payload),
            CompositorEvent::Output(_) => {
                seed_from_compositor(&daemon).await;
                vec![CoreEvent::OutputChange { outputs: daemon.state.list_outputs().await }]
            }
            CompositorEvent::Reconnected => {
                info!("compositor connection re-established; re-seeding outputs");
                seed_from_compositor(&daemon).await;
                vec![]
            }
            CompositorEvent::Mode(_)
            | CompositorEvent::BindingModeUpdate(_)
            | CompositorEvent::Shutdown(_)
            | CompositorEvent::Tick(_) => vec![],
        };

        for event in produced {
            daemon.record_event(&event).await;
            daemon.broadcast(&event).await;
        }
    }

    warn!("compositor event stream ended");
}

async fn handle_window_event(daemon: &Arc<DaemonState>, payload: &i3pm_ipc::events::WindowEventPayload) -> Vec<CoreEvent> {
    let container = &payload.container;
    let Some(window_id) = container.get("id").and_then(serde_json::Value::as_u64) else {
        return vec![];
    };
    let window_id = window_id as i64;

    match payload.change.as_str() {
        "close" => {
            daemon.state.remove_window(window_id).await;
            vec![CoreEvent::WindowClose { window_id }]
        }
        "new" | "title" => {
            let window = project_window(daemon, container, window_id).await;
            if let Err(err) = daemon.state.upsert_window(window.clone()).await {
                warn!("failed to upsert window {window_id}: {err}");
                return vec![];
            }
            vec![CoreEvent::WindowNew { window }]
        }
        "focus" => {
            if daemon.state.set_focused_window(window_id).await.is_ok() {
                vec![CoreEvent::WindowFocus { window_id }]
            } else {
                vec![]
            }
        }
        "move" => {
            let workspace_num = container
                .get("workspace_num")
                .and_then(serde_json::Value::as_u64)
                .map_or(1, |n| n as u8);
            let output_name = container.get("output").and_then(serde_json::Value::as_str).unwrap_or("").to_string();
            daemon.state.update_window_position(window_id, workspace_num, output_name).await;
            vec![CoreEvent::WindowMove { window_id, workspace_num }]
        }
        _ => vec![],
    }
}

async fn project_window(daemon: &Arc<DaemonState>, container: &serde_json::Value, window_id: i64) -> Window {
    let app_id = container
        .get("app_id")
        .and_then(serde_json::Value::as_str)
        .or_else(|| container.get("window_properties").and_then(|w| w.get("class")).and_then(serde_json::Value::as_str))
        .unwrap_or("unknown")
        .to_string();
    let class = container
        .get("window_properties")
        .and_then(|w| w.get("class"))
        .and_then(serde_json::Value::as_str)
        .map(str::to_string);
    let instance = container
        .get("window_properties")
        .and_then(|w| w.get("instance"))
        .and_then(serde_json::Value::as_str)
        .map(str::to_string);
    let title = container.get("name").and_then(serde_json::Value::as_str).unwrap_or("").to_string();
    let pid = container.get("pid").and_then(serde_json::Value::as_i64).map(|p| p as i32);
    let workspace_num =
        container.get("workspace_num").and_then(serde_json::Value::as_u64).map_or(1, |n| n as u8);
    let output_name = container.get("output").and_then(serde_json::Value::as_str).unwrap_or("").to_string();

    let applications = daemon.applications.read().await;
    let identity =
        matcher::classify_window(&daemon.launch_registry, &applications, pid, &app_id, workspace_num, unix_timestamp())
            .await;

    let (scope, project) = identity
        .as_ref()
        .map(|i| (i.scope, i.project_name.clone()))
        .unwrap_or((Scope::Global, None));
    let marks = match (&scope, &project) {
        (Scope::Scoped, Some(project)) => vec![Window::scoped_mark(project, window_id)],
        _ => vec![],
    };

    let pwa_match = i3pm_core::matcher::heuristic::detect_pwa(class.as_deref(), instance.as_deref());

    Window {
        window_id,
        pid,
        app_id,
        instance,
        class,
        title,
        workspace_num,
        output_name,
        marks,
        is_floating: false,
        is_pwa: pwa_match.is_some(),
        pwa_type: pwa_match.map(|m| m.pwa_type),
        pwa_id: None,
        i3pm_env: None,
        scope,
        project,
        focused: false,
        visible: true,
        created_at: unix_timestamp(),
    }
}

fn handle_workspace_event(payload: &i3pm_ipc::events::WorkspaceEventPayload) -> Vec<CoreEvent> {
    let Some(current) = &payload.current else { return vec![] };
    let Some(num) = current.get("num").and_then(serde_json::Value::as_u64) else {
        return vec![];
    };
    let output_name = current.get("output").and_then(serde_json::Value::as_str).unwrap_or("").to_string();
    vec![CoreEvent::WorkspaceFocus { workspace_num: num as u8, output_name }]
}
