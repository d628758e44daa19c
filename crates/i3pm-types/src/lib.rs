//! Shared wire and domain types for the i3pm daemon.
//!
//! These types are used across `i3pm-ipc`, `i3pm-core`, `i3pm-rpc`,
//! `i3pm-daemon`, and `i3pm-cli`. All are serializable for RPC transport
//! and on-disk persistence.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub type WindowId = i64;

/// Deserialize a Vec that may be null or missing (both become empty vec).
fn deserialize_null_as_empty_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    let opt: Option<Vec<T>> = Option::deserialize(deserializer)?;
    Ok(opt.unwrap_or_default())
}

/// `scope ∈ {scoped, global}` — a scoped window/project is tied to exactly
/// one project; a global one is visible regardless of the active project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Scoped,
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PwaType {
    Firefox,
    Chrome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub window_id: WindowId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<i32>,
    pub app_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    pub title: String,
    pub workspace_num: u8,
    pub output_name: String,
    #[serde(default, deserialize_with = "deserialize_null_as_empty_vec")]
    pub marks: Vec<String>,
    pub is_floating: bool,
    pub is_pwa: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pwa_type: Option<PwaType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pwa_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub i3pm_env: Option<HashMap<String, String>>,
    pub scope: Scope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    pub focused: bool,
    pub visible: bool,
    pub created_at: f64,
}

impl Window {
    /// The unified mark a scoped window must carry: `scoped:<project>:<window_id>`.
    #[must_use]
    pub fn scoped_mark(project: &str, window_id: WindowId) -> String {
        format!("scoped:{project}:{window_id}")
    }

    /// Whether this window currently satisfies the scoped-mark invariant
    /// (spec invariant: every scoped window carries exactly one mark of
    /// the form `scoped:<project>:<id>` matching its own project/id).
    #[must_use]
    pub fn has_valid_scoped_mark(&self) -> bool {
        match (self.scope, &self.project) {
            (Scope::Scoped, Some(project)) => {
                let expected = Self::scoped_mark(project, self.window_id);
                self.marks.iter().filter(|m| m.starts_with("scoped:")).count() == 1
                    && self.marks.contains(&expected)
            }
            (Scope::Global, _) => !self.marks.iter().any(|m| m.starts_with("scoped:")),
            (Scope::Scoped, None) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub num: u8,
    pub name: String,
    pub output_name: String,
    pub focused: bool,
    pub visible: bool,
    #[serde(default)]
    pub window_ids: Vec<WindowId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputRole {
    Primary,
    Secondary,
    Tertiary,
    Unassigned,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    pub name: String,
    pub active: bool,
    pub width: u32,
    pub height: u32,
    pub scale: f64,
    pub role: OutputRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectSourceType {
    Local,
    Worktree,
    Remote,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitMetadata {
    pub branch: Option<String>,
    pub remote_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub directory: String,
    pub scope: Scope,
    #[serde(default)]
    pub scoped_classes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
    #[serde(default = "default_true")]
    pub auto_save: bool,
    #[serde(default = "default_true")]
    pub auto_restore: bool,
    pub source_type: ProjectSourceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_metadata: Option<GitMetadata>,
    /// Per-project override of the auto-save prune count; default 10 when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_auto_saves: Option<u32>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorRole {
    Primary,
    Secondary,
    Tertiary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub name: String,
    pub display_name: String,
    pub command: String,
    #[serde(default)]
    pub parameters: Vec<String>,
    pub expected_class: String,
    pub scope: Scope,
    pub preferred_workspace: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_monitor_role: Option<MonitorRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub terminal: bool,
    /// PWA-only unique identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ulid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingLaunch {
    pub launch_id: Uuid,
    pub app_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_dir: Option<String>,
    pub launcher_pid: i32,
    pub expected_class: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_num: Option<u8>,
    pub timestamp: f64,
    pub matched: bool,
    /// Seconds; approximately 2.0 per the launch-correlation window.
    pub correlation_timeout: f64,
}

impl PendingLaunch {
    /// Absolute expiry window in seconds (5s, per the launch registry cleanup rule).
    pub const MAX_AGE_SECS: f64 = 5.0;

    #[must_use]
    pub fn is_expired(&self, now: f64) -> bool {
        now - self.timestamp > Self::MAX_AGE_SECS
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeState {
    Working,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Badge {
    pub window_id: WindowId,
    pub source: String,
    pub state: BadgeState,
    pub count: u32,
    pub timestamp: f64,
    pub needs_attention: bool,
}

impl Badge {
    /// Display string for the badge count: "1".."9", or "9+" beyond 9.
    #[must_use]
    pub fn display_count(&self) -> String {
        if self.count > 9 {
            "9+".to_string()
        } else {
            self.count.to_string()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeType {
    Goto,
    Move,
    Project,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    Digit,
    Project,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceModeState {
    pub active: bool,
    pub mode_type: ModeType,
    pub accumulated: String,
    pub input_type: InputType,
    pub entered_at: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_cache: Option<String>,
}

impl Default for WorkspaceModeState {
    fn default() -> Self {
        Self {
            active: false,
            mode_type: ModeType::Goto,
            accumulated: String::new(),
            input_type: InputType::Digit,
            entered_at: 0.0,
            output_cache: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceSwitch {
    pub workspace_num: u8,
    pub output_name: String,
    pub timestamp: f64,
    pub mode_type: ModeType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Window,
    Workspace,
    Output,
    Project,
    WorkspaceMode,
    Layout,
    Badge,
    Tick,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub timestamp: f64,
    pub event_type: String,
    pub payload: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<Uuid>,
    pub depth: u32,
    pub category: EventCategory,
}

/// Root event type + UUID + depth, propagated through event handlers via a
/// task-local context (see `i3pm-core::correlation`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationContext {
    pub correlation_id: Uuid,
    pub depth: u32,
}

impl CorrelationContext {
    #[must_use]
    pub fn new_root() -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            depth: 0,
        }
    }

    #[must_use]
    pub fn child(self) -> Self {
        Self {
            correlation_id: self.correlation_id,
            depth: self.depth + 1,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FocusState {
    pub project_focused_workspace: HashMap<String, u8>,
    pub workspace_focused_window: HashMap<u8, WindowId>,
}

/// Tagged enum of every event the daemon broadcasts to RPC subscribers.
/// Compositor-originated variants mirror the i3/Sway IPC event payloads;
/// daemon-originated variants (`ProjectSwitching`, `WorkspaceMode`, ...) are
/// synthesized by the orchestrator/state machines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoreEvent {
    WindowNew { window: Window },
    WindowClose { window_id: WindowId },
    WindowFocus { window_id: WindowId },
    WindowMove { window_id: WindowId, workspace_num: u8 },
    WorkspaceFocus { workspace_num: u8, output_name: String },
    OutputChange { outputs: Vec<Output> },
    ProjectSwitching { from: Option<String>, to: String },
    ProjectSwitched { from: Option<String>, to: String },
    WorkspaceMode { event_type: String, mode_type: ModeType, #[serde(skip_serializing_if = "Option::is_none")] direction: Option<String> },
    LayoutAutoSaved { project: String, layout_name: String, path: String, window_count: usize, workspace_count: usize },
    LayoutAutoRestored { project: String, layout_name: String, windows_restored: usize },
    BadgeUpdated { window_id: WindowId, badge: Badge },
}
