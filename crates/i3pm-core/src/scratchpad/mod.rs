//! Project-scoped scratchpad terminal launching: selecting a terminal
//! emulator, building its launch invocation, and registering a Tier 0
//! launch-registry entry before spawning so the window can be matched back
//! to this launch with high confidence the moment it maps.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use i3pm_types::PendingLaunch;
use tokio::process::Command;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::matcher::launch_registry::LaunchRegistry;

/// A terminal emulator available for scratchpad use, in preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalEmulator {
    Ghostty,
    Alacritty,
}

impl TerminalEmulator {
    #[must_use]
    pub fn command(self) -> &'static str {
        match self {
            Self::Ghostty => "ghostty",
            Self::Alacritty => "alacritty",
        }
    }

    /// Expected `app_id`/class for window matching once launched.
    #[must_use]
    pub fn expected_class(self) -> &'static str {
        match self {
            Self::Ghostty => "com.mitchellh.ghostty",
            Self::Alacritty => "Alacritty",
        }
    }

    fn launch_args(self, working_dir: &Path) -> Vec<String> {
        let dir = working_dir.display().to_string();
        match self {
            Self::Ghostty => vec![format!("--working-directory={dir}")],
            Self::Alacritty => vec!["--working-directory".to_string(), dir],
        }
    }
}

/// Looks up `command -v <name>` synchronously, so callers can decide which
/// terminal to offer before touching the async process-spawning path.
fn command_exists(name: &str) -> bool {
    std::process::Command::new("command")
        .arg("-v")
        .arg(name)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}

/// Selects Ghostty as the primary scratchpad terminal, falling back to
/// Alacritty.
///
/// # Errors
///
/// Returns [`Error::NoTerminalEmulator`] if neither is on `PATH`.
pub fn select_terminal_emulator() -> Result<TerminalEmulator> {
    if command_exists("ghostty") {
        debug!("selected ghostty as scratchpad terminal");
        return Ok(TerminalEmulator::Ghostty);
    }
    if command_exists("alacritty") {
        debug!("ghostty unavailable, falling back to alacritty");
        return Ok(TerminalEmulator::Alacritty);
    }
    warn!("neither ghostty nor alacritty found on PATH");
    Err(Error::NoTerminalEmulator)
}

/// The `I3PM_*` environment block injected into a scratchpad terminal so the
/// matcher's Tier 1 environment lookup can identify its window deterministically.
#[must_use]
pub fn build_launch_environment(project_name: &str, working_dir: &Path, app_id: &str) -> Vec<(String, String)> {
    vec![
        ("I3PM_SCRATCHPAD".to_string(), "true".to_string()),
        ("I3PM_APP_NAME".to_string(), "scratchpad-terminal".to_string()),
        ("I3PM_PROJECT_NAME".to_string(), project_name.to_string()),
        ("I3PM_WORKING_DIR".to_string(), working_dir.display().to_string()),
        ("I3PM_SCOPE".to_string(), "scoped".to_string()),
        ("I3PM_APP_ID".to_string(), app_id.to_string()),
    ]
}

fn spawn_terminal(terminal: TerminalEmulator, working_dir: &Path, env: &[(String, String)]) -> Result<u32> {
    let mut command = Command::new(terminal.command());
    command
        .args(terminal.launch_args(working_dir))
        .current_dir(working_dir)
        .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(false);

    let child = command.spawn().map_err(Error::Io)?;
    child.id().ok_or_else(|| Error::Io(std::io::Error::other("spawned terminal has no pid")))
}

/// Launches a project's scratchpad terminal, enforcing the
/// one-terminal-per-project invariant via `scratchpads` before touching the
/// process table.
///
/// # Errors
///
/// Returns [`Error::Validation`] if a terminal already exists for this
/// project, [`Error::NoTerminalEmulator`] if none is installed, or
/// [`Error::Io`] if spawning fails.
pub async fn launch_project_scratchpad(
    scratchpads: &ScratchpadRegistry,
    registry: &LaunchRegistry,
    project_name: &str,
    working_dir: &Path,
    now: f64,
) -> Result<PendingLaunch> {
    if scratchpads.has_terminal(project_name).await {
        return Err(Error::Validation(format!(
            "terminal already exists for project {project_name}"
        )));
    }

    let terminal = select_terminal_emulator()?;
    let app_id = format!("scratchpad-{project_name}-{}", now as i64);

    let pending = PendingLaunch {
        launch_id: Uuid::new_v4(),
        app_name: "scratchpad-terminal".to_string(),
        project_name: Some(project_name.to_string()),
        project_dir: Some(working_dir.display().to_string()),
        launcher_pid: std::process::id() as i32,
        expected_class: terminal.expected_class().to_string(),
        workspace_num: None,
        timestamp: now,
        matched: false,
        correlation_timeout: 2.0,
    };
    registry.register(pending.clone()).await;

    let env = build_launch_environment(project_name, working_dir, &app_id);
    let pid = spawn_terminal(terminal, working_dir, &env)?;
    scratchpads
        .register(project_name, pid as i32, terminal.expected_class())
        .await?;

    Ok(pending)
}

/// Resolves the scratchpad working directory for a project: its source
/// root, or the user's home directory for the global (unscoped) scratchpad.
#[must_use]
pub fn resolve_working_dir(project_root: Option<&Path>) -> PathBuf {
    project_root.map_or_else(
        || std::env::var("HOME").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("/")),
        Path::to_path_buf,
    )
}

/// Whether a project's scratchpad terminal is currently shown or parked in
/// the scratchpad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScratchpadVisibility {
    Shown,
    Hidden,
}

#[derive(Debug, Clone)]
struct ScratchpadEntry {
    pid: i32,
    expected_class: String,
    visibility: ScratchpadVisibility,
}

/// Tracks the one-terminal-per-project invariant for scratchpad terminals:
/// at most one live terminal exists per project name (including the
/// `"global"` scratchpad), and it is either shown or parked.
#[derive(Debug, Default)]
pub struct ScratchpadRegistry {
    entries: RwLock<HashMap<String, ScratchpadEntry>>,
}

impl ScratchpadRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a just-launched terminal for a project.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if a terminal is already registered for
    /// this project (the one-terminal-per-project invariant).
    pub async fn register(&self, project_name: &str, pid: i32, expected_class: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(project_name) {
            return Err(Error::Validation(format!(
                "terminal already exists for project {project_name}"
            )));
        }
        entries.insert(
            project_name.to_string(),
            ScratchpadEntry {
                pid,
                expected_class: expected_class.to_string(),
                visibility: ScratchpadVisibility::Shown,
            },
        );
        Ok(())
    }

    pub async fn has_terminal(&self, project_name: &str) -> bool {
        self.entries.read().await.contains_key(project_name)
    }

    /// Flips a project's scratchpad terminal between shown and hidden,
    /// returning the compositor command to run and its new visibility.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if no terminal is registered for this project.
    pub async fn toggle(&self, project_name: &str) -> Result<(String, ScratchpadVisibility)> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(project_name)
            .ok_or_else(|| Error::Validation(format!("no scratchpad terminal for project {project_name}")))?;

        entry.visibility = match entry.visibility {
            ScratchpadVisibility::Shown => ScratchpadVisibility::Hidden,
            ScratchpadVisibility::Hidden => ScratchpadVisibility::Shown,
        };
        let command = match entry.visibility {
            ScratchpadVisibility::Shown => format!("[instance=\"{}\"] scratchpad show", entry.expected_class),
            ScratchpadVisibility::Hidden => format!("[instance=\"{}\"] move to scratchpad", entry.expected_class),
        };
        Ok((command, entry.visibility))
    }

    /// Drops entries whose process no longer exists, e.g. the terminal was
    /// closed directly rather than through `toggle`.
    pub async fn cleanup_dead(&self) {
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| std::path::Path::new(&format!("/proc/{}", entry.pid)).exists());
    }
}
