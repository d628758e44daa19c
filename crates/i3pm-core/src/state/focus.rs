//! Per-project and per-workspace focus tracking, persisted to disk so the
//! daemon can restore "what was focused" across restarts.

use std::path::{Path, PathBuf};

use i3pm_types::{FocusState, WindowId};
use tokio::sync::RwLock;
use tracing::warn;

use crate::error::Result;

pub struct FocusTracker {
    state: RwLock<FocusState>,
    project_file: PathBuf,
    workspace_file: PathBuf,
}

impl FocusTracker {
    #[must_use]
    pub fn new(project_file: PathBuf, workspace_file: PathBuf) -> Self {
        Self {
            state: RwLock::new(FocusState::default()),
            project_file,
            workspace_file,
        }
    }

    /// Loads both state files from disk, logging and falling back to empty
    /// state on any parse failure rather than failing daemon startup.
    pub async fn load(&self) {
        let mut state = self.state.write().await;
        state.project_focused_workspace = load_or_default(&self.project_file);
        state.workspace_focused_window = load_or_default(&self.workspace_file);
    }

    pub async fn track_workspace_focus(&self, project: &str, workspace_num: u8) {
        let mut state = self.state.write().await;
        state
            .project_focused_workspace
            .insert(project.to_string(), workspace_num);
        drop(state);
        self.persist_project_state().await;
    }

    pub async fn track_window_focus(&self, workspace_num: u8, window_id: WindowId) {
        let mut state = self.state.write().await;
        state.workspace_focused_window.insert(workspace_num, window_id);
        drop(state);
        self.persist_workspace_state().await;
    }

    pub async fn project_focused_workspace(&self, project: &str) -> Option<u8> {
        self.state.read().await.project_focused_workspace.get(project).copied()
    }

    pub async fn workspace_focused_window(&self, workspace_num: u8) -> Option<WindowId> {
        self.state.read().await.workspace_focused_window.get(&workspace_num).copied()
    }

    async fn persist_project_state(&self) {
        let state = self.state.read().await;
        if let Err(err) = write_json(&self.project_file, &state.project_focused_workspace) {
            warn!(error = %err, path = %self.project_file.display(), "failed to persist project focus state");
        }
    }

    async fn persist_workspace_state(&self) {
        let state = self.state.read().await;
        if let Err(err) = write_json(&self.workspace_file, &state.workspace_focused_window) {
            warn!(error = %err, path = %self.workspace_file.display(), "failed to persist workspace focus state");
        }
    }
}

fn load_or_default<T: serde::de::DeserializeOwned + Default>(path: &Path) -> T {
    let Ok(content) = std::fs::read_to_string(path) else {
        return T::default();
    };
    serde_json::from_str(&content).unwrap_or_else(|err| {
        warn!(error = %err, path = %path.display(), "corrupt focus state file, starting empty");
        T::default()
    })
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn track_and_query_project_focused_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = FocusTracker::new(
            dir.path().join("project-focus-state.json"),
            dir.path().join("workspace-focus-state.json"),
        );

        tracker.track_workspace_focus("nixos", 3).await;
        assert_eq!(tracker.project_focused_workspace("nixos").await, Some(3));
    }

    #[tokio::test]
    async fn persisted_state_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let project_file = dir.path().join("project-focus-state.json");
        let workspace_file = dir.path().join("workspace-focus-state.json");

        let tracker = FocusTracker::new(project_file.clone(), workspace_file.clone());
        tracker.track_workspace_focus("nixos", 5).await;
        tracker.track_window_focus(5, 42).await;

        let reloaded = FocusTracker::new(project_file, workspace_file);
        reloaded.load().await;
        assert_eq!(reloaded.project_focused_workspace("nixos").await, Some(5));
        assert_eq!(reloaded.workspace_focused_window(5).await, Some(42));
    }

    #[tokio::test]
    async fn corrupt_file_loads_as_empty_instead_of_panicking() {
        let dir = tempfile::tempdir().unwrap();
        let project_file = dir.path().join("project-focus-state.json");
        std::fs::write(&project_file, "{not valid json").unwrap();

        let tracker = FocusTracker::new(project_file, dir.path().join("workspace-focus-state.json"));
        tracker.load().await;
        assert_eq!(tracker.project_focused_workspace("anything").await, None);
    }
}
