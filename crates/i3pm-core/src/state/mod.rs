//! The single authoritative in-memory state model.
//!
//! One [`StateStore`] is shared (behind `Arc`) between the event-ingestion
//! task, every RPC handler, and the orchestrator. All mutation goes through
//! `&self` methods that take the write lock internally — callers never hold
//! the lock themselves, which rules out the lock-ordering deadlocks a
//! manually-locked design would invite.

pub mod focus;

use std::collections::HashMap;

use i3pm_types::{Output, OutputRole, Project, Scope, Window, WindowId, Workspace, WorkspaceModeState};
use tokio::sync::RwLock;

use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct StateInner {
    windows: HashMap<WindowId, Window>,
    workspaces: HashMap<u8, Workspace>,
    outputs: HashMap<String, Output>,
    projects: HashMap<String, Project>,
    active_project: Option<String>,
    workspace_mode: WorkspaceModeState,
}

#[derive(Debug, Default)]
pub struct StateStore {
    inner: RwLock<StateInner>,
}

impl StateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- windows -----------------------------------------------------

    /// Inserts or replaces a window.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the window's scope/marks are
    /// inconsistent (scoped windows must carry exactly one `scoped:<project>:<id>`
    /// mark matching their own project and id; global windows must carry none).
    pub async fn upsert_window(&self, window: Window) -> Result<()> {
        if !window.has_valid_scoped_mark() {
            return Err(Error::Validation(format!(
                "window {} has scope {:?} but marks {:?} don't satisfy the scoped-mark invariant",
                window.window_id, window.scope, window.marks
            )));
        }
        let mut inner = self.inner.write().await;
        inner.windows.insert(window.window_id, window);
        Ok(())
    }

    pub async fn remove_window(&self, window_id: WindowId) -> Option<Window> {
        self.inner.write().await.windows.remove(&window_id)
    }

    pub async fn get_window(&self, window_id: WindowId) -> Option<Window> {
        self.inner.read().await.windows.get(&window_id).cloned()
    }

    pub async fn list_windows(&self) -> Vec<Window> {
        self.inner.read().await.windows.values().cloned().collect()
    }

    /// Windows visible under a given project: its own scoped windows, plus
    /// every global window (global windows are visible regardless of which
    /// project is active).
    pub async fn list_windows_for_project(&self, project: &str) -> Vec<Window> {
        self.inner
            .read()
            .await
            .windows
            .values()
            .filter(|w| match w.scope {
                Scope::Global => true,
                Scope::Scoped => w.project.as_deref() == Some(project),
            })
            .cloned()
            .collect()
    }

    /// Updates an existing window's workspace/output assignment, e.g. after
    /// a compositor "move" event. A no-op if the window is unknown (it may
    /// have closed between the event firing and this call landing).
    pub async fn update_window_position(&self, window_id: WindowId, workspace_num: u8, output_name: String) {
        if let Some(window) = self.inner.write().await.windows.get_mut(&window_id) {
            window.workspace_num = workspace_num;
            window.output_name = output_name;
        }
    }

    /// Sets exactly one window as focused within a workspace, clearing any
    /// previously-focused window there (focus is exclusive per workspace).
    pub async fn set_focused_window(&self, window_id: WindowId) -> Result<()> {
        let mut inner = self.inner.write().await;
        let workspace_num = inner
            .windows
            .get(&window_id)
            .ok_or(Error::WindowNotFound(window_id))?
            .workspace_num;

        for window in inner.windows.values_mut() {
            if window.workspace_num == workspace_num {
                window.focused = window.window_id == window_id;
            }
        }
        Ok(())
    }

    // --- workspaces ----------------------------------------------------

    pub async fn upsert_workspace(&self, workspace: Workspace) {
        self.inner.write().await.workspaces.insert(workspace.num, workspace);
    }

    pub async fn get_workspace(&self, num: u8) -> Option<Workspace> {
        self.inner.read().await.workspaces.get(&num).cloned()
    }

    pub async fn list_workspaces(&self) -> Vec<Workspace> {
        self.inner.read().await.workspaces.values().cloned().collect()
    }

    // --- outputs ---------------------------------------------------------

    pub async fn upsert_output(&self, output: Output) {
        self.inner.write().await.outputs.insert(output.name.clone(), output);
    }

    pub async fn list_outputs(&self) -> Vec<Output> {
        self.inner.read().await.outputs.values().cloned().collect()
    }

    pub async fn get_output(&self, name: &str) -> Option<Output> {
        self.inner.read().await.outputs.get(name).cloned()
    }

    /// Replaces the whole output set and reassigns roles, used after an
    /// `output` compositor event since outputs are usually replaced wholesale.
    pub async fn replace_outputs(&self, outputs: Vec<Output>) {
        let mut inner = self.inner.write().await;
        inner.outputs = outputs.into_iter().map(|o| (o.name.clone(), o)).collect();
    }

    pub async fn set_output_role(&self, name: &str, role: OutputRole) {
        if let Some(output) = self.inner.write().await.outputs.get_mut(name) {
            output.role = role;
        }
    }

    // --- projects ----------------------------------------------------------

    pub async fn upsert_project(&self, project: Project) {
        self.inner.write().await.projects.insert(project.name.clone(), project);
    }

    pub async fn remove_project(&self, name: &str) -> Option<Project> {
        self.inner.write().await.projects.remove(name)
    }

    pub async fn get_project(&self, name: &str) -> Option<Project> {
        self.inner.read().await.projects.get(name).cloned()
    }

    pub async fn list_projects(&self) -> Vec<Project> {
        self.inner.read().await.projects.values().cloned().collect()
    }

    pub async fn active_project(&self) -> Option<String> {
        self.inner.read().await.active_project.clone()
    }

    /// Sets the active project. At most one project is ever active
    /// (`None` means no project is active, e.g. at daemon startup).
    pub async fn set_active_project(&self, project: Option<String>) {
        self.inner.write().await.active_project = project;
    }

    // --- workspace mode ------------------------------------------------

    pub async fn workspace_mode(&self) -> WorkspaceModeState {
        self.inner.read().await.workspace_mode.clone()
    }

    pub async fn set_workspace_mode(&self, state: WorkspaceModeState) {
        self.inner.write().await.workspace_mode = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use i3pm_types::PwaType;

    fn window(id: WindowId, scope: Scope, project: Option<&str>, marks: Vec<&str>) -> Window {
        Window {
            window_id: id,
            pid: Some(100),
            app_id: "test".into(),
            instance: None,
            class: Some("Test".into()),
            title: "test".into(),
            workspace_num: 1,
            output_name: "eDP-1".into(),
            marks: marks.into_iter().map(str::to_string).collect(),
            is_floating: false,
            is_pwa: false,
            pwa_type: None::<PwaType>,
            pwa_id: None,
            i3pm_env: None,
            scope,
            project: project.map(str::to_string),
            focused: false,
            visible: true,
            created_at: 0.0,
        }
    }

    #[tokio::test]
    async fn upsert_rejects_scoped_window_without_matching_mark() {
        let store = StateStore::new();
        let w = window(1, Scope::Scoped, Some("nixos"), vec![]);
        assert!(store.upsert_window(w).await.is_err());
    }

    #[tokio::test]
    async fn upsert_accepts_valid_scoped_window() {
        let store = StateStore::new();
        let w = window(1, Scope::Scoped, Some("nixos"), vec!["scoped:nixos:1"]);
        store.upsert_window(w).await.unwrap();
        assert!(store.get_window(1).await.is_some());
    }

    #[tokio::test]
    async fn list_windows_for_project_includes_global_and_own_scoped() {
        let store = StateStore::new();
        store
            .upsert_window(window(1, Scope::Scoped, Some("nixos"), vec!["scoped:nixos:1"]))
            .await
            .unwrap();
        store
            .upsert_window(window(2, Scope::Scoped, Some("other"), vec!["scoped:other:2"]))
            .await
            .unwrap();
        store.upsert_window(window(3, Scope::Global, None, vec![])).await.unwrap();

        let visible = store.list_windows_for_project("nixos").await;
        let ids: Vec<_> = visible.iter().map(|w| w.window_id).collect();
        assert!(ids.contains(&1));
        assert!(ids.contains(&3));
        assert!(!ids.contains(&2));
    }

    #[tokio::test]
    async fn set_focused_window_is_exclusive_within_workspace() {
        let store = StateStore::new();
        store.upsert_window(window(1, Scope::Global, None, vec![])).await.unwrap();
        store.upsert_window(window(2, Scope::Global, None, vec![])).await.unwrap();

        store.set_focused_window(1).await.unwrap();
        assert!(store.get_window(1).await.unwrap().focused);
        assert!(!store.get_window(2).await.unwrap().focused);

        store.set_focused_window(2).await.unwrap();
        assert!(!store.get_window(1).await.unwrap().focused);
        assert!(store.get_window(2).await.unwrap().focused);
    }

    #[tokio::test]
    async fn active_project_is_singular() {
        let store = StateStore::new();
        store.set_active_project(Some("nixos".into())).await;
        assert_eq!(store.active_project().await, Some("nixos".into()));

        store.set_active_project(Some("other".into())).await;
        assert_eq!(store.active_project().await, Some("other".into()));
    }

    #[tokio::test]
    async fn set_focused_window_rejects_unknown_window() {
        let store = StateStore::new();
        assert!(store.set_focused_window(999).await.is_err());
    }

    #[tokio::test]
    async fn update_window_position_persists_workspace_and_output() {
        let store = StateStore::new();
        store.upsert_window(window(1, Scope::Global, None, vec![])).await.unwrap();

        store.update_window_position(1, 4, "DP-1".into()).await;

        let updated = store.get_window(1).await.unwrap();
        assert_eq!(updated.workspace_num, 4);
        assert_eq!(updated.output_name, "DP-1");
    }

    #[tokio::test]
    async fn update_window_position_on_unknown_window_is_a_noop() {
        let store = StateStore::new();
        store.update_window_position(999, 4, "DP-1".into()).await;
        assert!(store.get_window(999).await.is_none());
    }
}
