//! Project/workspace orchestrator: the switch pipeline that ties together
//! the state store, focus tracker, monitor-role resolver, and the layout
//! engine into one coherent project switch.
//!
//! The orchestrator never owns an event bus; it returns the [`CoreEvent`]s
//! a switch produced and lets the daemon broadcast them, so this module
//! stays testable without a live compositor connection wired through a
//! channel.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use i3pm_ipc::CompositorClient;
use i3pm_types::{Application, CoreEvent, Output, Project, Scope, Window};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::Result;
use crate::layout::auto_restore::{plan_restore, spawn_pending_restores};
use crate::layout::auto_save::{auto_save_on_switch, generate_auto_save_name, DEFAULT_MAX_AUTO_SAVES};
use crate::layout::{LayoutSnapshot, LayoutWindowEntry};
use crate::matcher::LaunchRegistry;
use crate::roles::{self, OutputPreferences};
use crate::state::focus::FocusTracker;
use crate::state::StateStore;

pub struct ProjectOrchestrator {
    state: Arc<StateStore>,
    focus: Arc<FocusTracker>,
    layouts_root: PathBuf,
    launch_registry: Arc<LaunchRegistry>,
    applications: Arc<RwLock<Vec<Application>>>,
    output_preferences: OutputPreferences,
}

impl ProjectOrchestrator {
    #[must_use]
    pub fn new(
        state: Arc<StateStore>,
        focus: Arc<FocusTracker>,
        layouts_root: PathBuf,
        launch_registry: Arc<LaunchRegistry>,
        applications: Arc<RwLock<Vec<Application>>>,
    ) -> Self {
        Self {
            state,
            focus,
            layouts_root,
            launch_registry,
            applications,
            output_preferences: OutputPreferences::default(),
        }
    }

    fn project_layouts_dir(&self, project: &str) -> PathBuf {
        self.layouts_root.join(project)
    }

    /// Captures the current window/workspace arrangement for a project into
    /// a named layout snapshot.
    pub async fn capture_layout(&self, project: &str, layout_name: &str, now: f64) -> LayoutSnapshot {
        let windows = self.state.list_windows_for_project(project).await;
        LayoutSnapshot {
            project: project.to_string(),
            layout_name: layout_name.to_string(),
            created_at: now,
            windows: windows
                .into_iter()
                .map(|w| LayoutWindowEntry {
                    app_name: w.app_id,
                    workspace_num: w.workspace_num,
                    is_floating: w.is_floating,
                })
                .collect(),
        }
    }

    /// Runs the full project-switch pipeline, returning the ordered list of
    /// events produced (for the caller to broadcast to RPC subscribers).
    ///
    /// Pipeline: emit `project.switching` -> conditional auto-save of the
    /// outgoing project's layout (errors are logged, never fatal) -> update
    /// active project -> hide scoped windows belonging to every other
    /// project while ensuring the new project's scoped windows carry their
    /// mark -> conditional auto-restore -> restore persisted focus -> emit
    /// `project.switched`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the state store rejects a window update
    /// (e.g. a scoped-mark invariant violation); layout I/O failures are
    /// swallowed and logged, since a failed auto-save must never block the
    /// switch itself.
    pub async fn switch_project(
        &self,
        compositor: &CompositorClient,
        project: &Project,
        now: f64,
    ) -> Result<Vec<CoreEvent>> {
        let mut events = Vec::new();
        let previous = self.state.active_project().await;

        events.push(CoreEvent::ProjectSwitching {
            from: previous.clone(),
            to: project.name.clone(),
        });

        if let Some(outgoing) = &previous {
            if outgoing != &project.name {
                if let Some(event) = self.auto_save_outgoing(outgoing, now).await {
                    events.push(event);
                }
            }
        }

        self.state.set_active_project(Some(project.name.clone())).await;

        self.reconcile_scoped_visibility(compositor, &project.name).await;

        if project.auto_restore {
            if let Some(event) = self.auto_restore_incoming(&project.name, now).await {
                events.push(event);
            }
        }

        if let Some(workspace_num) = self.focus.project_focused_workspace(&project.name).await {
            let command = format!("workspace number {workspace_num}");
            if let Err(err) = compositor.run_command(&command).await {
                warn!("failed to restore focus for project {}: {err}", project.name);
            }
        }

        events.push(CoreEvent::ProjectSwitched {
            from: previous,
            to: project.name.clone(),
        });

        Ok(events)
    }

    async fn auto_save_outgoing(&self, project: &str, now: f64) -> Option<CoreEvent> {
        let layout_name = generate_auto_save_name(now as i64);
        let snapshot = self.capture_layout(project, &layout_name, now).await;
        let window_count = snapshot.window_count();
        let workspace_count = snapshot.workspace_count();
        let dir = self.project_layouts_dir(project);
        let max_count = self
            .state
            .get_project(project)
            .await
            .and_then(|p| p.max_auto_saves)
            .unwrap_or(DEFAULT_MAX_AUTO_SAVES);

        match auto_save_on_switch(snapshot, &dir, max_count) {
            Ok(path) => Some(CoreEvent::LayoutAutoSaved {
                project: project.to_string(),
                layout_name,
                path: path.display().to_string(),
                window_count,
                workspace_count,
            }),
            Err(err) => {
                warn!("auto-save failed for project {project}: {err}");
                None
            }
        }
    }

    async fn auto_restore_incoming(&self, project: &str, now: f64) -> Option<CoreEvent> {
        let dir = self.project_layouts_dir(project);
        let leaf_pids = self.running_leaf_pids().await;

        match plan_restore(&dir, &leaf_pids) {
            Ok(pending) if pending.is_empty() => None,
            Ok(pending) => {
                debug!("auto-restore plan for {project}: {} window(s)", pending.len());
                let applications = self.applications.read().await;
                let windows_restored =
                    spawn_pending_restores(&pending, &applications, &self.launch_registry, project, now).await;
                Some(CoreEvent::LayoutAutoRestored {
                    project: project.to_string(),
                    layout_name: "latest".to_string(),
                    windows_restored,
                })
            }
            Err(err) => {
                warn!("auto-restore failed for project {project}: {err}");
                None
            }
        }
    }

    async fn running_leaf_pids(&self) -> Vec<i32> {
        self.state.list_windows().await.into_iter().filter_map(|w| w.pid).collect()
    }

    /// Hides scoped windows belonging to every project other than the
    /// incoming one and ensures the incoming project's scoped windows are
    /// shown; global windows are never touched. This is the defining
    /// invariant of a project switch: scope, not workspace, decides
    /// visibility.
    async fn reconcile_scoped_visibility(&self, compositor: &CompositorClient, incoming_project: &str) {
        let windows = self.state.list_windows().await;
        for window in windows {
            if window.scope != Scope::Scoped {
                continue;
            }
            let Some(owner) = &window.project else { continue };
            let should_show = owner == incoming_project;
            let mark = Window::scoped_mark(owner, window.window_id);
            let command = if should_show {
                format!("[con_mark=\"{mark}\"] scratchpad show")
            } else {
                format!("[con_mark=\"{mark}\"] move to scratchpad")
            };
            if let Err(err) = compositor.run_command(&command).await {
                warn!("failed to reconcile visibility for window {}: {err}", window.window_id);
            }
        }
    }

    /// Re-resolves monitor roles from a fresh output topology and persists
    /// the assignment into the state store.
    pub async fn reconcile_outputs(&self, outputs: Vec<Output>) {
        let resolved = roles::resolve_roles(&outputs, &self.output_preferences);
        self.state.replace_outputs(resolved.into_outputs()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use i3pm_types::WindowId;

    fn sample_window(id: WindowId, project: &str, scope: Scope) -> Window {
        Window {
            window_id: id,
            pid: None,
            app_id: "code".into(),
            instance: None,
            class: None,
            title: "editor".into(),
            workspace_num: 1,
            output_name: "eDP-1".into(),
            marks: if scope == Scope::Scoped { vec![Window::scoped_mark(project, id)] } else { vec![] },
            is_floating: false,
            is_pwa: false,
            pwa_type: None,
            pwa_id: None,
            i3pm_env: None,
            scope,
            project: if scope == Scope::Scoped { Some(project.to_string()) } else { None },
            focused: false,
            visible: true,
            created_at: 0.0,
        }
    }

    #[tokio::test]
    async fn capture_layout_only_includes_the_requested_projects_windows() {
        let state = std::sync::Arc::new(StateStore::new());
        state.upsert_window(sample_window(1, "nixos", Scope::Scoped)).await.unwrap();
        state.upsert_window(sample_window(2, "other", Scope::Scoped)).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let focus = std::sync::Arc::new(FocusTracker::new(
            dir.path().join("project-focus-state.json"),
            dir.path().join("workspace-focus-state.json"),
        ));
        let orchestrator = ProjectOrchestrator::new(
            state,
            focus,
            dir.path().to_path_buf(),
            std::sync::Arc::new(LaunchRegistry::new()),
            std::sync::Arc::new(RwLock::new(vec![])),
        );

        let snapshot = orchestrator.capture_layout("nixos", "manual", 0.0).await;
        assert_eq!(snapshot.window_count(), 1);
    }
}
