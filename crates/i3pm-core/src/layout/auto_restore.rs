//! Idempotent layout restore on project switch: relaunches the apps
//! recorded in a project's most recent auto-save, skipping any that are
//! already running so switching back and forth doesn't pile up duplicates.

use std::path::{Path, PathBuf};

use i3pm_types::{Application, PendingLaunch};
use tracing::warn;
use uuid::Uuid;

use crate::error::Result;
use crate::matcher::environment::detect_running_apps;
use crate::matcher::LaunchRegistry;

use super::LayoutSnapshot;

const AUTO_SAVE_PREFIX: &str = "auto-";

/// Finds the most recently modified auto-save layout file in a project's
/// layouts directory, if any.
///
/// # Errors
///
/// Returns an error if the directory exists but can't be read.
pub fn latest_auto_save(project_layouts_dir: &Path) -> Result<Option<PathBuf>> {
    if !project_layouts_dir.is_dir() {
        return Ok(None);
    }

    let mut candidates: Vec<(PathBuf, std::time::SystemTime)> = std::fs::read_dir(project_layouts_dir)?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_stem()
                .and_then(std::ffi::OsStr::to_str)
                .is_some_and(|stem| stem.starts_with(AUTO_SAVE_PREFIX))
        })
        .filter_map(|path| {
            let modified = std::fs::metadata(&path).and_then(|m| m.modified()).ok()?;
            Some((path, modified))
        })
        .collect();

    candidates.sort_by(|a, b| b.1.cmp(&a.1));
    Ok(candidates.into_iter().next().map(|(path, _)| path))
}

/// An app entry from a layout snapshot that still needs to be relaunched
/// because no window for it is currently running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRestore {
    pub app_name: String,
    pub workspace_num: u8,
}

/// Computes which windows from the latest auto-save still need relaunching,
/// given the set of leaf process pids currently present on the system.
/// Apps whose name is already among `detect_running_apps(leaf_pids)` are
/// skipped, making repeated restores idempotent.
///
/// # Errors
///
/// Returns an error if the project has no readable layouts directory.
pub fn plan_restore(project_layouts_dir: &Path, leaf_pids: &[i32]) -> Result<Vec<PendingRestore>> {
    let Some(path) = latest_auto_save(project_layouts_dir)? else {
        return Ok(vec![]);
    };
    let snapshot = LayoutSnapshot::load(&path)?;
    let running = detect_running_apps(leaf_pids);

    Ok(snapshot
        .windows
        .into_iter()
        .filter(|w| !running.contains(&w.app_name))
        .map(|w| PendingRestore {
            app_name: w.app_name,
            workspace_num: w.workspace_num,
        })
        .collect())
}

/// Relaunches each pending restore whose app is still configured, registering
/// a launch with `registry` before spawning so the resulting window
/// correlates through the normal Tier 0 launch-registry match rather than
/// falling through to heuristic scoring. Entries whose `app_name` no longer
/// matches any configured application are skipped. Returns the number of
/// processes actually spawned.
pub async fn spawn_pending_restores(
    pending: &[PendingRestore],
    applications: &[Application],
    registry: &LaunchRegistry,
    project: &str,
    now: f64,
) -> usize {
    let mut spawned = 0;
    for restore in pending {
        let Some(app) = applications.iter().find(|a| a.name == restore.app_name) else {
            warn!("auto-restore: app {} is no longer configured, skipping", restore.app_name);
            continue;
        };

        let launch = PendingLaunch {
            launch_id: Uuid::new_v4(),
            app_name: app.name.clone(),
            project_name: Some(project.to_string()),
            project_dir: None,
            launcher_pid: std::process::id() as i32,
            expected_class: app.expected_class.clone(),
            workspace_num: Some(restore.workspace_num),
            timestamp: now,
            matched: false,
            correlation_timeout: 2.0,
        };
        registry.register(launch).await;

        match std::process::Command::new(&app.command).args(&app.parameters).spawn() {
            Ok(_) => spawned += 1,
            Err(err) => warn!("auto-restore: failed to spawn {}: {err}", app.name),
        }
    }
    spawned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayoutWindowEntry;

    fn write_snapshot(dir: &Path, name: &str, windows: Vec<LayoutWindowEntry>) {
        let snapshot = LayoutSnapshot {
            project: "nixos".into(),
            layout_name: name.into(),
            created_at: 0.0,
            windows,
        };
        snapshot.save(&dir.join(format!("{name}.json"))).unwrap();
    }

    #[test]
    fn latest_auto_save_picks_most_recently_modified() {
        let dir = tempfile::tempdir().unwrap();
        write_snapshot(dir.path(), "auto-20240101-000000", vec![]);
        std::thread::sleep(std::time::Duration::from_millis(5));
        write_snapshot(dir.path(), "auto-20240102-000000", vec![]);

        let latest = latest_auto_save(dir.path()).unwrap().unwrap();
        assert_eq!(latest.file_stem().unwrap(), "auto-20240102-000000");
    }

    #[test]
    fn latest_auto_save_ignores_manual_saves() {
        let dir = tempfile::tempdir().unwrap();
        write_snapshot(dir.path(), "release-cut", vec![]);
        assert!(latest_auto_save(dir.path()).unwrap().is_none());
    }

    #[test]
    fn latest_auto_save_none_when_dir_missing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        assert!(latest_auto_save(&missing).unwrap().is_none());
    }

    #[test]
    fn plan_restore_skips_already_running_apps() {
        let dir = tempfile::tempdir().unwrap();
        write_snapshot(
            dir.path(),
            "auto-20240101-000000",
            vec![
                LayoutWindowEntry { app_name: "vscode".into(), workspace_num: 1, is_floating: false },
                LayoutWindowEntry { app_name: "firefox".into(), workspace_num: 2, is_floating: false },
            ],
        );

        // Our own test process's pid is guaranteed to have no I3PM_APP_NAME
        // set, so detect_running_apps returns empty and nothing is skipped.
        let pid = std::process::id() as i32;
        let plan = plan_restore(dir.path(), &[pid]).unwrap();
        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn plan_restore_empty_when_no_auto_save_exists() {
        let dir = tempfile::tempdir().unwrap();
        let plan = plan_restore(dir.path(), &[]).unwrap();
        assert!(plan.is_empty());
    }

    fn app(name: &str) -> Application {
        Application {
            name: name.into(),
            display_name: name.into(),
            command: "true".into(),
            parameters: vec![],
            expected_class: name.into(),
            scope: i3pm_types::Scope::Scoped,
            preferred_workspace: 1,
            preferred_monitor_role: None,
            icon: None,
            terminal: false,
            ulid: None,
        }
    }

    #[tokio::test]
    async fn spawn_pending_restores_skips_unconfigured_apps() {
        let registry = LaunchRegistry::new();
        let pending = vec![PendingRestore { app_name: "ghost".into(), workspace_num: 2 }];
        let spawned = spawn_pending_restores(&pending, &[], &registry, "nixos", 0.0).await;
        assert_eq!(spawned, 0);
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn spawn_pending_restores_registers_a_launch_before_spawning() {
        let registry = LaunchRegistry::new();
        let applications = vec![app("true-app")];
        let pending = vec![PendingRestore { app_name: "true-app".into(), workspace_num: 3 }];

        let spawned = spawn_pending_restores(&pending, &applications, &registry, "nixos", 0.0).await;
        assert_eq!(spawned, 1);
        assert_eq!(registry.len().await, 1);
    }
}
