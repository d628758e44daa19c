//! Layout capture/restore handlers.

use i3pm_core::layout::auto_restore::{plan_restore, spawn_pending_restores};
use i3pm_core::layout::auto_save::{auto_save_on_switch, generate_auto_save_name, DEFAULT_MAX_AUTO_SAVES};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{require_params, HandlerContext};
use crate::error::{DaemonError, Result};
use crate::server::unix_timestamp;

#[derive(Deserialize)]
struct SaveParams {
    project: String,
    layout_name: String,
}

pub async fn save(ctx: &HandlerContext, params: Option<Value>) -> Result<Value> {
    let params: SaveParams = require_params(params)?;
    let now = unix_timestamp();
    let snapshot = ctx.daemon.orchestrator.capture_layout(&params.project, &params.layout_name, now).await;
    let window_count = snapshot.window_count();
    let workspace_count = snapshot.workspace_count();

    let dir = ctx.daemon.dirs.project_layouts_dir(&params.project);
    let path = dir.join(format!("{}.json", params.layout_name));
    snapshot.save(&path).map_err(DaemonError::Core)?;

    Ok(json!({
        "path": path.display().to_string(),
        "window_count": window_count,
        "workspace_count": workspace_count,
    }))
}

#[derive(Deserialize)]
struct RestoreParams {
    project: String,
}

pub async fn restore(ctx: &HandlerContext, params: Option<Value>) -> Result<Value> {
    let params: RestoreParams = require_params(params)?;
    let dir = ctx.daemon.dirs.project_layouts_dir(&params.project);
    let leaf_pids: Vec<i32> = ctx.daemon.state.list_windows().await.into_iter().filter_map(|w| w.pid).collect();
    let pending = plan_restore(&dir, &leaf_pids).map_err(DaemonError::Core)?;

    let applications = ctx.daemon.applications.read().await;
    let windows_restored =
        spawn_pending_restores(&pending, &applications, &ctx.daemon.launch_registry, &params.project, unix_timestamp())
            .await;

    Ok(json!({
        "windows_restored": windows_restored,
        "windows_planned": pending.iter().map(|p| json!({
            "app_name": p.app_name,
            "workspace_num": p.workspace_num,
        })).collect::<Vec<_>>(),
    }))
}

#[derive(Deserialize)]
struct AutoSaveTriggerParams {
    project: String,
}

pub async fn auto_save_trigger(ctx: &HandlerContext, params: Option<Value>) -> Result<Value> {
    let params: AutoSaveTriggerParams = require_params(params)?;
    let now = unix_timestamp();
    let layout_name = generate_auto_save_name(now as i64);
    let snapshot = ctx.daemon.orchestrator.capture_layout(&params.project, &layout_name, now).await;
    let window_count = snapshot.window_count();
    let workspace_count = snapshot.workspace_count();

    let max_count = ctx
        .daemon
        .state
        .get_project(&params.project)
        .await
        .and_then(|p| p.max_auto_saves)
        .unwrap_or(DEFAULT_MAX_AUTO_SAVES);
    let dir = ctx.daemon.dirs.project_layouts_dir(&params.project);
    let path = auto_save_on_switch(snapshot, &dir, max_count).map_err(DaemonError::Core)?;

    Ok(json!({
        "layout_name": layout_name,
        "path": path.display().to_string(),
        "window_count": window_count,
        "workspace_count": workspace_count,
    }))
}
