//! Window, badge, and configuration introspection handlers.

use i3pm_core::matcher;
use i3pm_types::{BadgeState, PendingLaunch};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{require_params, HandlerContext};
use crate::error::{DaemonError, Result};
use crate::server::unix_timestamp;

pub async fn get_status(ctx: &HandlerContext) -> Result<Value> {
    let daemon = &ctx.daemon;
    Ok(json!({
        "active_project": daemon.state.active_project().await,
        "window_count": daemon.state.list_windows().await.len(),
        "workspace_count": daemon.state.list_workspaces().await.len(),
        "pending_launches": daemon.launch_registry.len().await,
    }))
}

pub async fn get_windows(ctx: &HandlerContext) -> Result<Value> {
    Ok(json!(ctx.daemon.state.list_windows().await))
}

#[derive(Deserialize)]
struct EventsParams {
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    50
}

pub async fn get_events(ctx: &HandlerContext, params: Option<Value>) -> Result<Value> {
    let limit = params.map(require_params::<EventsParams>).transpose()?.map_or(50, |p| p.limit);
    Ok(json!(ctx.daemon.events.recent(limit).await))
}

pub async fn get_marks(ctx: &HandlerContext) -> Result<Value> {
    let marks = ctx.daemon.compositor.get_marks().await.map_err(DaemonError::Compositor)?;
    Ok(json!(marks))
}

#[derive(Deserialize)]
struct ClassifyParams {
    class: String,
    #[serde(default)]
    pid: Option<i32>,
    #[serde(default = "default_workspace")]
    active_workspace_num: u8,
}

fn default_workspace() -> u8 {
    1
}

pub async fn classify_window(ctx: &HandlerContext, params: Option<Value>) -> Result<Value> {
    let params: ClassifyParams = require_params(params)?;
    let applications = ctx.daemon.applications.read().await;
    let identity = matcher::classify_window(
        &ctx.daemon.launch_registry,
        &applications,
        params.pid,
        &params.class,
        params.active_workspace_num,
        unix_timestamp(),
    )
    .await;

    Ok(match identity {
        Some(identity) => json!({
            "app_name": identity.app_name,
            "project_name": identity.project_name,
            "scope": identity.scope,
            "tier": format!("{:?}", identity.tier),
            "confidence": format!("{:?}", identity.confidence),
        }),
        None => Value::Null,
    })
}

#[derive(Deserialize)]
struct NotifyLaunchParams {
    app_name: String,
    #[serde(default)]
    project_name: Option<String>,
    #[serde(default)]
    project_dir: Option<String>,
    launcher_pid: i32,
    expected_class: String,
    #[serde(default)]
    workspace_num: Option<u8>,
    #[serde(default = "default_correlation_timeout")]
    correlation_timeout: f64,
}

fn default_correlation_timeout() -> f64 {
    2.0
}

pub async fn notify_launch(ctx: &HandlerContext, params: Option<Value>) -> Result<Value> {
    let params: NotifyLaunchParams = require_params(params)?;
    let launch = PendingLaunch {
        launch_id: Uuid::new_v4(),
        app_name: params.app_name,
        project_name: params.project_name,
        project_dir: params.project_dir,
        launcher_pid: params.launcher_pid,
        expected_class: params.expected_class,
        workspace_num: params.workspace_num,
        timestamp: unix_timestamp(),
        matched: false,
        correlation_timeout: params.correlation_timeout,
    };
    ctx.daemon.launch_registry.register(launch.clone()).await;
    Ok(json!({"launch_id": launch.launch_id}))
}

pub async fn get_launch_stats(ctx: &HandlerContext) -> Result<Value> {
    ctx.daemon.launch_registry.sweep_expired(unix_timestamp()).await;
    Ok(json!({"pending": ctx.daemon.launch_registry.len().await}))
}

pub async fn get_pending_launches(ctx: &HandlerContext) -> Result<Value> {
    Ok(json!(ctx.daemon.launch_registry.all().await))
}

pub async fn get_window_rules(ctx: &HandlerContext) -> Result<Value> {
    Ok(json!(*ctx.daemon.applications.read().await))
}

pub async fn reload_window_rules(ctx: &HandlerContext) -> Result<Value> {
    let dirs = &ctx.daemon.dirs;
    let merged =
        i3pm_core::config::rules::load_merged_applications(&dirs.applications_file, &dirs.config.join("applications.d"))
            .map_err(DaemonError::Core)?;
    let count = merged.len();
    *ctx.daemon.applications.write().await = merged;
    Ok(json!({"reloaded": count}))
}

pub async fn get_workspace_config(ctx: &HandlerContext) -> Result<Value> {
    let path = ctx.daemon.dirs.config.join("workspace-config.json");
    Ok(read_json_or_empty_array(&path))
}

pub async fn get_monitor_config(ctx: &HandlerContext) -> Result<Value> {
    Ok(json!(ctx.daemon.state.list_outputs().await))
}

fn read_json_or_empty_array(path: &std::path::Path) -> Value {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|content| serde_json::from_str(&content).ok())
        .unwrap_or_else(|| json!([]))
}

#[derive(Deserialize)]
struct BadgeCreateParams {
    window_id: i64,
    source: String,
    state: BadgeState,
    #[serde(default)]
    needs_attention: bool,
}

pub async fn badges_create(ctx: &HandlerContext, params: Option<Value>) -> Result<Value> {
    let params: BadgeCreateParams = require_params(params)?;
    let badge = ctx
        .daemon
        .badges
        .create_or_update(params.window_id, &params.source, params.state, unix_timestamp(), params.needs_attention)
        .await;
    ctx.daemon.broadcast(&i3pm_types::CoreEvent::BadgeUpdated { window_id: params.window_id, badge: badge.clone() }).await;
    Ok(json!(badge))
}

#[derive(Deserialize)]
struct BadgeClearParams {
    window_id: i64,
    #[serde(default = "default_min_age")]
    min_age_seconds: f64,
}

fn default_min_age() -> f64 {
    0.0
}

pub async fn badges_clear(ctx: &HandlerContext, params: Option<Value>) -> Result<Value> {
    let params: BadgeClearParams = require_params(params)?;
    let cleared = ctx.daemon.badges.clear(params.window_id, params.min_age_seconds, unix_timestamp()).await;
    Ok(json!({"cleared": cleared}))
}

pub async fn badges_snapshot(ctx: &HandlerContext) -> Result<Value> {
    let badges = ctx.daemon.badges.all().await;
    let snapshot: serde_json::Map<String, Value> = badges
        .into_iter()
        .map(|badge| {
            let entry = json!({
                "count": badge.display_count(),
                "timestamp": badge.timestamp,
                "source": badge.source,
                "state": badge.state,
            });
            (badge.window_id.to_string(), entry)
        })
        .collect();
    Ok(Value::Object(snapshot))
}

pub async fn validate_environment_coverage(ctx: &HandlerContext) -> Result<Value> {
    let windows = ctx.daemon.state.list_windows().await;
    let total = windows.len();
    let covered = windows.iter().filter(|w| w.pid.is_some_and(|pid| matcher::environment::find_i3pm_environ_in_ancestry(pid).is_some())).count();

    #[allow(clippy::cast_precision_loss)]
    let coverage_ratio = if total == 0 { 1.0 } else { covered as f64 / total as f64 };

    Ok(json!({
        "total_windows": total,
        "covered_windows": covered,
        "coverage_ratio": coverage_ratio,
    }))
}
