//! Request handlers for the daemon, organized by category matching the
//! RPC method surface: status/window introspection, project control,
//! launch correlation, window-rule classification, workspace mode, layout,
//! and badges.

mod benchmark;
mod layout;
mod project;
mod window;
mod workspace_mode;

use std::sync::Arc;

use serde_json::Value;

use crate::error::{DaemonError, Result};
use crate::server::DaemonState;
use crate::session::SessionId;

pub struct HandlerContext {
    pub daemon: Arc<DaemonState>,
    #[allow(dead_code, reason = "kept for handlers that will scope responses per-session")]
    pub session_id: SessionId,
}

/// Dispatches one RPC method call to its handler.
///
/// # Errors
///
/// Returns [`DaemonError::MethodNotFound`] for an unrecognized method, or
/// whatever error the handler itself produces (invalid params, a core
/// domain error, a compositor IPC failure).
pub async fn handle(ctx: &HandlerContext, method: &str, params: Option<Value>) -> Result<Value> {
    match method {
        "get_status" => window::get_status(ctx).await,
        "get_windows" => window::get_windows(ctx).await,
        "get_events" => window::get_events(ctx, params).await,
        "get_marks" => window::get_marks(ctx).await,
        "classify_window" => window::classify_window(ctx, params).await,
        "notify_launch" => window::notify_launch(ctx, params).await,
        "get_launch_stats" => window::get_launch_stats(ctx).await,
        "get_pending_launches" => window::get_pending_launches(ctx).await,
        "get_window_rules" => window::get_window_rules(ctx).await,
        "reload_window_rules" => window::reload_window_rules(ctx).await,
        "get_workspace_config" => window::get_workspace_config(ctx).await,
        "get_monitor_config" => window::get_monitor_config(ctx).await,
        "validate_environment_coverage" => window::validate_environment_coverage(ctx).await,

        "set_active_project" => project::set_active_project(ctx, params).await,
        "get_active_project" => project::get_active_project(ctx).await,
        "project.list" => project::list(ctx).await,
        "project.create" => project::create(ctx, params).await,
        "project.create_remote" => project::create_remote(ctx, params).await,
        "project.switch" => project::set_active_project(ctx, params).await,
        "project.delete" => project::delete(ctx, params).await,
        "project.edit" => project::edit(ctx, params).await,

        "scratchpad.launch" => project::scratchpad_launch(ctx, params).await,
        "scratchpad.toggle" => project::scratchpad_toggle(ctx, params).await,
        "run_app" => project::run_app(ctx, params).await,

        "workspace_mode.digit" => workspace_mode::digit(ctx, params).await,
        "workspace_mode.execute" => workspace_mode::execute(ctx).await,
        "workspace_mode.cancel" => workspace_mode::cancel(ctx).await,
        "workspace_mode.state" => workspace_mode::state(ctx).await,
        "workspace_mode.history" => workspace_mode::history(ctx, params).await,

        "layout.save" => layout::save(ctx, params).await,
        "layout.restore" => layout::restore(ctx, params).await,
        "layout.auto_save.trigger" => layout::auto_save_trigger(ctx, params).await,

        "badges.create" => window::badges_create(ctx, params).await,
        "badges.clear" => window::badges_clear(ctx, params).await,
        "badges.snapshot" => window::badges_snapshot(ctx).await,

        "benchmark.environ" => benchmark::environ(ctx, params).await,

        other => Err(DaemonError::MethodNotFound(other.to_string())),
    }
}

/// Deserializes a request's `params` into `T`, or a missing-params error if
/// the method requires them and none were sent.
pub(crate) fn require_params<T: serde::de::DeserializeOwned>(params: Option<Value>) -> Result<T> {
    let value = params.ok_or_else(|| DaemonError::InvalidParams("missing params".to_string()))?;
    serde_json::from_value(value).map_err(|err| DaemonError::InvalidParams(err.to_string()))
}
