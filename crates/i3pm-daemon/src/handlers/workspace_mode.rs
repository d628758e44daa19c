//! Workspace-mode modal keyboard state machine handlers.

use i3pm_types::{CoreEvent, InputType, ModeType, WorkspaceSwitch};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{require_params, HandlerContext};
use crate::error::{DaemonError, Result};
use crate::server::unix_timestamp;

#[derive(Deserialize)]
struct DigitParams {
    digit: char,
    #[serde(default)]
    mode: Option<ModeType>,
}

/// Appends a keystroke to the active mode, entering `params.mode`
/// (defaulting to [`ModeType::Goto`]) first if no mode is currently active.
/// This lets a single compositor keybinding both open the mode and feed it
/// its first digit in one round trip.
pub async fn digit(ctx: &HandlerContext, params: Option<Value>) -> Result<Value> {
    let params: DigitParams = require_params(params)?;
    if !ctx.daemon.workspace_mode.state().await.active {
        ctx.daemon
            .workspace_mode
            .enter(params.mode.unwrap_or(ModeType::Goto), None, unix_timestamp())
            .await;
    }
    if params.digit == ':' {
        ctx.daemon.workspace_mode.input_colon().await.map_err(DaemonError::Core)?;
    } else if params.digit.is_ascii_digit() {
        ctx.daemon.workspace_mode.input_digit(params.digit).await.map_err(DaemonError::Core)?;
    } else {
        ctx.daemon.workspace_mode.input_char(params.digit).await.map_err(DaemonError::Core)?;
    }
    Ok(json!(ctx.daemon.workspace_mode.state().await))
}

pub async fn execute(ctx: &HandlerContext) -> Result<Value> {
    let result = ctx.daemon.workspace_mode.execute().await.map_err(DaemonError::Core)?;

    if result.input_type == InputType::Project {
        return Ok(json!({
            "executed": true,
            "effect": "project_mode_filter",
            "filter": result.accumulated,
        }));
    }

    let Ok(workspace_num) = result.accumulated.parse::<u8>() else {
        return Ok(json!({"executed": false, "reason": "no numeric workspace accumulated"}));
    };

    let command = match result.mode_type {
        ModeType::Move => format!("move container to workspace number {workspace_num}; workspace number {workspace_num}"),
        _ => format!("workspace number {workspace_num}"),
    };

    ctx.daemon.compositor.run_command(&command).await.map_err(DaemonError::Compositor)?;

    let output_name = result.output_cache.clone().unwrap_or_default();
    let switch = WorkspaceSwitch {
        workspace_num,
        output_name: output_name.clone(),
        timestamp: unix_timestamp(),
        mode_type: result.mode_type,
    };
    ctx.daemon.workspace_mode.record_switch(switch).await;

    ctx.daemon
        .broadcast(&CoreEvent::WorkspaceMode {
            event_type: "executed".to_string(),
            mode_type: result.mode_type,
            direction: None,
        })
        .await;

    Ok(json!({"executed": true, "workspace_num": workspace_num}))
}

pub async fn cancel(ctx: &HandlerContext) -> Result<Value> {
    ctx.daemon.workspace_mode.cancel().await;
    Ok(json!({"cancelled": true}))
}

pub async fn state(ctx: &HandlerContext) -> Result<Value> {
    Ok(json!(ctx.daemon.workspace_mode.state().await))
}

#[derive(Deserialize)]
struct HistoryParams {
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    20
}

pub async fn history(ctx: &HandlerContext, params: Option<Value>) -> Result<Value> {
    let limit = params.map(require_params::<HistoryParams>).transpose()?.map_or(20, |p| p.limit);
    Ok(json!(ctx.daemon.workspace_mode.history(limit).await))
}
