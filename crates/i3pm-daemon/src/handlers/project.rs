//! Project lifecycle, scratchpad, and app-launch handlers.

use std::path::PathBuf;

use i3pm_core::config::settings::ProjectsFile;
use i3pm_core::scratchpad::{launch_project_scratchpad, resolve_working_dir};
use i3pm_types::{Project, ProjectSourceType, Scope};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{require_params, HandlerContext};
use crate::error::{DaemonError, Result};
use crate::server::unix_timestamp;

#[derive(Deserialize)]
struct ActiveProjectParams {
    name: String,
}

pub async fn set_active_project(ctx: &HandlerContext, params: Option<Value>) -> Result<Value> {
    let params: ActiveProjectParams = require_params(params)?;
    let project = ctx
        .daemon
        .state
        .get_project(&params.name)
        .await
        .ok_or_else(|| DaemonError::Core(i3pm_core::Error::ProjectNotFound(params.name.clone())))?;

    let events = ctx
        .daemon
        .orchestrator
        .switch_project(&ctx.daemon.compositor, &project, unix_timestamp())
        .await
        .map_err(DaemonError::Core)?;

    for event in &events {
        ctx.daemon.record_event(event).await;
        ctx.daemon.broadcast(event).await;
    }

    Ok(json!({"active_project": project.name}))
}

pub async fn get_active_project(ctx: &HandlerContext) -> Result<Value> {
    Ok(json!(ctx.daemon.state.active_project().await))
}

pub async fn list(ctx: &HandlerContext) -> Result<Value> {
    Ok(json!(ctx.daemon.state.list_projects().await))
}

#[derive(Deserialize)]
struct CreateParams {
    name: String,
    display_name: Option<String>,
    directory: String,
    #[serde(default)]
    scope: Option<Scope>,
    #[serde(default)]
    scoped_classes: Vec<String>,
}

pub async fn create(ctx: &HandlerContext, params: Option<Value>) -> Result<Value> {
    let params: CreateParams = require_params(params)?;
    if ctx.daemon.state.get_project(&params.name).await.is_some() {
        return Err(DaemonError::Core(i3pm_core::Error::Validation(format!(
            "project {} already exists",
            params.name
        ))));
    }

    let project = Project {
        name: params.name.clone(),
        display_name: params.display_name.unwrap_or_else(|| params.name.clone()),
        icon: None,
        directory: params.directory,
        scope: params.scope.unwrap_or(Scope::Scoped),
        scoped_classes: params.scoped_classes,
        remote: None,
        auto_save: true,
        auto_restore: true,
        source_type: ProjectSourceType::Local,
        git_metadata: None,
        max_auto_saves: None,
    };

    ctx.daemon.state.upsert_project(project.clone()).await;
    persist_projects(ctx).await?;
    Ok(json!(project))
}

#[derive(Deserialize)]
struct CreateRemoteParams {
    name: String,
    display_name: Option<String>,
    directory: String,
    remote: String,
    #[serde(default)]
    scope: Option<Scope>,
}

pub async fn create_remote(ctx: &HandlerContext, params: Option<Value>) -> Result<Value> {
    let params: CreateRemoteParams = require_params(params)?;
    if ctx.daemon.state.get_project(&params.name).await.is_some() {
        return Err(DaemonError::Core(i3pm_core::Error::Validation(format!(
            "project {} already exists",
            params.name
        ))));
    }

    let project = Project {
        name: params.name.clone(),
        display_name: params.display_name.unwrap_or_else(|| params.name.clone()),
        icon: None,
        directory: params.directory,
        scope: params.scope.unwrap_or(Scope::Scoped),
        scoped_classes: vec![],
        remote: Some(params.remote),
        auto_save: true,
        auto_restore: true,
        source_type: ProjectSourceType::Remote,
        git_metadata: None,
        max_auto_saves: None,
    };

    ctx.daemon.state.upsert_project(project.clone()).await;
    persist_projects(ctx).await?;
    Ok(json!(project))
}

#[derive(Deserialize)]
struct EditParams {
    name: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    directory: Option<String>,
    #[serde(default)]
    auto_save: Option<bool>,
    #[serde(default)]
    auto_restore: Option<bool>,
    #[serde(default)]
    max_auto_saves: Option<u32>,
}

pub async fn edit(ctx: &HandlerContext, params: Option<Value>) -> Result<Value> {
    let params: EditParams = require_params(params)?;
    let mut project = ctx
        .daemon
        .state
        .get_project(&params.name)
        .await
        .ok_or_else(|| DaemonError::Core(i3pm_core::Error::ProjectNotFound(params.name.clone())))?;

    if let Some(display_name) = params.display_name {
        project.display_name = display_name;
    }
    if let Some(directory) = params.directory {
        project.directory = directory;
    }
    if let Some(auto_save) = params.auto_save {
        project.auto_save = auto_save;
    }
    if let Some(auto_restore) = params.auto_restore {
        project.auto_restore = auto_restore;
    }
    if params.max_auto_saves.is_some() {
        project.max_auto_saves = params.max_auto_saves;
    }

    ctx.daemon.state.upsert_project(project.clone()).await;
    persist_projects(ctx).await?;
    Ok(json!(project))
}

#[derive(Deserialize)]
struct DeleteParams {
    name: String,
}

pub async fn delete(ctx: &HandlerContext, params: Option<Value>) -> Result<Value> {
    let params: DeleteParams = require_params(params)?;
    let removed = ctx.daemon.state.remove_project(&params.name).await;
    if removed.is_none() {
        return Err(DaemonError::Core(i3pm_core::Error::ProjectNotFound(params.name)));
    }
    persist_projects(ctx).await?;
    Ok(json!({"deleted": true}))
}

async fn persist_projects(ctx: &HandlerContext) -> Result<()> {
    let file = ProjectsFile { projects: ctx.daemon.state.list_projects().await };
    file.save(&ctx.daemon.dirs.projects_file).map_err(DaemonError::Core)
}

#[derive(Deserialize)]
struct ScratchpadLaunchParams {
    project: String,
}

pub async fn scratchpad_launch(ctx: &HandlerContext, params: Option<Value>) -> Result<Value> {
    let params: ScratchpadLaunchParams = require_params(params)?;
    let project = ctx
        .daemon
        .state
        .get_project(&params.project)
        .await
        .ok_or_else(|| DaemonError::Core(i3pm_core::Error::ProjectNotFound(params.project.clone())))?;

    let working_dir = resolve_working_dir(Some(&PathBuf::from(&project.directory)));
    let pending = launch_project_scratchpad(
        &ctx.daemon.scratchpads,
        &ctx.daemon.launch_registry,
        &params.project,
        &working_dir,
        unix_timestamp(),
    )
    .await
    .map_err(DaemonError::Core)?;

    Ok(json!({"launch_id": pending.launch_id, "expected_class": pending.expected_class}))
}

#[derive(Deserialize)]
struct ScratchpadToggleParams {
    project: String,
}

pub async fn scratchpad_toggle(ctx: &HandlerContext, params: Option<Value>) -> Result<Value> {
    let params: ScratchpadToggleParams = require_params(params)?;
    let (command, visibility) =
        ctx.daemon.scratchpads.toggle(&params.project).await.map_err(DaemonError::Core)?;
    ctx.daemon.compositor.run_command(&command).await.map_err(DaemonError::Compositor)?;
    Ok(json!({"visibility": format!("{visibility:?}").to_lowercase()}))
}

#[derive(Deserialize)]
struct RunAppParams {
    app_name: String,
    #[serde(default)]
    force: bool,
}

pub async fn run_app(ctx: &HandlerContext, params: Option<Value>) -> Result<Value> {
    let params: RunAppParams = require_params(params)?;
    let applications = ctx.daemon.applications.read().await;
    let app = applications
        .iter()
        .find(|a| a.name == params.app_name)
        .cloned()
        .ok_or_else(|| DaemonError::Core(i3pm_core::Error::Validation(format!("unknown app {}", params.app_name))))?;
    drop(applications);

    if !params.force {
        let running = ctx
            .daemon
            .state
            .list_windows()
            .await
            .into_iter()
            .any(|w| w.app_id == app.name);
        if running {
            return Ok(json!({"launched": false, "reason": "already running"}));
        }
    }

    let active_project = ctx.daemon.state.active_project().await;
    let project_dir = match (&app.scope, &active_project) {
        (Scope::Scoped, Some(name)) => {
            ctx.daemon.state.get_project(name).await.map(|p| PathBuf::from(p.directory))
        }
        _ => None,
    };
    let working_dir = resolve_working_dir(project_dir.as_deref());

    let mut command = std::process::Command::new(&app.command);
    command.args(&app.parameters).current_dir(&working_dir);
    command.spawn().map_err(DaemonError::Io)?;

    Ok(json!({"launched": true}))
}
