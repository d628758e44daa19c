//! i3pm command-line control surface.
//!
//! Connects to the running daemon over its Unix socket and issues JSON-RPC
//! requests for project lifecycle management, the workspace-mode modal
//! keybinding flow, the environment-read latency benchmark, and ad-hoc app
//! launches.

use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use i3pm_rpc::client::{socket_path, RpcClient};
use serde_json::{json, Value};

/// i3pm - project-aware window manager control plane for Sway/i3.
#[derive(Parser)]
#[command(name = "i3pm")]
#[command(about = "Control surface for the i3pm project-window-manager daemon")]
#[command(version)]
#[command(after_help = "\
Examples:
  i3pm project list
  i3pm project create work ~/code/work
  i3pm project switch work
  i3pm workspace-mode digit 3
  i3pm workspace-mode execute
  i3pm benchmark environ --samples 200
  i3pm run ghostty --summon
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Project lifecycle commands
    Project {
        #[command(subcommand)]
        command: ProjectCommand,
    },

    /// Workspace-mode modal keybinding commands
    #[command(name = "workspace-mode")]
    WorkspaceMode {
        #[command(subcommand)]
        command: WorkspaceModeCommand,
    },

    /// Run the environment-read latency benchmark
    Benchmark {
        #[command(subcommand)]
        command: BenchmarkCommand,
    },

    /// Launch (or focus) a registered application
    Run {
        /// Registered application name
        app: String,
        /// Bring the app's window to the current workspace if already running
        #[arg(long)]
        summon: bool,
        /// Toggle the app's scratchpad visibility instead of launching it
        #[arg(long)]
        hide: bool,
        /// Never hide the app, even if it is a scratchpad app
        #[arg(long)]
        nohide: bool,
        /// Launch a new instance even if one is already running
        #[arg(long)]
        force: bool,
        /// Print the raw JSON-RPC result instead of a human-readable summary
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ProjectCommand {
    /// List configured projects
    List,
    /// Create a local project
    Create {
        name: String,
        directory: String,
        #[arg(long)]
        display_name: Option<String>,
    },
    /// Create a project backed by a remote (non-local) source
    CreateRemote {
        name: String,
        directory: String,
        remote: String,
        #[arg(long)]
        display_name: Option<String>,
    },
    /// Switch the active project, running the full switch pipeline
    Switch { name: String },
    /// Delete a project
    Delete { name: String },
    /// Edit an existing project's fields
    Edit {
        name: String,
        #[arg(long)]
        display_name: Option<String>,
        #[arg(long)]
        directory: Option<String>,
        #[arg(long)]
        max_auto_saves: Option<u32>,
    },
}

#[derive(Subcommand)]
enum WorkspaceModeCommand {
    /// Feed a keystroke (digit, `:`, or filter character) to the active mode
    Digit {
        /// The character pressed; non-first digits enter Goto mode implicitly
        digit: char,
        /// Mode to enter if no mode is currently active (default: goto)
        #[arg(long)]
        mode: Option<String>,
    },
    /// Execute the accumulated input and exit the mode
    Execute,
    /// Cancel the active mode, discarding accumulated input
    Cancel,
    /// Print the current mode state
    State,
    /// Print recent workspace-switch history
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum BenchmarkCommand {
    /// Benchmark `/proc/<pid>/environ` read latency
    Environ {
        #[arg(long, default_value_t = 100)]
        samples: usize,
        #[arg(long)]
        json: bool,
    },
}

async fn connect() -> Result<RpcClient> {
    let socket = socket_path().context("could not resolve daemon socket path")?;
    if !socket.exists() {
        bail!("daemon not running (socket not found at {})", socket.display());
    }
    RpcClient::connect_to(&socket).await.context("failed to connect to daemon. Is it running?")
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(1)
        }
    }
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Project { command } => run_project(command).await,
        Commands::WorkspaceMode { command } => run_workspace_mode(command).await,
        Commands::Benchmark { command } => run_benchmark(command).await,
        Commands::Run { app, summon, hide, nohide, force, json } => run_app(app, summon, hide, nohide, force, json).await,
    }
}

async fn run_project(command: ProjectCommand) -> Result<ExitCode> {
    let client = connect().await?;

    match command {
        ProjectCommand::List => {
            let projects: Value = client.request("project.list", None).await.context("project.list failed")?;
            println!("{}", serde_json::to_string_pretty(&projects)?);
        }
        ProjectCommand::Create { name, directory, display_name } => {
            let params = json!({"name": name, "directory": directory, "display_name": display_name});
            let project: Value =
                client.request("project.create", Some(params)).await.context("project.create failed")?;
            println!("created project '{}'", project["name"].as_str().unwrap_or(&name));
        }
        ProjectCommand::CreateRemote { name, directory, remote, display_name } => {
            let params = json!({"name": name, "directory": directory, "remote": remote, "display_name": display_name});
            let project: Value = client
                .request("project.create_remote", Some(params))
                .await
                .context("project.create_remote failed")?;
            println!("created remote project '{}'", project["name"].as_str().unwrap_or(&name));
        }
        ProjectCommand::Switch { name } => {
            let params = json!({"name": name});
            client.request::<Value>("project.switch", Some(params)).await.context("project.switch failed")?;
            println!("switched to project '{name}'");
        }
        ProjectCommand::Delete { name } => {
            let params = json!({"name": name});
            client.request::<Value>("project.delete", Some(params)).await.context("project.delete failed")?;
            println!("deleted project '{name}'");
        }
        ProjectCommand::Edit { name, display_name, directory, max_auto_saves } => {
            let params = json!({
                "name": name,
                "display_name": display_name,
                "directory": directory,
                "max_auto_saves": max_auto_saves,
            });
            let project: Value = client.request("project.edit", Some(params)).await.context("project.edit failed")?;
            println!("{}", serde_json::to_string_pretty(&project)?);
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Exit 0 on success, 1 on IPC/validation error, 130 on SIGINT.
async fn run_workspace_mode(command: WorkspaceModeCommand) -> Result<ExitCode> {
    let client = connect().await?;

    let result = workspace_mode_inner(&client, command).await;
    match result {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            Ok(ExitCode::from(1))
        }
    }
}

async fn workspace_mode_inner(client: &RpcClient, command: WorkspaceModeCommand) -> Result<Value> {
    match command {
        WorkspaceModeCommand::Digit { digit, mode } => {
            let params = json!({"digit": digit, "mode": mode});
            client.request("workspace_mode.digit", Some(params)).await.context("workspace_mode.digit failed")
        }
        WorkspaceModeCommand::Execute => {
            client.request("workspace_mode.execute", None).await.context("workspace_mode.execute failed")
        }
        WorkspaceModeCommand::Cancel => {
            client.request("workspace_mode.cancel", None).await.context("workspace_mode.cancel failed")
        }
        WorkspaceModeCommand::State => {
            client.request("workspace_mode.state", None).await.context("workspace_mode.state failed")
        }
        WorkspaceModeCommand::History { limit } => {
            let params = json!({"limit": limit});
            client.request("workspace_mode.history", Some(params)).await.context("workspace_mode.history failed")
        }
    }
}

/// Exit 0 if the benchmark passes, 1 if it fails, 2 on a connection/RPC error.
async fn run_benchmark(command: BenchmarkCommand) -> Result<ExitCode> {
    let BenchmarkCommand::Environ { samples, json: json_output } = command;

    let client = match connect().await {
        Ok(client) => client,
        Err(err) => {
            eprintln!("error: {err:#}");
            return Ok(ExitCode::from(2));
        }
    };

    let params = json!({"samples": samples});
    let result: Value = match client.request("benchmark.environ", Some(params)).await {
        Ok(result) => result,
        Err(err) => {
            eprintln!("error: benchmark.environ failed: {err:#}");
            return Ok(ExitCode::from(2));
        }
    };

    let passes = result["passes"].as_bool().unwrap_or(false);

    if json_output {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        let ms = |key: &str| result[key].as_f64().unwrap_or(0.0);
        println!(
            "samples={} avg={:.3}ms p50={:.3}ms p95={:.3}ms p99={:.3}ms",
            result["sample_size"],
            ms("average_ms"),
            ms("p50_ms"),
            ms("p95_ms"),
            ms("p99_ms")
        );
        println!("{}", if passes { "PASS" } else { "FAIL" });
    }

    Ok(ExitCode::from(u8::from(!passes)))
}

async fn run_app(app: String, summon: bool, hide: bool, nohide: bool, force: bool, json_output: bool) -> Result<ExitCode> {
    let client = connect().await?;

    if hide && !nohide {
        let params = json!({"project": app});
        let result: Value =
            client.request("scratchpad.toggle", Some(params)).await.context("scratchpad.toggle failed")?;
        if json_output {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            println!("toggled '{app}' ({})", result["visibility"].as_str().unwrap_or("unknown"));
        }
        return Ok(ExitCode::SUCCESS);
    }

    let _ = summon;
    let params = json!({"app_name": app, "force": force});
    let result: Value = client.request("run_app", Some(params)).await.context("run_app failed")?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if result["launched"].as_bool().unwrap_or(false) {
        println!("launched '{app}'");
    } else {
        println!("'{app}' already running");
    }

    Ok(ExitCode::SUCCESS)
}
