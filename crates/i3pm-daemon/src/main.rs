//! i3pm daemon entry point.
//!
//! This binary binds the daemon's Unix socket, maintains the in-memory
//! window/workspace/project state model, and serves JSON-RPC requests from
//! the CLI and other local clients.

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use i3pm_daemon::server;

/// i3pm daemon - project-aware window manager control plane for Sway/i3.
#[derive(Parser, Debug)]
#[command(name = "i3pm-daemon")]
#[command(version, about, long_about = None)]
struct Args {
    /// Custom socket path (defaults to `$XDG_RUNTIME_DIR/i3-project-daemon.sock`).
    #[arg(long, value_name = "PATH")]
    socket_path: Option<PathBuf>,
}

/// In debug builds, logs to both a rolling file and stderr at debug level;
/// in release builds, logs to stderr only at info level.
fn setup_logging() {
    let default_level = if cfg!(debug_assertions) { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("i3pm={default_level}")));

    if cfg!(debug_assertions) {
        let temp_dir = std::env::temp_dir();
        let file_appender = tracing_appender::rolling::daily(&temp_dir, "i3pm-daemon.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        std::mem::forget(guard);

        let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false).with_target(true).with_line_number(true);
        let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_ansi(true).with_target(true).with_line_number(true);

        tracing_subscriber::registry().with(file_layer).with(stderr_layer).with(filter).init();
        eprintln!("logging to {} (and stderr)", temp_dir.display());
    } else {
        tracing_subscriber::registry().with(fmt::layer()).with(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    setup_logging();

    info!("starting i3pm daemon");
    server::run(args.socket_path).await?;
    info!("i3pm daemon stopped");
    Ok(())
}
