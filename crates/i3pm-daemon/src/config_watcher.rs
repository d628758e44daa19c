//! Configuration file watcher for hot-reload support: watches the config
//! directory for changes to `projects.json`/`applications.json` and the
//! `applications.d/` fragment directory, debouncing bursts of filesystem
//! events into a single reload signal.

use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use notify::Watcher;
use tokio::sync::mpsc as tokio_mpsc;
use tracing::{debug, error, info};

use crate::error::Result;

/// Spawns a background thread pair watching `config_dir` for changes and
/// forwarding a debounced reload signal onto `tx`.
pub fn spawn_config_watcher(config_dir: PathBuf, tx: tokio_mpsc::UnboundedSender<()>) {
    let (sync_tx, sync_rx) = mpsc::channel::<()>();

    std::thread::spawn(move || {
        if let Err(err) = watch_config_dir(&config_dir, &sync_tx) {
            error!("config watcher error: {err}");
        }
    });

    std::thread::spawn(move || loop {
        match sync_rx.recv() {
            Ok(()) => {
                debug!("config changed, sending reload notification");
                if tx.send(()).is_err() {
                    debug!("config reload receiver dropped, stopping watcher");
                    break;
                }
            }
            Err(_) => {
                debug!("config watcher channel closed");
                break;
            }
        }
    });
}

fn watch_config_dir(config_dir: &PathBuf, tx: &mpsc::Sender<()>) -> Result<()> {
    let debounce = Arc::new(StdMutex::new(std::time::Instant::now()));
    let debounce_duration = Duration::from_millis(500);

    let (watcher_tx, watcher_rx) = mpsc::channel();

    let mut watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| match result {
        Ok(event) => {
            if matches!(event.kind, notify::EventKind::Modify(_) | notify::EventKind::Create(_)) {
                let relevant = event.paths.iter().any(|p| {
                    p.extension().and_then(std::ffi::OsStr::to_str) == Some("json")
                });
                if relevant {
                    let mut last_event = debounce.lock().unwrap();
                    let now = std::time::Instant::now();
                    if now.duration_since(*last_event) > debounce_duration {
                        *last_event = now;
                        let _ = watcher_tx.send(());
                    }
                }
            }
        }
        Err(err) => error!("watcher error: {err}"),
    })?;

    watcher.watch(config_dir, notify::RecursiveMode::Recursive)?;
    info!("watching config directory: {config_dir:?}");

    while watcher_rx.recv().is_ok() {
        let _ = tx.send(());
    }

    Ok(())
}
