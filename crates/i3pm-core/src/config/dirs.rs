//! XDG directory and socket path resolution.

use std::path::PathBuf;

use directories::ProjectDirs;

/// Application directories following the XDG base directory spec.
#[derive(Debug, Clone)]
pub struct Directories {
    /// Config directory (`~/.config/i3-project-daemon`).
    pub config: PathBuf,
    /// Data directory (`~/.local/share/i3-project-daemon`), home of layouts and state files.
    pub data: PathBuf,
    /// Projects config file.
    pub projects_file: PathBuf,
    /// Applications (launch rules) config file.
    pub applications_file: PathBuf,
    /// Directory holding saved window layouts, one subdirectory per project.
    pub layouts_dir: PathBuf,
    /// Focus-tracking state file.
    pub project_focus_state_file: PathBuf,
    /// Workspace-focus-tracking state file.
    pub workspace_focus_state_file: PathBuf,
}

impl Directories {
    /// Builds standard XDG paths for the daemon.
    ///
    /// # Panics
    ///
    /// Panics if the system's project directories cannot be determined.
    #[must_use]
    pub fn new() -> Self {
        let project = ProjectDirs::from("", "", "i3-project-daemon")
            .expect("failed to determine project directories");
        Self::with_base_dirs(
            project.config_dir().to_path_buf(),
            project.data_dir().to_path_buf(),
        )
    }

    #[must_use]
    pub fn with_base(base: PathBuf) -> Self {
        Self::with_base_dirs(base.clone(), base)
    }

    fn with_base_dirs(config: PathBuf, data: PathBuf) -> Self {
        Self {
            projects_file: config.join("projects.json"),
            applications_file: config.join("applications.json"),
            layouts_dir: data.join("layouts"),
            project_focus_state_file: data.join("project-focus-state.json"),
            workspace_focus_state_file: data.join("workspace-focus-state.json"),
            config,
            data,
        }
    }

    /// Ensures all directories exist, creating them if necessary.
    ///
    /// # Errors
    ///
    /// Returns an error if any directory cannot be created.
    pub fn ensure_exists(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.config)?;
        std::fs::create_dir_all(&self.data)?;
        std::fs::create_dir_all(&self.layouts_dir)?;
        Ok(())
    }

    /// Directory holding one project's saved layouts.
    #[must_use]
    pub fn project_layouts_dir(&self, project: &str) -> PathBuf {
        self.layouts_dir.join(project)
    }
}

impl Default for Directories {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves the daemon's Unix socket path.
///
/// Prefers `${XDG_RUNTIME_DIR}/i3-project-daemon.sock`, falling back to
/// `${HOME}/.local/state/i3-project-daemon.sock` when `XDG_RUNTIME_DIR`
/// isn't set. This mirrors `i3pm_rpc::client::socket_path` exactly; the two
/// must never diverge since the daemon binds the path the client resolves.
///
/// # Errors
///
/// Returns an error if neither `XDG_RUNTIME_DIR` nor `HOME` is set.
pub fn socket_path() -> std::io::Result<PathBuf> {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        if !runtime_dir.is_empty() {
            return Ok(PathBuf::from(runtime_dir).join("i3-project-daemon.sock"));
        }
    }
    if let Ok(home) = std::env::var("HOME") {
        if !home.is_empty() {
            return Ok(PathBuf::from(home)
                .join(".local/state")
                .join("i3-project-daemon.sock"));
        }
    }
    Err(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        "neither XDG_RUNTIME_DIR nor HOME is set",
    ))
}
