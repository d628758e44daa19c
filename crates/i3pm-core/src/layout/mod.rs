//! Window layout capture and restore: snapshotting which apps occupy which
//! workspaces for a project, and relaunching them later.

pub mod auto_restore;
pub mod auto_save;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutWindowEntry {
    pub app_name: String,
    pub workspace_num: u8,
    pub is_floating: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutSnapshot {
    pub project: String,
    pub layout_name: String,
    pub created_at: f64,
    pub windows: Vec<LayoutWindowEntry>,
}

impl LayoutSnapshot {
    #[must_use]
    pub fn workspace_count(&self) -> usize {
        self.windows
            .iter()
            .map(|w| w.workspace_num)
            .collect::<std::collections::HashSet<_>>()
            .len()
    }

    #[must_use]
    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    /// Loads a snapshot from a layout JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Saves this snapshot to a layout JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_count_deduplicates() {
        let snapshot = LayoutSnapshot {
            project: "nixos".into(),
            layout_name: "default".into(),
            created_at: 0.0,
            windows: vec![
                LayoutWindowEntry { app_name: "vscode".into(), workspace_num: 1, is_floating: false },
                LayoutWindowEntry { app_name: "terminal".into(), workspace_num: 1, is_floating: false },
                LayoutWindowEntry { app_name: "firefox".into(), workspace_num: 2, is_floating: false },
            ],
        };
        assert_eq!(snapshot.workspace_count(), 2);
        assert_eq!(snapshot.window_count(), 3);
    }

    #[test]
    fn save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("default.json");
        let snapshot = LayoutSnapshot {
            project: "nixos".into(),
            layout_name: "default".into(),
            created_at: 123.0,
            windows: vec![],
        };
        snapshot.save(&path).unwrap();
        let loaded = LayoutSnapshot::load(&path).unwrap();
        assert_eq!(loaded.project, "nixos");
    }
}
