//! On-disk project and application configuration.

use std::path::Path;

use i3pm_types::{Application, Project};
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectsFile {
    #[serde(default)]
    pub projects: Vec<Project>,
}

impl ProjectsFile {
    /// Loads the project list from disk, or an empty list if the file doesn't exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Saves the project list to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.name == name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationsFile {
    #[serde(default)]
    pub applications: Vec<Application>,
}

impl ApplicationsFile {
    /// Loads the application list from disk, or an empty list if the file doesn't exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Saves the application list to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Application> {
        self.applications.iter().find(|a| a.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use i3pm_types::{ProjectSourceType, Scope};

    fn sample_project(name: &str) -> Project {
        Project {
            name: name.to_string(),
            display_name: name.to_string(),
            icon: None,
            directory: format!("/home/user/{name}"),
            scope: Scope::Scoped,
            scoped_classes: vec![],
            remote: None,
            auto_save: true,
            auto_restore: true,
            source_type: ProjectSourceType::Local,
            git_metadata: None,
            max_auto_saves: None,
        }
    }

    #[test]
    fn load_missing_file_returns_empty_default() {
        let path = Path::new("/nonexistent/projects.json");
        let file = ProjectsFile::load(path).unwrap();
        assert!(file.projects.is_empty());
    }

    #[test]
    fn save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("projects.json");

        let mut file = ProjectsFile::default();
        file.projects.push(sample_project("nixos"));
        file.save(&path).unwrap();

        let loaded = ProjectsFile::load(&path).unwrap();
        assert_eq!(loaded.projects.len(), 1);
        assert_eq!(loaded.find("nixos").unwrap().directory, "/home/user/nixos");
    }

    #[test]
    fn find_returns_none_for_unknown_project() {
        let file = ProjectsFile::default();
        assert!(file.find("ghost").is_none());
    }
}
