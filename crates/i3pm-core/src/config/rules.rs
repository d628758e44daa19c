//! Deterministic merging of fragment rule files into one application list.
//!
//! Beyond the single `applications.json`, the daemon accepts a
//! `applications.d/*.json` directory of fragments (e.g. per-host overrides).
//! Fragments are merged in filename-sorted order; an application name
//! defined in a later fragment replaces the earlier definition entirely
//! (fields are not deep-merged), keeping reload semantics predictable.

use std::path::Path;

use i3pm_types::Application;

use super::settings::ApplicationsFile;
use crate::error::Result;

/// Loads `base_file` and merges in every `*.json` fragment under `fragments_dir`
/// (if it exists), sorted by filename.
///
/// # Errors
///
/// Returns an error if any file exists but fails to parse.
pub fn load_merged_applications(base_file: &Path, fragments_dir: &Path) -> Result<Vec<Application>> {
    let mut by_name = std::collections::BTreeMap::new();

    for app in ApplicationsFile::load(base_file)?.applications {
        by_name.insert(app.name.clone(), app);
    }

    if fragments_dir.is_dir() {
        let mut paths: Vec<_> = std::fs::read_dir(fragments_dir)?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|p| p.extension().and_then(std::ffi::OsStr::to_str) == Some("json"))
            .collect();
        paths.sort();

        for path in paths {
            for app in ApplicationsFile::load(&path)?.applications {
                by_name.insert(app.name.clone(), app);
            }
        }
    }

    Ok(by_name.into_values().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use i3pm_types::Scope;

    fn app(name: &str, class: &str) -> Application {
        Application {
            name: name.to_string(),
            display_name: name.to_string(),
            command: name.to_string(),
            parameters: vec![],
            expected_class: class.to_string(),
            scope: Scope::Global,
            preferred_workspace: 1,
            preferred_monitor_role: None,
            icon: None,
            terminal: false,
            ulid: None,
        }
    }

    #[test]
    fn later_fragment_overrides_base_definition() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("applications.json");
        let fragments = dir.path().join("applications.d");
        std::fs::create_dir_all(&fragments).unwrap();

        ApplicationsFile {
            applications: vec![app("firefox", "firefox")],
        }
        .save(&base)
        .unwrap();

        ApplicationsFile {
            applications: vec![app("firefox", "Firefox-esr")],
        }
        .save(&fragments.join("10-overrides.json"))
        .unwrap();

        let merged = load_merged_applications(&base, &fragments).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].expected_class, "Firefox-esr");
    }

    #[test]
    fn missing_fragments_dir_uses_base_only() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("applications.json");
        ApplicationsFile {
            applications: vec![app("kitty", "kitty")],
        }
        .save(&base)
        .unwrap();

        let merged = load_merged_applications(&base, &dir.path().join("no-such-dir")).unwrap();
        assert_eq!(merged.len(), 1);
    }
}
