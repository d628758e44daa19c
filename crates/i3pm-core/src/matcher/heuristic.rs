//! Tier 2 matching: heuristic scoring from window class/instance/title when
//! neither the launch registry (Tier 0) nor `/proc` environment (Tier 1)
//! produced a match, plus Progressive Web App detection.

use i3pm_types::{Application, PwaType};

/// Firefox's PWA implementation (`FFPWA`/`firefoxpwa`) runs each installed
/// site as its own profile with a window class of `FFPWA-<ULID>`.
const FIREFOX_PWA_CLASS_PREFIX: &str = "FFPWA-";

/// Chrome/Chromium "Install as app" windows keep the plain `Google-chrome`
/// window class but give every installed app its own, non-empty instance
/// (the browser itself always reports an empty instance on its class).
const CHROME_PWA_CLASS: &str = "Google-chrome";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwaMatch {
    pub pwa_type: PwaType,
}

/// Detects whether a window's class/instance identifies it as an installed
/// PWA, and if so which browser engine hosts it.
#[must_use]
pub fn detect_pwa(class: Option<&str>, instance: Option<&str>) -> Option<PwaMatch> {
    if let Some(class) = class {
        if class.starts_with(FIREFOX_PWA_CLASS_PREFIX) {
            return Some(PwaMatch { pwa_type: PwaType::Firefox });
        }
        if class == CHROME_PWA_CLASS {
            if let Some(instance) = instance {
                if !instance.is_empty() {
                    return Some(PwaMatch { pwa_type: PwaType::Chrome });
                }
            }
        }
    }
    None
}

/// Extracts the Firefox PWA's ULID from its window class, if present.
#[must_use]
pub fn firefox_pwa_id(class: &str) -> Option<&str> {
    class.strip_prefix(FIREFOX_PWA_CLASS_PREFIX)
}

/// Confidence tier from Open Question #4: exact class match required to
/// consider an application at all, then time-delta and context boost the
/// confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Confidence {
    None,
    Low,
    Medium,
    High,
    Exact,
}

impl Confidence {
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 1.4 {
            Confidence::Exact
        } else if score >= 1.0 {
            Confidence::High
        } else if score >= 0.8 {
            Confidence::Medium
        } else if score >= 0.6 {
            Confidence::Low
        } else {
            Confidence::None
        }
    }

    /// The daemon accepts a Tier 2 match only at Medium confidence or above.
    #[must_use]
    pub fn is_acceptable(self) -> bool {
        self >= Confidence::Medium
    }
}

/// Scores how well a newly-seen window matches a candidate application,
/// given how long ago (seconds) the application was expected to appear and
/// whether the window landed on the application's preferred workspace.
///
/// Returns `None` if the window's class doesn't match at all (a class match
/// is mandatory; nothing else can compensate for it).
#[must_use]
pub fn score_candidate(
    window_class: &str,
    application: &Application,
    time_delta_secs: f64,
    on_preferred_workspace: bool,
    parent_pid_chain_matched: bool,
) -> Option<f64> {
    if !window_class.eq_ignore_ascii_case(&application.expected_class) {
        return None;
    }

    let mut score = time_delta_bucket(time_delta_secs);
    if on_preferred_workspace {
        score += 0.2;
    }
    if parent_pid_chain_matched {
        score += 0.2;
    }
    Some(score)
}

pub(crate) fn time_delta_bucket(delta_secs: f64) -> f64 {
    let delta = delta_secs.abs();
    if delta <= 1.0 {
        1.0
    } else if delta <= 2.0 {
        0.8
    } else {
        0.6
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use i3pm_types::Scope;

    fn app() -> Application {
        Application {
            name: "vscode".into(),
            display_name: "VS Code".into(),
            command: "code".into(),
            parameters: vec![],
            expected_class: "Code".into(),
            scope: Scope::Scoped,
            preferred_workspace: 2,
            preferred_monitor_role: None,
            icon: None,
            terminal: false,
            ulid: None,
        }
    }

    #[test]
    fn detect_pwa_recognizes_firefox_prefix() {
        let m = detect_pwa(Some("FFPWA-01ABCXYZ"), None).unwrap();
        assert_eq!(m.pwa_type, PwaType::Firefox);
    }

    #[test]
    fn detect_pwa_recognizes_chrome_class_with_nonempty_instance() {
        let m = detect_pwa(Some("Google-chrome"), Some("crx_abcdefg")).unwrap();
        assert_eq!(m.pwa_type, PwaType::Chrome);
    }

    #[test]
    fn detect_pwa_rejects_chrome_class_with_empty_instance() {
        assert!(detect_pwa(Some("Google-chrome"), Some("")).is_none());
        assert!(detect_pwa(Some("Google-chrome"), None).is_none());
    }

    #[test]
    fn detect_pwa_none_for_ordinary_browser_window() {
        assert!(detect_pwa(Some("firefox"), Some("Navigator")).is_none());
    }

    #[test]
    fn firefox_pwa_id_strips_prefix() {
        assert_eq!(firefox_pwa_id("FFPWA-01ABCXYZ"), Some("01ABCXYZ"));
        assert_eq!(firefox_pwa_id("firefox"), None);
    }

    #[test]
    fn score_candidate_requires_class_match() {
        assert!(score_candidate("firefox", &app(), 0.5, true, true).is_none());
    }

    #[test]
    fn score_candidate_is_case_insensitive_on_class() {
        assert!(score_candidate("code", &app(), 0.5, false, false).is_some());
    }

    #[test]
    fn score_candidate_combines_all_boosts_to_exact() {
        let score = score_candidate("Code", &app(), 0.5, true, true).unwrap();
        assert!((score - 1.4).abs() < f64::EPSILON);
        assert_eq!(Confidence::from_score(score), Confidence::Exact);
    }

    #[test]
    fn score_candidate_class_only_match_is_low_or_none() {
        let score = score_candidate("Code", &app(), 10.0, false, false).unwrap();
        assert!((score - 0.6).abs() < f64::EPSILON);
        assert_eq!(Confidence::from_score(score), Confidence::Low);
    }

    #[test]
    fn confidence_medium_and_above_is_acceptable() {
        assert!(Confidence::Medium.is_acceptable());
        assert!(Confidence::High.is_acceptable());
        assert!(!Confidence::Low.is_acceptable());
        assert!(!Confidence::None.is_acceptable());
    }
}
