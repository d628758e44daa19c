//! Tiered window-identity resolution.
//!
//! A newly-appeared window is identified in three tiers, tried in order,
//! stopping at the first that succeeds:
//!
//! 1. **Launch registry** — the daemon itself spawned this app moments ago
//!    ([`launch_registry`]); pid/class join, no guessing.
//! 2. **Environment** — the window's process (or an ancestor, up to
//!    [`environment::MAX_PARENT_TRAVERSAL`] hops up) carries `I3PM_*`
//!    variables placed there by the launcher at spawn time.
//! 3. **Heuristic** — class/instance/title scored against the configured
//!    application list ([`heuristic`]); accepted only at `Medium` confidence
//!    or above.

pub mod environment;
pub mod heuristic;
pub mod launch_registry;

use i3pm_types::{Application, Scope};

pub use heuristic::Confidence;
pub use launch_registry::LaunchRegistry;

/// The resolved identity of a window: which application it is, which
/// project it belongs to (if scoped), and which tier made the call.
#[derive(Debug, Clone)]
pub struct ResolvedIdentity {
    pub app_name: String,
    pub project_name: Option<String>,
    pub scope: Scope,
    pub tier: MatchTier,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    LaunchRegistry,
    Environment,
    Heuristic,
}

/// Tier 1: resolves identity from `I3PM_*` environment variables found on
/// the window's process or one of its ancestors.
#[must_use]
pub fn resolve_from_environment(pid: i32) -> Option<ResolvedIdentity> {
    let (environ, _depth) = environment::find_i3pm_environ_in_ancestry(pid)?;
    let app_name = environ.get("I3PM_APP_NAME")?.clone();
    let project_name = environ.get("I3PM_PROJECT_NAME").cloned();
    let scope = match environ.get("I3PM_SCOPE").map(String::as_str) {
        Some("global") => Scope::Global,
        _ => Scope::Scoped,
    };

    Some(ResolvedIdentity {
        app_name,
        project_name,
        scope,
        tier: MatchTier::Environment,
        confidence: Confidence::Exact,
    })
}

/// Tier 2: resolves identity by scoring the window against every known
/// application, returning the best match if it clears the acceptance bar.
#[must_use]
pub fn resolve_from_heuristic(
    window_class: &str,
    applications: &[Application],
    active_workspace_num: u8,
    time_delta_secs: f64,
    parent_pid_chain_matched: bool,
) -> Option<ResolvedIdentity> {
    applications
        .iter()
        .filter_map(|app| {
            let on_preferred = app.preferred_workspace == active_workspace_num;
            let score = heuristic::score_candidate(
                window_class,
                app,
                time_delta_secs,
                on_preferred,
                parent_pid_chain_matched,
            )?;
            Some((app, score))
        })
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
        .and_then(|(app, score)| {
            let confidence = Confidence::from_score(score);
            confidence.is_acceptable().then(|| ResolvedIdentity {
                app_name: app.name.clone(),
                project_name: None,
                scope: app.scope,
                tier: MatchTier::Heuristic,
                confidence,
            })
        })
}

/// Tier 0: resolves identity from a matching entry in the launch registry,
/// marking it matched so it isn't joined to a second window. Confidence is
/// scored from the same time-delta/workspace/pid-chain signals Tier 2 uses,
/// not assumed exact just because the daemon itself initiated the launch.
pub async fn resolve_from_launch_registry(
    registry: &LaunchRegistry,
    window_class: &str,
    pid: Option<i32>,
    active_workspace_num: u8,
    now: f64,
) -> Option<ResolvedIdentity> {
    let (launch, confidence) = registry.find_match(window_class, pid, Some(active_workspace_num), now).await?;
    registry.mark_matched(launch.launch_id).await;
    let scope = if launch.project_name.is_some() { Scope::Scoped } else { Scope::Global };
    Some(ResolvedIdentity {
        app_name: launch.app_name,
        project_name: launch.project_name,
        scope,
        tier: MatchTier::LaunchRegistry,
        confidence,
    })
}

/// Runs all three tiers in order, stopping at the first that resolves an
/// identity. Used by the `classify_window` RPC method and the window-new
/// compositor event handler alike.
pub async fn classify_window(
    registry: &LaunchRegistry,
    applications: &[Application],
    pid: Option<i32>,
    window_class: &str,
    active_workspace_num: u8,
    now: f64,
) -> Option<ResolvedIdentity> {
    if let Some(identity) = resolve_from_launch_registry(registry, window_class, pid, active_workspace_num, now).await
    {
        return Some(identity);
    }
    if let Some(pid) = pid {
        if let Some(identity) = resolve_from_environment(pid) {
            return Some(identity);
        }
    }
    resolve_from_heuristic(window_class, applications, active_workspace_num, 0.0, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use i3pm_types::Scope;

    fn app(name: &str, class: &str, workspace: u8) -> Application {
        Application {
            name: name.into(),
            display_name: name.into(),
            command: name.into(),
            parameters: vec![],
            expected_class: class.into(),
            scope: Scope::Scoped,
            preferred_workspace: workspace,
            preferred_monitor_role: None,
            icon: None,
            terminal: false,
            ulid: None,
        }
    }

    #[test]
    fn heuristic_resolves_best_scoring_application() {
        let apps = vec![app("vscode", "Code", 2)];
        let resolved = resolve_from_heuristic("Code", &apps, 2, 0.5, true).unwrap();
        assert_eq!(resolved.app_name, "vscode");
        assert_eq!(resolved.tier, MatchTier::Heuristic);
        assert_eq!(resolved.confidence, Confidence::Exact);
    }

    #[test]
    fn heuristic_rejects_below_medium_confidence() {
        let apps = vec![app("vscode", "Code", 2)];
        // Wrong workspace, stale time delta, no pid chain: class-only score (0.6) is Low.
        assert!(resolve_from_heuristic("Code", &apps, 9, 10.0, false).is_none());
    }

    #[tokio::test]
    async fn classify_window_prefers_launch_registry_over_heuristic() {
        let registry = LaunchRegistry::new();
        registry
            .register(i3pm_types::PendingLaunch {
                launch_id: uuid::Uuid::new_v4(),
                app_name: "vscode".into(),
                project_name: Some("nixos".into()),
                project_dir: None,
                launcher_pid: 1,
                expected_class: "Code".into(),
                workspace_num: None,
                timestamp: 0.0,
                matched: false,
                correlation_timeout: 2.0,
            })
            .await;

        let apps = vec![app("other", "Code", 9)];
        let identity = classify_window(&registry, &apps, None, "Code", 9, 0.1).await.unwrap();
        assert_eq!(identity.tier, MatchTier::LaunchRegistry);
        assert_eq!(identity.project_name.as_deref(), Some("nixos"));
    }

    #[tokio::test]
    async fn launch_registry_confidence_reflects_real_signals_not_a_hardcoded_exact() {
        let registry = LaunchRegistry::new();
        registry
            .register(i3pm_types::PendingLaunch {
                launch_id: uuid::Uuid::new_v4(),
                app_name: "vscode".into(),
                project_name: Some("nixos".into()),
                project_dir: None,
                launcher_pid: 1,
                expected_class: "Code".into(),
                workspace_num: Some(3),
                timestamp: 0.0,
                matched: false,
                correlation_timeout: 2.0,
            })
            .await;

        // Arrives 10s later on the wrong workspace with no pid-chain proof: class-only
        // score (0.6) is Low, well short of the Exact tier a hardcoded value would give.
        let identity = resolve_from_launch_registry(&registry, "Code", None, 9, 10.0).await.unwrap();
        assert_eq!(identity.confidence, Confidence::Low);
    }

    #[tokio::test]
    async fn classify_window_falls_back_to_heuristic_when_nothing_else_matches() {
        let registry = LaunchRegistry::new();
        let apps = vec![app("vscode", "Code", 2)];
        let identity = classify_window(&registry, &apps, None, "Code", 2, 0.0).await.unwrap();
        assert_eq!(identity.tier, MatchTier::Heuristic);
    }

    #[test]
    fn heuristic_returns_none_when_no_class_matches() {
        let apps = vec![app("vscode", "Code", 2)];
        assert!(resolve_from_heuristic("firefox", &apps, 2, 0.5, true).is_none());
    }
}
