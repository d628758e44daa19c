//! Tier 0 matching: an in-memory registry of launches the daemon itself
//! initiated (via `i3pm run`), correlated to the window that appears next.
//!
//! This is the highest-confidence tier because the daemon already knows
//! exactly which app, project, and workspace a launch was meant for — no
//! guessing from window properties is needed, just a join on pid/class
//! within a short time window.

use std::collections::HashMap;

use i3pm_types::PendingLaunch;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::environment::pid_chain_contains;
use super::heuristic::{time_delta_bucket, Confidence};

#[derive(Debug, Default)]
pub struct LaunchRegistry {
    pending: RwLock<HashMap<Uuid, PendingLaunch>>,
}

impl LaunchRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, launch: PendingLaunch) {
        self.pending.write().await.insert(launch.launch_id, launch);
    }

    /// Removes launches older than [`PendingLaunch::MAX_AGE_SECS`].
    pub async fn sweep_expired(&self, now: f64) {
        self.pending.write().await.retain(|_, launch| !launch.is_expired(now));
    }

    /// Finds the best unmatched pending launch for a newly-appeared window,
    /// scored with the same formula Tier 2 uses for heuristic matches: an
    /// exact `expected_class` match is mandatory, then a time-delta bucket
    /// plus a workspace bonus (window landed on the launch's expected
    /// workspace) and a pid-chain bonus (the window's process descends from
    /// the launcher) refine the confidence. Ties are broken by most recent
    /// registration.
    pub async fn find_match(
        &self,
        class: &str,
        pid: Option<i32>,
        window_workspace_num: Option<u8>,
        now: f64,
    ) -> Option<(PendingLaunch, Confidence)> {
        let pending = self.pending.read().await;
        pending
            .values()
            .filter(|launch| !launch.matched && !launch.is_expired(now))
            .filter(|launch| launch.expected_class.eq_ignore_ascii_case(class))
            .map(|launch| (launch.clone(), Self::score(launch, pid, window_workspace_num, now)))
            .max_by(|(a_launch, a_conf), (b_launch, b_conf)| {
                a_conf.cmp(b_conf).then_with(|| a_launch.timestamp.partial_cmp(&b_launch.timestamp).unwrap())
            })
    }

    fn score(launch: &PendingLaunch, pid: Option<i32>, window_workspace_num: Option<u8>, now: f64) -> Confidence {
        let mut score = time_delta_bucket(now - launch.timestamp);
        if let (Some(expected), Some(actual)) = (launch.workspace_num, window_workspace_num) {
            if expected == actual {
                score += 0.2;
            }
        }
        if let Some(pid) = pid {
            if pid_chain_contains(pid, launch.launcher_pid) {
                score += 0.2;
            }
        }
        Confidence::from_score(score)
    }

    /// Marks a launch as matched so it's not joined to a second window.
    pub async fn mark_matched(&self, launch_id: Uuid) {
        if let Some(launch) = self.pending.write().await.get_mut(&launch_id) {
            launch.matched = true;
        }
    }

    /// Snapshots every currently-pending (unmatched, unexpired) launch, for
    /// introspection (`get_pending_launches`).
    pub async fn all(&self) -> Vec<PendingLaunch> {
        self.pending.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.pending.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn launch(class: &str, timestamp: f64) -> PendingLaunch {
        PendingLaunch {
            launch_id: Uuid::new_v4(),
            app_name: "vscode".into(),
            project_name: Some("nixos".into()),
            project_dir: Some("/home/user/nixos".into()),
            launcher_pid: 1234,
            expected_class: class.into(),
            workspace_num: Some(3),
            timestamp,
            matched: false,
            correlation_timeout: 2.0,
        }
    }

    #[tokio::test]
    async fn find_match_requires_same_class() {
        let registry = LaunchRegistry::new();
        registry.register(launch("Code", 100.0)).await;

        assert!(registry.find_match("firefox", None, None, 100.5).await.is_none());
        assert!(registry.find_match("Code", None, None, 100.5).await.is_some());
    }

    #[tokio::test]
    async fn find_match_ignores_expired_launches() {
        let registry = LaunchRegistry::new();
        registry.register(launch("Code", 100.0)).await;

        assert!(registry.find_match("Code", None, None, 106.0).await.is_none());
    }

    #[tokio::test]
    async fn mark_matched_excludes_from_further_matches() {
        let registry = LaunchRegistry::new();
        let l = launch("Code", 100.0);
        let id = l.launch_id;
        registry.register(l).await;

        registry.mark_matched(id).await;
        assert!(registry.find_match("Code", None, None, 100.5).await.is_none());
    }

    #[tokio::test]
    async fn sweep_expired_removes_stale_entries() {
        let registry = LaunchRegistry::new();
        registry.register(launch("Code", 100.0)).await;
        registry.sweep_expired(200.0).await;
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn find_match_prefers_most_recent_on_tie() {
        let registry = LaunchRegistry::new();
        registry.register(launch("Code", 100.0)).await;
        registry.register(launch("Code", 100.5)).await;

        let (found, _) = registry.find_match("Code", None, None, 100.6).await.unwrap();
        assert!((found.timestamp - 100.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn find_match_awards_workspace_bonus_over_unconfirmed_workspace() {
        let registry = LaunchRegistry::new();
        registry.register(launch("Code", 100.0)).await;

        let (_, exact_workspace) = registry.find_match("Code", None, Some(3), 100.1).await.unwrap();
        let (_, wrong_workspace) = registry.find_match("Code", None, Some(9), 100.1).await.unwrap();
        assert!(exact_workspace > wrong_workspace);
    }

    #[tokio::test]
    async fn find_match_awards_pid_chain_bonus() {
        let registry = LaunchRegistry::new();
        let mut l = launch("Code", 100.0);
        l.launcher_pid = std::process::id() as i32;
        registry.register(l).await;

        let pid = std::process::id() as i32;
        let (_, with_chain) = registry.find_match("Code", Some(pid), None, 100.1).await.unwrap();
        let (_, without_chain) = registry.find_match("Code", Some(999_999), None, 100.1).await.unwrap();
        assert!(with_chain > without_chain);
    }
}
