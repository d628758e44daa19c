//! Window badge state: working/stopped indicators surfaced by external
//! status-bar widgets. The daemon owns badge lifecycle; rendering is an
//! external collaborator's job.

use std::collections::HashMap;

use i3pm_types::{Badge, BadgeState, WindowId};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct BadgeStore {
    badges: RwLock<HashMap<WindowId, Badge>>,
}

impl BadgeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or updates a badge. The count increments only on a
    /// transition *into* `Stopped` — repeated `Stopped` updates, or any
    /// `Working` update, never bump the count. This mirrors how a
    /// notification badge should behave: it counts completed background
    /// tasks, not every status ping.
    pub async fn create_or_update(
        &self,
        window_id: WindowId,
        source: &str,
        state: BadgeState,
        timestamp: f64,
        needs_attention: bool,
    ) -> Badge {
        let mut badges = self.badges.write().await;
        let badge = badges.entry(window_id).or_insert_with(|| Badge {
            window_id,
            source: source.to_string(),
            state: BadgeState::Working,
            count: 0,
            timestamp,
            needs_attention: false,
        });

        let transitioned_to_stopped = badge.state == BadgeState::Working && state == BadgeState::Stopped;
        if transitioned_to_stopped {
            badge.count += 1;
        }

        badge.source = source.to_string();
        badge.state = state;
        badge.timestamp = timestamp;
        badge.needs_attention = needs_attention;
        badge.clone()
    }

    /// Clears a badge if it's at least `min_age_seconds` old (avoids
    /// clearing a badge the user hasn't had a chance to notice yet).
    pub async fn clear(&self, window_id: WindowId, min_age_seconds: f64, now: f64) -> bool {
        let mut badges = self.badges.write().await;
        let Some(badge) = badges.get(&window_id) else {
            return false;
        };
        if now - badge.timestamp < min_age_seconds {
            return false;
        }
        badges.remove(&window_id);
        true
    }

    pub async fn get(&self, window_id: WindowId) -> Option<Badge> {
        self.badges.read().await.get(&window_id).cloned()
    }

    pub async fn has_badge(&self, window_id: WindowId) -> bool {
        self.badges.read().await.contains_key(&window_id)
    }

    pub async fn all(&self) -> Vec<Badge> {
        self.badges.read().await.values().cloned().collect()
    }

    /// Removes badges for windows that no longer exist (the window closed
    /// without the badge ever being explicitly cleared).
    pub async fn cleanup_orphaned(&self, valid_window_ids: &[WindowId]) {
        let mut badges = self.badges.write().await;
        badges.retain(|id, _| valid_window_ids.contains(id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn count_increments_only_on_transition_to_stopped() {
        let store = BadgeStore::new();
        store.create_or_update(1, "build", BadgeState::Working, 0.0, false).await;
        store.create_or_update(1, "build", BadgeState::Working, 1.0, false).await;
        let badge = store.create_or_update(1, "build", BadgeState::Stopped, 2.0, false).await;
        assert_eq!(badge.count, 1);

        // Repeated "stopped" updates don't bump the count further.
        let badge = store.create_or_update(1, "build", BadgeState::Stopped, 3.0, false).await;
        assert_eq!(badge.count, 1);

        // Back to working then stopped again bumps it once more.
        store.create_or_update(1, "build", BadgeState::Working, 4.0, false).await;
        let badge = store.create_or_update(1, "build", BadgeState::Stopped, 5.0, false).await;
        assert_eq!(badge.count, 2);
    }

    #[tokio::test]
    async fn clear_respects_minimum_age() {
        let store = BadgeStore::new();
        store.create_or_update(1, "build", BadgeState::Stopped, 10.0, false).await;

        assert!(!store.clear(1, 5.0, 12.0).await);
        assert!(store.has_badge(1).await);

        assert!(store.clear(1, 5.0, 16.0).await);
        assert!(!store.has_badge(1).await);
    }

    #[tokio::test]
    async fn cleanup_orphaned_removes_badges_for_missing_windows() {
        let store = BadgeStore::new();
        store.create_or_update(1, "build", BadgeState::Working, 0.0, false).await;
        store.create_or_update(2, "build", BadgeState::Working, 0.0, false).await;

        store.cleanup_orphaned(&[1]).await;
        assert!(store.has_badge(1).await);
        assert!(!store.has_badge(2).await);
    }
}
