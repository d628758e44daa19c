//! A bounded, in-memory ring of recent event records for introspection
//! (e.g. `i3pm events tail`-style tooling). Deliberately not persisted:
//! the daemon is not an event log, just a short rolling window for
//! debugging the live system.

use std::collections::VecDeque;

use i3pm_types::EventRecord;
use tokio::sync::RwLock;

pub struct EventRing {
    capacity: usize,
    records: RwLock<VecDeque<EventRecord>>,
}

impl EventRing {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            records: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub async fn push(&self, record: EventRecord) {
        let mut records = self.records.write().await;
        if records.len() >= self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    /// Returns up to the last `limit` records in chronological (arrival)
    /// order, oldest first.
    pub async fn recent(&self, limit: usize) -> Vec<EventRecord> {
        let records = self.records.read().await;
        let skip = records.len().saturating_sub(limit);
        records.iter().skip(skip).cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use i3pm_types::EventCategory;

    fn record(event_type: &str, timestamp: f64) -> EventRecord {
        EventRecord {
            timestamp,
            event_type: event_type.to_string(),
            payload: serde_json::json!({}),
            enrichment: None,
            correlation_id: None,
            depth: 0,
            category: EventCategory::Window,
        }
    }

    #[tokio::test]
    async fn ring_drops_oldest_when_over_capacity() {
        let ring = EventRing::new(2);
        ring.push(record("a", 1.0)).await;
        ring.push(record("b", 2.0)).await;
        ring.push(record("c", 3.0)).await;

        assert_eq!(ring.len().await, 2);
        let recent = ring.recent(10).await;
        let types: Vec<_> = recent.iter().map(|r| r.event_type.as_str()).collect();
        assert_eq!(types, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn recent_respects_limit() {
        let ring = EventRing::new(10);
        for i in 0..5 {
            ring.push(record("e", f64::from(i))).await;
        }
        assert_eq!(ring.recent(2).await.len(), 2);
    }
}
