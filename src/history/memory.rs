//! In-memory history repository.

use super::{HistoryRepository, NewTransitionRecord, TransitionRecord};
use crate::error::Result;
use chrono::{Duration, Utc};
use std::sync::Mutex;

/// Reference [`HistoryRepository`] backed by a `Vec`.
///
/// Suitable for tests and single-process hosts; durable back-ends
/// implement the trait over their own storage.
#[derive(Default)]
pub struct InMemoryHistory {
    inner: Mutex<Store>,
}

#[derive(Default)]
struct Store {
    records: Vec<TransitionRecord>,
    next_id: u64,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a repository from previously captured records, e.g. a
    /// serialized snapshot. Ids continue after the highest restored id.
    pub fn with_records(records: Vec<TransitionRecord>) -> Self {
        let next_id = records.iter().map(|r| r.id).max().unwrap_or(0);
        Self {
            inner: Mutex::new(Store { records, next_id }),
        }
    }

    fn store(&self) -> std::sync::MutexGuard<'_, Store> {
        // A poisoned lock only means a panic mid-append; the data itself
        // is still consistent.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl HistoryRepository for InMemoryHistory {
    fn record(&self, record: NewTransitionRecord) -> Result<TransitionRecord> {
        let mut store = self.store();
        store.next_id += 1;
        let now = Utc::now();
        let stored = TransitionRecord {
            id: store.next_id,
            entity_type: record.entity_type,
            entity_id: record.entity_id,
            property: record.property,
            transition: record.transition,
            from_state: record.from_state,
            to_state: record.to_state,
            context: record.context,
            actor_type: record.actor_type,
            actor_id: record.actor_id,
            metadata: record.metadata,
            ip_address: record.ip_address,
            user_agent: record.user_agent,
            created_at: now,
            updated_at: now,
        };
        store.records.push(stored.clone());
        Ok(stored)
    }

    fn for_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
        property: Option<&str>,
    ) -> Result<Vec<TransitionRecord>> {
        let store = self.store();
        let mut matching: Vec<TransitionRecord> = store
            .records
            .iter()
            .filter(|r| {
                r.entity_type == entity_type
                    && r.entity_id == entity_id
                    && property.is_none_or(|p| r.property == p)
            })
            .cloned()
            .collect();
        matching.reverse();
        Ok(matching)
    }

    fn last_transition(
        &self,
        entity_type: &str,
        entity_id: &str,
        property: &str,
    ) -> Result<Option<TransitionRecord>> {
        Ok(self
            .for_entity(entity_type, entity_id, Some(property))?
            .into_iter()
            .next())
    }

    fn count(&self, entity_type: &str, entity_id: &str, property: Option<&str>) -> Result<usize> {
        Ok(self.for_entity(entity_type, entity_id, property)?.len())
    }

    fn prune(&self, retention_days: u32) -> Result<usize> {
        let cutoff = Utc::now() - Duration::days(i64::from(retention_days));
        let mut store = self.store();
        let before = store.records.len();
        store.records.retain(|r| r.created_at >= cutoff);
        Ok(before - store.records.len())
    }
}
