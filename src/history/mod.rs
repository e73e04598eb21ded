//! Durable transition history.
//!
//! The engine appends one record per executed transition through the
//! [`HistoryRepository`] collaborator. Storage is the host's concern; the
//! crate ships [`InMemoryHistory`](memory::InMemoryHistory) as the
//! reference implementation and for tests.

mod memory;

pub use memory::InMemoryHistory;

use crate::core::{Context, Metadata};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Durable audit record of one state change.
///
/// Append-only: records are never mutated and are deleted only by
/// retention pruning.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub id: u64,
    pub entity_type: String,
    pub entity_id: String,
    pub property: String,
    /// Name of the executed transition; `None` for directly-set states.
    pub transition: Option<String>,
    pub from_state: String,
    pub to_state: String,
    pub context: Context,
    pub actor_type: Option<String>,
    pub actor_id: Option<String>,
    pub metadata: Metadata,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for appending a record; the repository assigns id and
/// timestamps.
#[derive(Clone, Debug, Default)]
pub struct NewTransitionRecord {
    pub entity_type: String,
    pub entity_id: String,
    pub property: String,
    pub transition: Option<String>,
    pub from_state: String,
    pub to_state: String,
    pub context: Context,
    pub actor_type: Option<String>,
    pub actor_id: Option<String>,
    pub metadata: Metadata,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Append-only store of transition records.
pub trait HistoryRepository: Send + Sync {
    /// Append a record, returning it with id and timestamps assigned.
    fn record(&self, record: NewTransitionRecord) -> Result<TransitionRecord>;

    /// Records for an entity, newest first, optionally filtered by
    /// property.
    fn for_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
        property: Option<&str>,
    ) -> Result<Vec<TransitionRecord>>;

    /// The most recent record for an entity property.
    fn last_transition(
        &self,
        entity_type: &str,
        entity_id: &str,
        property: &str,
    ) -> Result<Option<TransitionRecord>>;

    /// Number of records for an entity, optionally filtered by property.
    fn count(&self, entity_type: &str, entity_id: &str, property: Option<&str>) -> Result<usize>;

    /// Delete records older than the retention window, returning the
    /// number deleted. Age is the only criterion.
    fn prune(&self, retention_days: u32) -> Result<usize>;
}
