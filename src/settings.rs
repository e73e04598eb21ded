//! Process-wide engine settings.
//!
//! These are the defaults a [`Registry`](crate::registry::Registry) is
//! composed with. Per-configuration overrides (history tracking) and
//! per-call arguments (authorization mode) take precedence over them.

use crate::auth::AuthorizationMode;
use serde::{Deserialize, Serialize};

/// Engine defaults, deserializable from host configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Authorization mode used when a check does not name one explicitly.
    pub default_authorization: AuthorizationMode,
    /// Durable history defaults.
    pub history: HistoryTracking,
}

/// Durable history-tracking defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryTracking {
    /// Whether transitions are recorded to the history repository unless a
    /// configuration overrides it.
    pub enabled: bool,
    /// Retention window for pruning. `None` keeps history indefinitely and
    /// makes pruning a no-op.
    pub retention_days: Option<u32>,
}
