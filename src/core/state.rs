//! State descriptors.
//!
//! A state is a named position in the machine, declared once at
//! configuration-build time and immutable thereafter.

use super::Metadata;
use serde::Serialize;
use std::fmt;

/// Descriptor for a single named state.
///
/// States carry optional metadata, `initial`/`final` flags, and an optional
/// allow-list of transition names usable while the entity occupies them.
/// An empty allow-list means unrestricted.
///
/// # Example
///
/// ```rust
/// use statecraft::State;
///
/// let state = State::new("pending_review")
///     .mark_final()
///     .allow_transitions(["approve", "reject"]);
///
/// assert!(state.permits("approve"));
/// assert!(!state.permits("publish"));
/// assert!(state.is_final());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct State {
    name: String,
    metadata: Metadata,
    is_initial: bool,
    is_final: bool,
    allowed_transitions: Vec<String>,
}

impl State {
    /// Create a plain state descriptor.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metadata: Metadata::new(),
            is_initial: false,
            is_final: false,
            allowed_transitions: Vec::new(),
        }
    }

    /// Merge metadata entries into the descriptor.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata.extend(metadata);
        self
    }

    /// Flag this state as the machine's entry point.
    pub fn mark_initial(mut self) -> Self {
        self.is_initial = true;
        self
    }

    /// Flag this state as terminal.
    pub fn mark_final(mut self) -> Self {
        self.is_final = true;
        self
    }

    /// Restrict which transitions may run while the entity is in this state.
    pub fn allow_transitions<I, S>(mut self, transitions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_transitions = transitions.into_iter().map(Into::into).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Look up a single metadata value.
    pub fn metadata_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }

    pub fn is_initial(&self) -> bool {
        self.is_initial
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    pub fn allowed_transitions(&self) -> &[String] {
        &self.allowed_transitions
    }

    /// Whether the named transition may run from this state.
    ///
    /// An empty allow-list places no restriction.
    pub fn permits(&self, transition: &str) -> bool {
        self.allowed_transitions.is_empty()
            || self.allowed_transitions.iter().any(|t| t == transition)
    }

    /// Name comparison, accepting either a descriptor or a raw name.
    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    pub(crate) fn set_initial(&mut self, initial: bool) {
        self.is_initial = initial;
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
