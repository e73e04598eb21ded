//! Transition descriptors and guard predicates.

use super::{Context, Metadata};
use crate::entity::StateHolder;
use std::fmt;
use std::sync::Arc;

/// Pure predicate over (entity, context) gating a transition.
///
/// All guards on a transition must return `true` for it to be valid.
pub type GuardFn = Arc<dyn Fn(&dyn StateHolder, &Context) -> bool + Send + Sync>;

/// Which source states a transition may run from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransitionSource {
    /// Matches any current state, including terminal states.
    Any,
    /// Matches exactly one state.
    State(String),
    /// Matches any state in the set.
    States(Vec<String>),
}

impl TransitionSource {
    /// Whether the given state satisfies this source specifier.
    pub fn matches(&self, state: &str) -> bool {
        match self {
            TransitionSource::Any => true,
            TransitionSource::State(name) => name == state,
            TransitionSource::States(names) => names.iter().any(|n| n == state),
        }
    }
}

impl From<&str> for TransitionSource {
    fn from(value: &str) -> Self {
        if value == "*" {
            TransitionSource::Any
        } else {
            TransitionSource::State(value.to_string())
        }
    }
}

impl From<String> for TransitionSource {
    fn from(value: String) -> Self {
        TransitionSource::from(value.as_str())
    }
}

impl From<Vec<String>> for TransitionSource {
    fn from(value: Vec<String>) -> Self {
        TransitionSource::States(value)
    }
}

impl<const N: usize> From<[&str; N]> for TransitionSource {
    fn from(value: [&str; N]) -> Self {
        TransitionSource::States(value.iter().map(|s| s.to_string()).collect())
    }
}

/// A declared edge from one or more source states to exactly one target.
///
/// # Example
///
/// ```rust
/// use statecraft::Transition;
///
/// let cancel = Transition::new()
///     .from(["pending", "processing"])
///     .to("cancelled");
///
/// assert!(cancel.allows_from("pending"));
/// assert!(!cancel.allows_from("shipped"));
/// assert_eq!(cancel.target(), "cancelled");
///
/// let archive = Transition::new().from("*").to("archived");
/// assert!(archive.allows_from("anything"));
/// ```
pub struct Transition {
    from: TransitionSource,
    to: String,
    guards: Vec<GuardFn>,
    metadata: Metadata,
}

impl Transition {
    pub fn new() -> Self {
        Self {
            from: TransitionSource::States(Vec::new()),
            to: String::new(),
            guards: Vec::new(),
            metadata: Metadata::new(),
        }
    }

    /// Set the source specifier. `"*"` means any state.
    pub fn from(mut self, states: impl Into<TransitionSource>) -> Self {
        self.from = states.into();
        self
    }

    /// Set the target state.
    pub fn to(mut self, state: impl Into<String>) -> Self {
        self.to = state.into();
        self
    }

    /// Add a guard predicate. Guards run in declaration order and all must
    /// pass for the transition to be valid.
    pub fn guard<F>(mut self, guard: F) -> Self
    where
        F: Fn(&dyn StateHolder, &Context) -> bool + Send + Sync + 'static,
    {
        self.guards.push(Arc::new(guard));
        self
    }

    /// Merge metadata entries into the descriptor.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata.extend(metadata);
        self
    }

    pub fn source(&self) -> &TransitionSource {
        &self.from
    }

    pub fn target(&self) -> &str {
        &self.to
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn guard_count(&self) -> usize {
        self.guards.len()
    }

    /// Whether this transition may run from the given state.
    pub fn allows_from(&self, state: &str) -> bool {
        self.from.matches(state)
    }

    /// Evaluate every guard against the entity and context.
    pub fn passes_guards(&self, entity: &dyn StateHolder, context: &Context) -> bool {
        self.guards.iter().all(|guard| guard(entity, context))
    }
}

impl Default for Transition {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.from {
            TransitionSource::Any => write!(f, "* -> {}", self.to),
            TransitionSource::State(name) => write!(f, "{} -> {}", name, self.to),
            TransitionSource::States(names) => write!(f, "{} -> {}", names.join("|"), self.to),
        }
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("guards", &self.guards.len())
            .field("metadata", &self.metadata)
            .finish()
    }
}
