//! Core state graph types.
//!
//! This module contains the declarative model of a state machine:
//! - State descriptors with metadata, lifecycle flags, and allow-lists
//! - Transition descriptors with source specifiers and guard predicates
//!
//! Everything here is configuration data: descriptors are built once,
//! frozen inside a [`StateConfig`](crate::config::StateConfig), and read
//! by the transition engine.

mod state;
mod transition;

pub use state::State;
pub use transition::{GuardFn, Transition, TransitionSource};

/// Arbitrary key/value payload passed alongside a transition and captured
/// in audit records.
pub type Context = serde_json::Map<String, serde_json::Value>;

/// Opaque key/value map attached to states, transitions, and audit records.
pub type Metadata = serde_json::Map<String, serde_json::Value>;
