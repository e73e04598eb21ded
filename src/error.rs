//! Error types for the state machine engine.
//!
//! Configuration errors (a frozen configuration being mutated, a malformed
//! hook, an unknown registry type) are programmer errors and always propagate.
//! Runtime transition errors (`UnknownTransition`, `InvalidTransition`,
//! `Unauthorized`) propagate to the caller and leave the engine's in-memory
//! view of the entity consistent.

use thiserror::Error;

/// Boxed error type carried by failing hook callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by configuration, registration, and transition execution.
#[derive(Debug, Error)]
pub enum Error {
    /// A mutator was called on a configuration after `finalize()`.
    #[error("cannot modify a finalized state configuration")]
    ConfigurationFrozen,

    /// The configuration itself is malformed (empty state name, reserved
    /// transition name, missing target, unavailable actor capability).
    #[error("invalid state configuration: {message}")]
    Configuration { message: String },

    /// The requested transition is not declared in the configuration.
    #[error("transition '{transition}' does not exist")]
    UnknownTransition { transition: String },

    /// The transition is declared but not valid from the current state,
    /// or one of its guards rejected it.
    #[error("cannot transition '{transition}' from state '{from}'")]
    InvalidTransition {
        transition: String,
        from: String,
        to: String,
    },

    /// The active authorization strategy denied the required ability.
    #[error("unauthorized to perform transition requiring ability '{ability}'")]
    Unauthorized {
        ability: String,
        actor: Option<String>,
    },

    /// A hook is malformed: unresolvable handler type, missing handler
    /// method, or a protect hook used as an executable callback.
    #[error("invalid hook: {message}")]
    InvalidHook { message: String },

    /// No state configuration is registered under the given type name.
    #[error("state config type '{config_type}' is not registered")]
    UnknownConfigType { config_type: String },

    /// No state management binding exists for the entity type and property.
    #[error("no state management registered for {entity_type}.{property}")]
    NotRegistered {
        entity_type: String,
        property: String,
    },

    /// A hook callback with `stop_on_error` raised during the pipeline.
    #[error("hook '{key}' failed: {cause}")]
    HookFailed { key: String, cause: BoxError },

    /// The history repository collaborator failed.
    #[error("history repository error: {message}")]
    History { message: String },
}

impl Error {
    /// HTTP-like severity code for surfacing errors at an API boundary.
    ///
    /// Authorization denials map to 403, lookup failures to 404, invalid
    /// transitions to 400, and configuration/internal errors to 500.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::InvalidTransition { .. } => 400,
            Error::Unauthorized { .. } => 403,
            Error::UnknownTransition { .. }
            | Error::UnknownConfigType { .. }
            | Error::NotRegistered { .. } => 404,
            _ => 500,
        }
    }

    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_hook(message: impl Into<String>) -> Self {
        Error::InvalidHook {
            message: message.into(),
        }
    }
}
