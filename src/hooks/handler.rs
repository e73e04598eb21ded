//! Handler resolution for name-addressed hooks.
//!
//! Hooks authored as a type name (or a type name plus method) are resolved
//! to live instances through a [`HandlerResolver`] capability at execution
//! time. [`HandlerRegistry`] is the bundled resolver; hosts with their own
//! dependency-injection layer implement the trait over it.

use crate::core::Context;
use crate::entity::StateHolder;
use crate::error::BoxError;
use std::collections::HashMap;
use std::sync::Arc;

/// Error from dispatching a named method on a resolved handler.
#[derive(Debug)]
pub enum HandlerCallError {
    /// The handler does not expose the requested method. Treated as a
    /// configuration error and always fatal.
    UnknownMethod,
    /// The handler ran and failed. Subject to the hook's error policy.
    Failed(BoxError),
}

/// A hook handler instance resolved by name.
///
/// `handle` is the canonical entry point. Handlers that expose additional
/// named methods override [`call`](Self::call) to route them.
pub trait HookHandler: Send + Sync {
    fn handle(&self, entity: &mut dyn StateHolder, context: &Context) -> Result<(), BoxError>;

    /// Invoke a method by name. The default implementation only knows
    /// `handle`.
    fn call(
        &self,
        method: &str,
        entity: &mut dyn StateHolder,
        context: &Context,
    ) -> Result<(), HandlerCallError> {
        match method {
            "handle" => self.handle(entity, context).map_err(HandlerCallError::Failed),
            _ => Err(HandlerCallError::UnknownMethod),
        }
    }
}

/// Capability that maps handler type names to instances.
pub trait HandlerResolver: Send + Sync {
    fn resolve(&self, type_name: &str) -> Option<Arc<dyn HookHandler>>;
}

/// Plain map-backed resolver.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn HookHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler instance under a type name.
    pub fn register(&mut self, type_name: impl Into<String>, handler: Arc<dyn HookHandler>) {
        self.handlers.insert(type_name.into(), handler);
    }
}

impl HandlerResolver for HandlerRegistry {
    fn resolve(&self, type_name: &str) -> Option<Arc<dyn HookHandler>> {
        self.handlers.get(type_name).cloned()
    }
}
