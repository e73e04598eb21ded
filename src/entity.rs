//! Entity accessor capability.
//!
//! The engine never probes an entity for accessor methods at runtime.
//! Instead, hosts implement [`StateHolder`] once per entity type, mapping
//! the engine's property reads and writes onto whatever storage the entity
//! actually uses (a plain field, an attribute bag, an ORM column).

use std::any::Any;

/// Capability interface giving the engine access to an entity's state
/// properties and identity.
///
/// # Example
///
/// ```rust
/// use statecraft::StateHolder;
///
/// struct Order {
///     id: u64,
///     status: Option<String>,
/// }
///
/// impl StateHolder for Order {
///     fn entity_type(&self) -> &str {
///         "order"
///     }
///
///     fn entity_id(&self) -> String {
///         self.id.to_string()
///     }
///
///     fn get_state(&self, property: &str) -> Option<String> {
///         match property {
///             "status" => self.status.clone(),
///             _ => None,
///         }
///     }
///
///     fn set_state(&mut self, property: &str, value: &str) {
///         if property == "status" {
///             self.status = Some(value.to_string());
///         }
///     }
/// }
/// ```
pub trait StateHolder: Any {
    /// Stable type name used for registry bindings and audit records.
    fn entity_type(&self) -> &str;

    /// Stable identity used for manager caching and audit records.
    fn entity_id(&self) -> String;

    /// Read the current value of a state property.
    ///
    /// `None` (or an empty string) marks the entity as newly created,
    /// triggering the bootstrap transition on first access.
    fn get_state(&self, property: &str) -> Option<String>;

    /// Write a new value for a state property.
    fn set_state(&mut self, property: &str, value: &str);
}

impl dyn StateHolder {
    /// Downcast to a concrete entity type inside guards and hooks.
    pub fn downcast_ref<T: StateHolder>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref::<T>()
    }

    /// Mutable variant of [`downcast_ref`](Self::downcast_ref).
    pub fn downcast_mut<T: StateHolder>(&mut self) -> Option<&mut T> {
        (self as &mut dyn Any).downcast_mut::<T>()
    }
}
