//! Statecraft: an embeddable finite-state-machine engine.
//!
//! Statecraft governs the lifecycle of a named state property on an
//! arbitrary entity (an order, an article). Hosts declare states,
//! transitions, guards, lifecycle hooks, and authorization requirements;
//! every state change then runs through a single controlled pipeline that
//! enforces validity, authorization, hook ordering, and optional audit
//! history.
//!
//! # Core Concepts
//!
//! - **StateConfig**: the declared state graph for one entity type and
//!   property, frozen after building
//! - **StateHolder**: the accessor capability an entity implements once
//! - **StateManager**: the transition engine bound to one entity instance
//! - **Registry**: owns configurations and produces bound managers
//! - **Hooks**: ordered callbacks around transitions and state changes
//! - **Authorization**: pluggable strategies gating protected transitions
//!
//! # Example
//!
//! ```rust
//! use statecraft::{Context, Registry, StateConfig, StateHolder, Transition};
//!
//! struct Order {
//!     id: u64,
//!     status: Option<String>,
//! }
//!
//! impl StateHolder for Order {
//!     fn entity_type(&self) -> &str {
//!         "order"
//!     }
//!
//!     fn entity_id(&self) -> String {
//!         self.id.to_string()
//!     }
//!
//!     fn get_state(&self, property: &str) -> Option<String> {
//!         match property {
//!             "status" => self.status.clone(),
//!             _ => None,
//!         }
//!     }
//!
//!     fn set_state(&mut self, property: &str, value: &str) {
//!         if property == "status" {
//!             self.status = Some(value.to_string());
//!         }
//!     }
//! }
//!
//! fn main() -> statecraft::Result<()> {
//!     let mut registry = Registry::new();
//!     registry.register_state_config("order", || {
//!         let mut config = StateConfig::new("pending");
//!         config.add_states(["pending", "processing", "shipped"])?;
//!         config.set_transition(
//!             "process",
//!             Transition::new().from("pending").to("processing"),
//!         )?;
//!         config.set_transition(
//!             "ship",
//!             Transition::new().from("processing").to("shipped"),
//!         )?;
//!         Ok(config)
//!     });
//!     registry.register_state_management("order", "status", "order")?;
//!
//!     let mut order = Order {
//!         id: 1,
//!         status: None,
//!     };
//!
//!     // A fresh entity boots through the synthetic init transition.
//!     let mut manager = registry.manager_for(&mut order, "status")?;
//!     assert_eq!(manager.state(), "pending");
//!
//!     manager.transition("process", &Context::new())?;
//!     assert_eq!(manager.state(), "processing");
//!     assert_eq!(manager.available_transitions(), ["ship"]);
//!
//!     drop(manager);
//!     assert_eq!(order.status.as_deref(), Some("processing"));
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod core;
pub mod entity;
pub mod error;
pub mod history;
pub mod hooks;
pub mod manager;
pub mod registry;
pub mod settings;

// Re-export the surface most hosts touch.
pub use auth::{Actor, AuthorizationMode, Authorizer, Policy};
pub use config::{HistoryPolicy, StateConfig, INIT, INSTANTIATED};
pub use core::{Context, Metadata, State, Transition, TransitionSource};
pub use entity::StateHolder;
pub use error::{BoxError, Error, Result};
pub use history::{HistoryRepository, InMemoryHistory, NewTransitionRecord, TransitionRecord};
pub use hooks::{HandlerRegistry, HandlerResolver, Hook, HookCategory, HookHandler, HookKey};
pub use manager::{ClientInfo, ManagerSummary, StateChange, StateManager};
pub use registry::Registry;
pub use settings::{EngineSettings, HistoryTracking};
