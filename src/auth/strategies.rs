//! Built-in authorization strategies.

use super::{Actor, GateCheck, Policy};
use crate::core::Context;
use crate::entity::StateHolder;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Pluggable permission-check contract.
pub trait AuthorizationStrategy: Send + Sync {
    fn check(
        &self,
        ability: &str,
        actor: Option<&dyn Actor>,
        entity: &dyn StateHolder,
        context: &Context,
    ) -> Result<bool>;
}

/// Always allows. Kept as an explicit strategy so an active mode can be
/// resolved uniformly, though the disabled mode never consults it.
pub struct DisabledStrategy;

impl AuthorizationStrategy for DisabledStrategy {
    fn check(
        &self,
        _ability: &str,
        _actor: Option<&dyn Actor>,
        _entity: &dyn StateHolder,
        _context: &Context,
    ) -> Result<bool> {
        Ok(true)
    }
}

/// Coarse-grained ability checks registered per ability name.
///
/// An absent actor or an undefined ability denies.
pub struct GateStrategy {
    checks: HashMap<String, GateCheck>,
}

impl GateStrategy {
    pub fn new() -> Self {
        Self {
            checks: HashMap::new(),
        }
    }

    pub fn define(&mut self, ability: impl Into<String>, check: GateCheck) {
        self.checks.insert(ability.into(), check);
    }
}

impl Default for GateStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthorizationStrategy for GateStrategy {
    fn check(
        &self,
        ability: &str,
        actor: Option<&dyn Actor>,
        entity: &dyn StateHolder,
        context: &Context,
    ) -> Result<bool> {
        let Some(actor) = actor else {
            return Ok(false);
        };
        Ok(self
            .checks
            .get(ability)
            .is_some_and(|check| check(actor, entity, context)))
    }
}

/// Resource-policy checks registered per entity type.
///
/// An absent actor or a type with no registered policy denies.
pub struct PolicyStrategy {
    policies: HashMap<String, Arc<dyn Policy>>,
}

impl PolicyStrategy {
    pub fn new() -> Self {
        Self {
            policies: HashMap::new(),
        }
    }

    pub fn register(&mut self, entity_type: impl Into<String>, policy: Arc<dyn Policy>) {
        self.policies.insert(entity_type.into(), policy);
    }
}

impl Default for PolicyStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthorizationStrategy for PolicyStrategy {
    fn check(
        &self,
        ability: &str,
        actor: Option<&dyn Actor>,
        entity: &dyn StateHolder,
        context: &Context,
    ) -> Result<bool> {
        let Some(actor) = actor else {
            return Ok(false);
        };
        Ok(self
            .policies
            .get(entity.entity_type())
            .is_some_and(|policy| policy.allows(ability, actor, entity, context)))
    }
}

/// Permission-string lookup on the actor itself.
///
/// Requires the actor to expose the permission-lookup capability; an actor
/// without it is a configuration error, not a denial.
pub struct PermissionStrategy;

impl AuthorizationStrategy for PermissionStrategy {
    fn check(
        &self,
        ability: &str,
        actor: Option<&dyn Actor>,
        _entity: &dyn StateHolder,
        _context: &Context,
    ) -> Result<bool> {
        let Some(actor) = actor else {
            return Ok(false);
        };
        actor.has_permission(ability).ok_or_else(|| {
            Error::configuration(format!(
                "permission strategy requires a permission lookup on actor type '{}'",
                actor.actor_type()
            ))
        })
    }
}
