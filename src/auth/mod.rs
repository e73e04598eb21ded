//! Authorization layer.
//!
//! Transitions carrying a protect hook are checked against a pluggable
//! authorization strategy before any hook runs or any state mutates.
//! Exactly one strategy is active per check; the mode is an explicit
//! argument with a process-wide default, never ambient mutable state.

mod strategies;

pub use strategies::{
    AuthorizationStrategy, DisabledStrategy, GateStrategy, PermissionStrategy, PolicyStrategy,
};

use crate::core::Context;
use crate::entity::StateHolder;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Identity performing a transition.
///
/// `has_permission` backs the permission-string strategy; the default
/// `None` marks the capability as absent on this actor type, which that
/// strategy reports as a configuration error.
pub trait Actor: Send + Sync {
    fn actor_type(&self) -> &str;

    fn actor_id(&self) -> String;

    fn has_permission(&self, _permission: &str) -> Option<bool> {
        None
    }
}

/// Ability check registered on the gate strategy.
pub type GateCheck = Arc<dyn Fn(&dyn Actor, &dyn StateHolder, &Context) -> bool + Send + Sync>;

/// Per-entity-type policy object backing the policy strategy.
pub trait Policy: Send + Sync {
    fn allows(
        &self,
        ability: &str,
        actor: &dyn Actor,
        entity: &dyn StateHolder,
        context: &Context,
    ) -> bool;
}

/// Which authorization strategy a check runs under.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthorizationMode {
    /// All checks succeed without consulting any strategy.
    #[default]
    Disabled,
    /// Ability closures registered per ability name.
    Gate,
    /// Policy objects registered per entity type.
    Policy,
    /// Permission-string lookup on the actor.
    Permission,
}

impl AuthorizationMode {
    pub fn is_active(self) -> bool {
        self != AuthorizationMode::Disabled
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AuthorizationMode::Disabled => "disabled",
            AuthorizationMode::Gate => "gate",
            AuthorizationMode::Policy => "policy",
            AuthorizationMode::Permission => "permission",
        }
    }
}

/// Owns the strategy instances and the process-wide default mode.
///
/// Callers needing a different strategy for a single check pass the mode
/// explicitly via [`authorize_using`](Self::authorize_using); there is no
/// global override to restore afterwards.
pub struct Authorizer {
    default_mode: AuthorizationMode,
    disabled: DisabledStrategy,
    gate: GateStrategy,
    policy: PolicyStrategy,
    permission: PermissionStrategy,
}

impl Authorizer {
    pub fn new(default_mode: AuthorizationMode) -> Self {
        Self {
            default_mode,
            disabled: DisabledStrategy,
            gate: GateStrategy::new(),
            policy: PolicyStrategy::new(),
            permission: PermissionStrategy,
        }
    }

    pub fn default_mode(&self) -> AuthorizationMode {
        self.default_mode
    }

    /// Register an ability check on the gate strategy.
    pub fn define_ability<F>(&mut self, ability: impl Into<String>, check: F)
    where
        F: Fn(&dyn Actor, &dyn StateHolder, &Context) -> bool + Send + Sync + 'static,
    {
        self.gate.define(ability, Arc::new(check));
    }

    /// Register a policy object for an entity type.
    pub fn register_policy(&mut self, entity_type: impl Into<String>, policy: Arc<dyn Policy>) {
        self.policy.register(entity_type, policy);
    }

    /// Check an ability under the default mode, failing with
    /// [`Error::Unauthorized`] on denial.
    pub fn authorize(
        &self,
        ability: &str,
        actor: Option<&dyn Actor>,
        entity: &dyn StateHolder,
        context: &Context,
    ) -> Result<()> {
        self.authorize_using(self.default_mode, ability, actor, entity, context)
    }

    /// Check an ability under an explicitly chosen mode.
    pub fn authorize_using(
        &self,
        mode: AuthorizationMode,
        ability: &str,
        actor: Option<&dyn Actor>,
        entity: &dyn StateHolder,
        context: &Context,
    ) -> Result<()> {
        if self.check_using(mode, ability, actor, entity, context)? {
            Ok(())
        } else {
            Err(Error::Unauthorized {
                ability: ability.to_string(),
                actor: actor.map(|a| format!("{}:{}", a.actor_type(), a.actor_id())),
            })
        }
    }

    /// Raw strategy result under the default mode.
    pub fn check(
        &self,
        ability: &str,
        actor: Option<&dyn Actor>,
        entity: &dyn StateHolder,
        context: &Context,
    ) -> Result<bool> {
        self.check_using(self.default_mode, ability, actor, entity, context)
    }

    /// Raw strategy result under an explicitly chosen mode.
    ///
    /// The disabled mode short-circuits to `true` without invoking any
    /// strategy.
    pub fn check_using(
        &self,
        mode: AuthorizationMode,
        ability: &str,
        actor: Option<&dyn Actor>,
        entity: &dyn StateHolder,
        context: &Context,
    ) -> Result<bool> {
        if !mode.is_active() {
            return Ok(true);
        }
        self.strategy(mode).check(ability, actor, entity, context)
    }

    fn strategy(&self, mode: AuthorizationMode) -> &dyn AuthorizationStrategy {
        match mode {
            AuthorizationMode::Disabled => &self.disabled,
            AuthorizationMode::Gate => &self.gate,
            AuthorizationMode::Policy => &self.policy,
            AuthorizationMode::Permission => &self.permission,
        }
    }
}

impl Default for Authorizer {
    fn default() -> Self {
        Self::new(AuthorizationMode::Disabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Document {
        status: Option<String>,
    }

    impl StateHolder for Document {
        fn entity_type(&self) -> &str {
            "document"
        }

        fn entity_id(&self) -> String {
            "1".to_string()
        }

        fn get_state(&self, _property: &str) -> Option<String> {
            self.status.clone()
        }

        fn set_state(&mut self, _property: &str, value: &str) {
            self.status = Some(value.to_string());
        }
    }

    struct User {
        id: u64,
    }

    impl Actor for User {
        fn actor_type(&self) -> &str {
            "user"
        }

        fn actor_id(&self) -> String {
            self.id.to_string()
        }
    }

    fn document() -> Document {
        Document {
            status: Some("draft".to_string()),
        }
    }

    #[test]
    fn mode_serde_uses_kebab_case() {
        let mode: AuthorizationMode = serde_json::from_str("\"permission\"").unwrap();
        assert_eq!(mode, AuthorizationMode::Permission);
        assert_eq!(
            serde_json::to_string(&AuthorizationMode::Disabled).unwrap(),
            "\"disabled\""
        );
    }

    #[test]
    fn disabled_mode_allows_everything() {
        let authorizer = Authorizer::new(AuthorizationMode::Disabled);
        assert!(authorizer
            .authorize("anything", None, &document(), &Context::new())
            .is_ok());
    }

    #[test]
    fn gate_checks_registered_ability() {
        let mut authorizer = Authorizer::new(AuthorizationMode::Gate);
        authorizer.define_ability("review", |actor, _entity, _ctx| {
            actor.actor_id() == "1"
        });

        let editor = User { id: 1 };
        let viewer = User { id: 2 };

        assert!(authorizer
            .authorize("review", Some(&editor), &document(), &Context::new())
            .is_ok());

        let err = authorizer
            .authorize("review", Some(&viewer), &document(), &Context::new())
            .unwrap_err();
        match err {
            Error::Unauthorized { ability, actor } => {
                assert_eq!(ability, "review");
                assert_eq!(actor.as_deref(), Some("user:2"));
            }
            other => panic!("expected Unauthorized, got {other:?}"),
        }
    }

    #[test]
    fn explicit_mode_overrides_default_per_call() {
        let mut authorizer = Authorizer::new(AuthorizationMode::Disabled);
        authorizer.define_ability("review", |_actor, _entity, _ctx| false);

        let user = User { id: 1 };

        // Default mode is disabled, so the check passes.
        assert!(authorizer
            .authorize("review", Some(&user), &document(), &Context::new())
            .is_ok());

        // The same check under an explicit gate mode is denied.
        assert!(authorizer
            .authorize_using(
                AuthorizationMode::Gate,
                "review",
                Some(&user),
                &document(),
                &Context::new()
            )
            .is_err());

        // The default mode is untouched afterwards.
        assert_eq!(authorizer.default_mode(), AuthorizationMode::Disabled);
        assert!(authorizer
            .authorize("review", Some(&user), &document(), &Context::new())
            .is_ok());
    }
}
