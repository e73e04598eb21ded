//! State manager: the transition-execution engine.
//!
//! A [`StateManager`] is a session bound to exactly one entity instance
//! and property. It drives every state change through one pipeline:
//! validation, authorization, before hooks, mutation, audit, after hooks,
//! with the in-memory view reverted on any failure after mutation. The
//! entity's persisted property value is deliberately NOT reverted by the
//! engine; hosts keep it consistent inside their own transaction boundary.

use crate::auth::{Actor, Authorizer};
use crate::config::StateConfig;
use crate::core::{Context, Metadata, Transition};
use crate::entity::StateHolder;
use crate::error::{Error, Result};
use crate::history::{HistoryRepository, NewTransitionRecord};
use crate::hooks::{HandlerResolver, HookCategory, HookKey, HookManager};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// One entry in a manager's in-memory change log.
///
/// This is the session-local record, distinct from the durable audit
/// trail kept by the history repository.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    pub from: String,
    pub to: String,
    pub at: DateTime<Utc>,
}

/// Client request metadata captured best-effort into audit records.
#[derive(Clone, Debug, Default)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Summary of a manager's current view, for display or serialization.
#[derive(Clone, Debug, Serialize)]
pub struct ManagerSummary {
    pub current_state: String,
    pub previous_state: Option<String>,
    pub available_transitions: Vec<String>,
    pub changes: usize,
    pub last_change: Option<StateChange>,
}

/// The engine's in-memory view of one (entity, property) pair.
///
/// Cached by the registry so repeated access continues the same view.
pub(crate) struct ManagerState {
    current: String,
    previous: Option<String>,
    changes: Vec<StateChange>,
}

struct Checkpoint {
    current: String,
    previous: Option<String>,
    changes: usize,
}

impl ManagerState {
    pub(crate) fn new(current: String) -> Self {
        Self {
            current,
            previous: None,
            changes: Vec::new(),
        }
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            current: self.current.clone(),
            previous: self.previous.clone(),
            changes: self.changes.len(),
        }
    }

    fn apply(&mut self, to: &str) {
        let from = std::mem::replace(&mut self.current, to.to_string());
        self.changes.push(StateChange {
            from: from.clone(),
            to: to.to_string(),
            at: Utc::now(),
        });
        self.previous = Some(from);
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.current = checkpoint.current;
        self.previous = checkpoint.previous;
        self.changes.truncate(checkpoint.changes);
    }
}

/// Everything a manager session needs besides the entity and its cached
/// state; assembled by the registry.
pub(crate) struct ManagerParts {
    pub(crate) property: String,
    pub(crate) config: Arc<StateConfig>,
    pub(crate) authorizer: Arc<Authorizer>,
    pub(crate) history: Option<Arc<dyn HistoryRepository>>,
    pub(crate) resolver: Option<Arc<dyn HandlerResolver>>,
    pub(crate) track_history: bool,
}

impl Clone for ManagerParts {
    fn clone(&self) -> Self {
        Self {
            property: self.property.clone(),
            config: Arc::clone(&self.config),
            authorizer: Arc::clone(&self.authorizer),
            history: self.history.clone(),
            resolver: self.resolver.clone(),
            track_history: self.track_history,
        }
    }
}

/// Transition engine bound to one entity instance and property.
///
/// Obtained from [`Registry::manager_for`](crate::registry::Registry::manager_for).
/// Not safe for concurrent mutation; each transition runs to completion in
/// the caller's execution context.
pub struct StateManager<'a, E: StateHolder> {
    entity: &'a mut E,
    state: &'a mut ManagerState,
    property: String,
    config: Arc<StateConfig>,
    hooks: HookManager,
    authorizer: Arc<Authorizer>,
    history: Option<Arc<dyn HistoryRepository>>,
    track_history: bool,
    actor: Option<Arc<dyn Actor>>,
    client: ClientInfo,
}

impl<'a, E: StateHolder> std::fmt::Debug for StateManager<'a, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateManager")
            .field("property", &self.property)
            .field("track_history", &self.track_history)
            .finish_non_exhaustive()
    }
}

impl<'a, E: StateHolder> StateManager<'a, E> {
    pub(crate) fn bind(entity: &'a mut E, state: &'a mut ManagerState, parts: ManagerParts) -> Self {
        let hooks = HookManager::new(&parts.config, parts.resolver.clone());
        Self {
            entity,
            state,
            property: parts.property,
            config: parts.config,
            hooks,
            authorizer: parts.authorizer,
            history: parts.history,
            track_history: parts.track_history,
            actor: None,
            client: ClientInfo::default(),
        }
    }

    /// Bind the acting identity for this session's transitions.
    pub fn act_as(&mut self, actor: Arc<dyn Actor>) -> &mut Self {
        self.actor = Some(actor);
        self
    }

    /// Attach client request metadata for audit records.
    pub fn with_client(&mut self, client: ClientInfo) -> &mut Self {
        self.client = client;
        self
    }

    pub fn state(&self) -> &str {
        &self.state.current
    }

    pub fn previous_state(&self) -> Option<&str> {
        self.state.previous.as_deref()
    }

    /// Session-local change log, oldest first.
    pub fn changes(&self) -> &[StateChange] {
        &self.state.changes
    }

    pub fn config(&self) -> &StateConfig {
        &self.config
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn entity(&self) -> &E {
        &*self.entity
    }

    pub fn state_is(&self, state: &str) -> bool {
        self.state.current == state
    }

    pub fn state_is_any(&self, states: &[&str]) -> bool {
        states.iter().any(|s| self.state_is(s))
    }

    /// Execute a declared transition.
    ///
    /// The pipeline, in order: lookup, validation (source specifier,
    /// state allow-list, guards), authorization (protect hook), before
    /// hooks (transition, leave-from, enter-to), entity mutation plus
    /// change-log append, durable audit record when tracking is enabled,
    /// after hooks (transition, leave-from, enter-to). Any failure after
    /// mutation reverts the in-memory view and re-raises.
    pub fn transition(&mut self, name: &str, context: &Context) -> Result<()> {
        let config = Arc::clone(&self.config);
        let Some(transition) = config.transition(name) else {
            return Err(Error::UnknownTransition {
                transition: name.to_string(),
            });
        };

        let from = self.state.current.clone();
        let to = transition.target().to_string();

        if !self.transition_is_valid(name, transition, &from, None, context) {
            return Err(Error::InvalidTransition {
                transition: name.to_string(),
                from,
                to,
            });
        }

        // Authorization runs before any hook or mutation.
        self.check_authorization(name, context)?;

        self.run_hooks(
            [
                HookCategory::BeforeTransition.key(name),
                HookCategory::BeforeLeave.key(&from),
                HookCategory::BeforeEnter.key(&to),
            ],
            context,
        )?;

        let checkpoint = self.state.checkpoint();
        self.entity.set_state(&self.property, &to);
        self.state.apply(&to);

        let outcome = self.record_history(name, &from, &to, context).and_then(|()| {
            self.run_hooks(
                [
                    HookCategory::AfterTransition.key(name),
                    HookCategory::AfterLeave.key(&from),
                    HookCategory::AfterEnter.key(&to),
                ],
                context,
            )
        });

        if let Err(error) = outcome {
            // Only the engine's view is reverted; the persisted property
            // keeps the new value.
            self.state.restore(checkpoint);
            return Err(error);
        }

        debug!(transition = name, from = %from, to = %to, "state transition complete");
        Ok(())
    }

    /// Whether some declared transition validly leads from the current
    /// state to the given target.
    pub fn can_transition_to(&self, to: &str) -> bool {
        self.can_transition_to_with(to, &Context::new())
    }

    /// [`can_transition_to`](Self::can_transition_to) with an explicit
    /// context for guard evaluation.
    pub fn can_transition_to_with(&self, to: &str, context: &Context) -> bool {
        self.config
            .transitions()
            .any(|(name, t)| self.transition_is_valid(name, t, &self.state.current, Some(to), context))
    }

    /// Names of all transitions valid from the current state, in
    /// declaration order.
    pub fn available_transitions(&self) -> Vec<&str> {
        let context = Context::new();
        self.config
            .transitions()
            .filter(|(name, t)| {
                self.transition_is_valid(name, t, &self.state.current, None, &context)
            })
            .map(|(name, _)| name)
            .collect()
    }

    /// First transition name connecting the given states, in declaration
    /// order.
    pub fn find_transition_by_states(&self, from: &str, to: &str) -> Option<&str> {
        let context = Context::new();
        self.config
            .transitions()
            .find(|(name, t)| self.transition_is_valid(name, t, from, Some(to), &context))
            .map(|(name, _)| name)
    }

    /// Whether any of the named transitions is currently available.
    pub fn has_any_transition(&self, names: &[&str]) -> bool {
        let available = self.available_transitions();
        names.iter().any(|name| available.contains(name))
    }

    /// Whether every listed target state is currently reachable.
    pub fn can_transition_to_all(&self, states: &[&str]) -> bool {
        states.iter().all(|state| self.can_transition_to(state))
    }

    /// Non-throwing authorization probe combined with reachability.
    ///
    /// Returns `Ok(false)` instead of propagating `Unauthorized`;
    /// configuration errors still propagate.
    pub fn user_can_transition_to(
        &self,
        to: &str,
        context: &Context,
        actor: Option<&dyn Actor>,
    ) -> Result<bool> {
        if !self.can_transition_to_with(to, context) {
            return Ok(false);
        }
        let Some(name) = self.find_transition_by_states(&self.state.current, to) else {
            return Ok(false);
        };
        let Some(ability) = self.protect_ability(name) else {
            return Ok(true);
        };
        let ability = ability.to_string();
        let actor = actor.or_else(|| self.actor.as_deref());
        match self
            .authorizer
            .authorize(&ability, actor, &*self.entity, context)
        {
            Ok(()) => Ok(true),
            Err(Error::Unauthorized { .. }) => Ok(false),
            Err(error) => Err(error),
        }
    }

    /// Snapshot of the manager's view.
    pub fn summary(&self) -> ManagerSummary {
        ManagerSummary {
            current_state: self.state.current.clone(),
            previous_state: self.state.previous.clone(),
            available_transitions: self
                .available_transitions()
                .into_iter()
                .map(str::to_string)
                .collect(),
            changes: self.state.changes.len(),
            last_change: self.state.changes.last().cloned(),
        }
    }

    fn transition_is_valid(
        &self,
        name: &str,
        transition: &Transition,
        from: &str,
        to: Option<&str>,
        context: &Context,
    ) -> bool {
        let permitted = self
            .config
            .state(from)
            .map_or(true, |state| state.permits(name));
        permitted
            && transition.allows_from(from)
            && to.is_none_or(|t| transition.target() == t)
            && transition.passes_guards(&*self.entity, context)
    }

    fn check_authorization(&self, name: &str, context: &Context) -> Result<()> {
        if let Some(ability) = self.protect_ability(name) {
            let ability = ability.to_string();
            self.authorizer
                .authorize(&ability, self.actor.as_deref(), &*self.entity, context)?;
        }
        Ok(())
    }

    fn protect_ability(&self, name: &str) -> Option<&str> {
        self.hooks
            .first(&HookCategory::Protect.key(name))
            .and_then(|hook| hook.ability())
    }

    fn run_hooks(&mut self, keys: [HookKey; 3], context: &Context) -> Result<()> {
        for key in keys {
            self.hooks.execute(&key, &mut *self.entity, context)?;
        }
        Ok(())
    }

    fn record_history(&self, name: &str, from: &str, to: &str, context: &Context) -> Result<()> {
        if !self.track_history {
            return Ok(());
        }
        let Some(repository) = &self.history else {
            return Ok(());
        };
        repository.record(NewTransitionRecord {
            entity_type: self.entity.entity_type().to_string(),
            entity_id: self.entity.entity_id(),
            property: self.property.clone(),
            transition: Some(name.to_string()),
            from_state: from.to_string(),
            to_state: to.to_string(),
            context: context.clone(),
            actor_type: self.actor.as_ref().map(|a| a.actor_type().to_string()),
            actor_id: self.actor.as_ref().map(|a| a.actor_id()),
            metadata: Metadata::new(),
            ip_address: self.client.ip_address.clone(),
            user_agent: self.client.user_agent.clone(),
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthorizationMode;
    use crate::config::INSTANTIATED;
    use crate::core::Transition;
    use crate::error::BoxError;
    use crate::history::InMemoryHistory;
    use crate::hooks::Hook;
    use std::sync::Mutex;

    struct Article {
        id: u64,
        status: Option<String>,
        is_valid: bool,
    }

    impl Article {
        fn at(state: &str) -> Self {
            Self {
                id: 1,
                status: Some(state.to_string()),
                is_valid: true,
            }
        }
    }

    impl StateHolder for Article {
        fn entity_type(&self) -> &str {
            "article"
        }

        fn entity_id(&self) -> String {
            self.id.to_string()
        }

        fn get_state(&self, property: &str) -> Option<String> {
            match property {
                "status" => self.status.clone(),
                _ => None,
            }
        }

        fn set_state(&mut self, property: &str, value: &str) {
            if property == "status" {
                self.status = Some(value.to_string());
            }
        }
    }

    struct Reviewer {
        id: u64,
    }

    impl Actor for Reviewer {
        fn actor_type(&self) -> &str {
            "user"
        }

        fn actor_id(&self) -> String {
            self.id.to_string()
        }
    }

    fn review_config() -> StateConfig {
        let mut config = StateConfig::new("draft");
        config
            .add_states(["draft", "pending_review", "approved", "rejected", "archived"])
            .unwrap();
        config
            .set_transition(
                "submit",
                Transition::new().from("draft").to("pending_review"),
            )
            .unwrap();
        config
            .set_transition(
                "approve",
                Transition::new().from("pending_review").to("approved"),
            )
            .unwrap();
        config
            .set_transition(
                "reject",
                Transition::new().from("pending_review").to("rejected"),
            )
            .unwrap();
        config
            .set_transition("archive", Transition::new().from("*").to("archived"))
            .unwrap();
        config
    }

    fn parts_for(mut config: StateConfig) -> ManagerParts {
        config.finalize();
        ManagerParts {
            property: "status".to_string(),
            config: Arc::new(config),
            authorizer: Arc::new(Authorizer::default()),
            history: None,
            resolver: None,
            track_history: false,
        }
    }

    #[test]
    fn valid_transition_updates_entity_and_view() {
        let mut article = Article::at("draft");
        let mut state = ManagerState::new("draft".to_string());
        let mut manager = StateManager::bind(&mut article, &mut state, parts_for(review_config()));

        manager.transition("submit", &Context::new()).unwrap();

        assert_eq!(manager.state(), "pending_review");
        assert_eq!(manager.previous_state(), Some("draft"));
        assert_eq!(manager.changes().len(), 1);
        assert_eq!(manager.changes()[0].from, "draft");
        assert_eq!(manager.changes()[0].to, "pending_review");

        drop(manager);
        assert_eq!(article.status.as_deref(), Some("pending_review"));
    }

    #[test]
    fn unknown_transition_is_reported() {
        let mut article = Article::at("draft");
        let mut state = ManagerState::new("draft".to_string());
        let mut manager = StateManager::bind(&mut article, &mut state, parts_for(review_config()));

        let err = manager.transition("vanish", &Context::new()).unwrap_err();
        assert!(matches!(err, Error::UnknownTransition { .. }));
        assert_eq!(manager.state(), "draft");
    }

    #[test]
    fn transition_from_wrong_state_is_invalid_and_preserves_state() {
        let mut article = Article::at("draft");
        let mut state = ManagerState::new("draft".to_string());
        let mut manager = StateManager::bind(&mut article, &mut state, parts_for(review_config()));

        let err = manager.transition("approve", &Context::new()).unwrap_err();
        match err {
            Error::InvalidTransition {
                transition,
                from,
                to,
            } => {
                assert_eq!(transition, "approve");
                assert_eq!(from, "draft");
                assert_eq!(to, "approved");
            }
            other => panic!("expected InvalidTransition, got {other:?}"),
        }

        assert_eq!(manager.state(), "draft");
        assert!(manager.changes().is_empty());
        drop(manager);
        assert_eq!(article.status.as_deref(), Some("draft"));
    }

    #[test]
    fn wildcard_transition_runs_from_any_state_including_final() {
        let mut config = review_config();
        config
            .add_state(crate::core::State::new("approved").mark_final())
            .unwrap();

        let mut article = Article::at("approved");
        let mut state = ManagerState::new("approved".to_string());
        let mut manager = StateManager::bind(&mut article, &mut state, parts_for(config));

        manager.transition("archive", &Context::new()).unwrap();
        assert_eq!(manager.state(), "archived");
    }

    #[test]
    fn repeated_transition_is_allowed_when_config_permits() {
        let mut article = Article::at("archived");
        let mut state = ManagerState::new("archived".to_string());
        let mut manager = StateManager::bind(&mut article, &mut state, parts_for(review_config()));

        manager.transition("archive", &Context::new()).unwrap();
        manager.transition("archive", &Context::new()).unwrap();

        assert_eq!(manager.state(), "archived");
        assert_eq!(manager.previous_state(), Some("archived"));
        assert_eq!(manager.changes().len(), 2);
    }

    #[test]
    fn failing_guard_makes_transition_invalid() {
        let mut config = review_config();
        config
            .set_transition(
                "submit",
                Transition::new()
                    .from("draft")
                    .to("pending_review")
                    .guard(|entity, _ctx| {
                        entity
                            .downcast_ref::<Article>()
                            .is_some_and(|article| article.is_valid)
                    }),
            )
            .unwrap();

        let mut article = Article::at("draft");
        article.is_valid = false;
        let mut state = ManagerState::new("draft".to_string());
        let mut manager = StateManager::bind(&mut article, &mut state, parts_for(config));

        let err = manager.transition("submit", &Context::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
        assert_eq!(manager.state(), "draft");
        assert!(!manager.can_transition_to("pending_review"));
    }

    #[test]
    fn state_allow_list_restricts_transitions() {
        let mut config = review_config();
        config
            .add_state(crate::core::State::new("draft").allow_transitions(["submit"]))
            .unwrap();

        let mut article = Article::at("draft");
        let mut state = ManagerState::new("draft".to_string());
        let mut manager = StateManager::bind(&mut article, &mut state, parts_for(config));

        // The wildcard archive transition is blocked by draft's allow-list.
        let err = manager.transition("archive", &Context::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
        assert_eq!(manager.available_transitions(), ["submit"]);

        manager.transition("submit", &Context::new()).unwrap();
        manager.transition("archive", &Context::new()).unwrap();
        assert_eq!(manager.state(), "archived");
    }

    #[test]
    fn hooks_run_in_pipeline_order_around_the_mutation() {
        let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let mut config = review_config();

        let recorder = |label: &'static str, log: &Arc<Mutex<Vec<String>>>| {
            let log = Arc::clone(log);
            Hook::callback(move |entity, _ctx| {
                let seen = entity.get_state("status").unwrap_or_default();
                log.lock().unwrap().push(format!("{label}@{seen}"));
                Ok(())
            })
        };

        config
            .before_transition("submit", recorder("before-transition", &log))
            .unwrap()
            .before_leave("draft", recorder("before-leave", &log))
            .unwrap()
            .before_enter("pending_review", recorder("before-enter", &log))
            .unwrap()
            .after_transition("submit", recorder("after-transition", &log))
            .unwrap()
            .after_leave("draft", recorder("after-leave", &log))
            .unwrap()
            .after_enter("pending_review", recorder("after-enter", &log))
            .unwrap();

        let mut article = Article::at("draft");
        let mut state = ManagerState::new("draft".to_string());
        let mut manager = StateManager::bind(&mut article, &mut state, parts_for(config));

        manager.transition("submit", &Context::new()).unwrap();

        // Before hooks observe the old state, after hooks the new one.
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "before-transition@draft",
                "before-leave@draft",
                "before-enter@draft",
                "after-transition@pending_review",
                "after-leave@pending_review",
                "after-enter@pending_review",
            ]
        );
    }

    #[test]
    fn before_hook_failure_aborts_without_mutation() {
        let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
        let mut config = review_config();

        config
            .before_transition(
                "submit",
                Hook::callback(|_entity, _ctx| Err::<(), BoxError>("not ready".into())),
            )
            .unwrap();
        let after = Arc::clone(&log);
        config
            .after_transition(
                "submit",
                Hook::callback(move |_entity, _ctx| {
                    after.lock().unwrap().push("after");
                    Ok(())
                }),
            )
            .unwrap();

        let mut article = Article::at("draft");
        let mut state = ManagerState::new("draft".to_string());
        let mut manager = StateManager::bind(&mut article, &mut state, parts_for(config));

        let err = manager.transition("submit", &Context::new()).unwrap_err();
        assert!(matches!(err, Error::HookFailed { .. }));

        assert_eq!(manager.state(), "draft");
        assert!(manager.changes().is_empty());
        assert!(log.lock().unwrap().is_empty());
        drop(manager);
        assert_eq!(article.status.as_deref(), Some("draft"));
    }

    #[test]
    fn after_hook_failure_reverts_view_but_not_entity() {
        let mut config = review_config();
        config
            .after_transition(
                "submit",
                Hook::callback(|_entity, _ctx| Err::<(), BoxError>("notify failed".into())),
            )
            .unwrap();

        let mut article = Article::at("draft");
        let mut state = ManagerState::new("draft".to_string());
        let mut manager = StateManager::bind(&mut article, &mut state, parts_for(config));

        let err = manager.transition("submit", &Context::new()).unwrap_err();
        assert!(matches!(err, Error::HookFailed { .. }));

        // The in-memory view is back on draft.
        assert_eq!(manager.state(), "draft");
        assert_eq!(manager.previous_state(), None);
        assert!(manager.changes().is_empty());

        // The persisted property keeps the new value; reconciling it is
        // the host's responsibility.
        drop(manager);
        assert_eq!(article.status.as_deref(), Some("pending_review"));
    }

    #[test]
    fn continue_on_error_hook_does_not_disturb_the_pipeline() {
        let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
        let mut config = review_config();

        config
            .after_transition(
                "submit",
                Hook::callback(|_entity, _ctx| Err::<(), BoxError>("best effort".into()))
                    .continue_on_error(),
            )
            .unwrap();
        let after = Arc::clone(&log);
        config
            .after_enter(
                "pending_review",
                Hook::callback(move |_entity, _ctx| {
                    after.lock().unwrap().push("after-enter");
                    Ok(())
                }),
            )
            .unwrap();

        let mut article = Article::at("draft");
        let mut state = ManagerState::new("draft".to_string());
        let mut manager = StateManager::bind(&mut article, &mut state, parts_for(config));

        manager.transition("submit", &Context::new()).unwrap();

        assert_eq!(manager.state(), "pending_review");
        assert_eq!(*log.lock().unwrap(), vec!["after-enter"]);
    }

    #[test]
    fn protected_transition_passes_when_authorization_is_disabled() {
        let mut config = review_config();
        config.protect_transition("approve", "review").unwrap();

        let mut article = Article::at("pending_review");
        let mut state = ManagerState::new("pending_review".to_string());
        let mut manager = StateManager::bind(&mut article, &mut state, parts_for(config));

        manager.transition("approve", &Context::new()).unwrap();
        assert_eq!(manager.state(), "approved");
    }

    fn gate_parts(config: StateConfig) -> ManagerParts {
        let mut authorizer = Authorizer::new(AuthorizationMode::Gate);
        authorizer.define_ability("review", |actor, _entity, _ctx| actor.actor_id() == "1");
        let mut parts = parts_for(config);
        parts.authorizer = Arc::new(authorizer);
        parts
    }

    #[test]
    fn unauthorized_actor_is_rejected_before_any_side_effect() {
        let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
        let mut config = review_config();
        config.protect_transition("approve", "review").unwrap();
        let before = Arc::clone(&log);
        config
            .before_transition(
                "approve",
                Hook::callback(move |_entity, _ctx| {
                    before.lock().unwrap().push("before");
                    Ok(())
                }),
            )
            .unwrap();

        let mut article = Article::at("pending_review");
        let mut state = ManagerState::new("pending_review".to_string());
        let mut manager = StateManager::bind(&mut article, &mut state, gate_parts(config));
        manager.act_as(Arc::new(Reviewer { id: 2 }));

        let err = manager.transition("approve", &Context::new()).unwrap_err();
        assert!(matches!(err, Error::Unauthorized { .. }));
        assert_eq!(err.status_code(), 403);

        assert_eq!(manager.state(), "pending_review");
        assert!(log.lock().unwrap().is_empty());
        drop(manager);
        assert_eq!(article.status.as_deref(), Some("pending_review"));
    }

    #[test]
    fn authorized_actor_completes_protected_transition() {
        let mut config = review_config();
        config.protect_transition("approve", "review").unwrap();

        let mut article = Article::at("pending_review");
        let mut state = ManagerState::new("pending_review".to_string());
        let mut manager = StateManager::bind(&mut article, &mut state, gate_parts(config));
        manager.act_as(Arc::new(Reviewer { id: 1 }));

        manager.transition("approve", &Context::new()).unwrap();
        assert_eq!(manager.state(), "approved");
        assert_eq!(manager.previous_state(), Some("pending_review"));
    }

    #[test]
    fn unprotected_transition_ignores_the_actor_entirely() {
        let mut article = Article::at("draft");
        let mut state = ManagerState::new("draft".to_string());
        let mut manager =
            StateManager::bind(&mut article, &mut state, gate_parts(review_config()));
        manager.act_as(Arc::new(Reviewer { id: 99 }));

        manager.transition("submit", &Context::new()).unwrap();
        assert_eq!(manager.state(), "pending_review");
    }

    #[test]
    fn user_can_transition_to_probes_without_throwing() {
        let mut config = review_config();
        config.protect_transition("approve", "review").unwrap();

        let mut article = Article::at("pending_review");
        let mut state = ManagerState::new("pending_review".to_string());
        let manager = StateManager::bind(&mut article, &mut state, gate_parts(config));

        let reviewer = Reviewer { id: 1 };
        let outsider = Reviewer { id: 2 };

        assert!(manager
            .user_can_transition_to("approved", &Context::new(), Some(&reviewer))
            .unwrap());
        assert!(!manager
            .user_can_transition_to("approved", &Context::new(), Some(&outsider))
            .unwrap());
        assert!(!manager
            .user_can_transition_to("approved", &Context::new(), None)
            .unwrap());

        // Unreachable targets are false regardless of authorization.
        assert!(!manager
            .user_can_transition_to("draft", &Context::new(), Some(&reviewer))
            .unwrap());

        // Unprotected reachable targets need no actor.
        assert!(manager
            .user_can_transition_to("rejected", &Context::new(), None)
            .unwrap());
    }

    #[test]
    fn available_transitions_track_the_current_state() {
        let mut article = Article::at("draft");
        let mut state = ManagerState::new("draft".to_string());
        let mut manager = StateManager::bind(&mut article, &mut state, parts_for(review_config()));

        assert_eq!(manager.available_transitions(), ["submit", "archive"]);
        assert!(manager.can_transition_to("pending_review"));
        assert!(!manager.can_transition_to("approved"));

        manager.transition("submit", &Context::new()).unwrap();
        assert_eq!(
            manager.available_transitions(),
            ["approve", "reject", "archive"]
        );
    }

    #[test]
    fn find_transition_by_states_uses_declaration_order() {
        let mut config = review_config();
        config
            .set_transition(
                "force_review",
                Transition::new().from("draft").to("pending_review"),
            )
            .unwrap();

        let mut article = Article::at("draft");
        let mut state = ManagerState::new("draft".to_string());
        let manager = StateManager::bind(&mut article, &mut state, parts_for(config));

        // "submit" was declared before "force_review".
        assert_eq!(
            manager.find_transition_by_states("draft", "pending_review"),
            Some("submit")
        );
        assert_eq!(
            manager.find_transition_by_states("draft", "approved"),
            None
        );
    }

    #[test]
    fn convenience_queries_reflect_the_graph() {
        let mut article = Article::at("draft");
        let mut state = ManagerState::new("draft".to_string());
        let manager = StateManager::bind(&mut article, &mut state, parts_for(review_config()));

        assert!(manager.state_is("draft"));
        assert!(manager.state_is_any(&["draft", "approved"]));
        assert!(!manager.state_is_any(&["approved", "rejected"]));
        assert!(manager.has_any_transition(&["submit", "approve"]));
        assert!(!manager.has_any_transition(&["approve", "reject"]));
        assert!(manager.can_transition_to_all(&["pending_review", "archived"]));
        assert!(!manager.can_transition_to_all(&["pending_review", "approved"]));
    }

    #[test]
    fn summary_reports_the_current_view() {
        let mut article = Article::at("draft");
        let mut state = ManagerState::new("draft".to_string());
        let mut manager = StateManager::bind(&mut article, &mut state, parts_for(review_config()));

        manager.transition("submit", &Context::new()).unwrap();
        let summary = manager.summary();

        assert_eq!(summary.current_state, "pending_review");
        assert_eq!(summary.previous_state.as_deref(), Some("draft"));
        assert_eq!(
            summary.available_transitions,
            ["approve", "reject", "archive"]
        );
        assert_eq!(summary.changes, 1);
        assert_eq!(summary.last_change.unwrap().to, "pending_review");
    }

    #[test]
    fn audit_record_captures_actor_context_and_client() {
        let repository = Arc::new(InMemoryHistory::new());
        let mut parts = parts_for(review_config());
        parts.history = Some(repository.clone());
        parts.track_history = true;

        let mut article = Article::at("draft");
        let mut state = ManagerState::new("draft".to_string());
        let mut manager = StateManager::bind(&mut article, &mut state, parts);
        manager.act_as(Arc::new(Reviewer { id: 7 }));
        manager.with_client(ClientInfo {
            ip_address: Some("10.0.0.9".to_string()),
            user_agent: Some("statecraft-tests".to_string()),
        });

        let mut context = Context::new();
        context.insert("notes".to_string(), serde_json::json!("looks good"));
        manager.transition("submit", &context).unwrap();

        let records = repository.for_entity("article", "1", Some("status")).unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.transition.as_deref(), Some("submit"));
        assert_eq!(record.from_state, "draft");
        assert_eq!(record.to_state, "pending_review");
        assert_eq!(record.actor_type.as_deref(), Some("user"));
        assert_eq!(record.actor_id.as_deref(), Some("7"));
        assert_eq!(record.context["notes"], serde_json::json!("looks good"));
        assert_eq!(record.ip_address.as_deref(), Some("10.0.0.9"));
        assert_eq!(record.user_agent.as_deref(), Some("statecraft-tests"));
    }

    #[test]
    fn history_is_not_recorded_when_tracking_disabled() {
        let repository = Arc::new(InMemoryHistory::new());
        let mut parts = parts_for(review_config());
        parts.history = Some(repository.clone());
        parts.track_history = false;

        let mut article = Article::at("draft");
        let mut state = ManagerState::new("draft".to_string());
        let mut manager = StateManager::bind(&mut article, &mut state, parts);

        manager.transition("submit", &Context::new()).unwrap();
        assert_eq!(repository.count("article", "1", None).unwrap(), 0);
    }

    #[test]
    fn history_failure_after_mutation_reverts_the_view() {
        struct FailingRepo;

        impl HistoryRepository for FailingRepo {
            fn record(&self, _record: NewTransitionRecord) -> Result<crate::history::TransitionRecord> {
                Err(Error::History {
                    message: "store unavailable".to_string(),
                })
            }

            fn for_entity(
                &self,
                _entity_type: &str,
                _entity_id: &str,
                _property: Option<&str>,
            ) -> Result<Vec<crate::history::TransitionRecord>> {
                Ok(Vec::new())
            }

            fn last_transition(
                &self,
                _entity_type: &str,
                _entity_id: &str,
                _property: &str,
            ) -> Result<Option<crate::history::TransitionRecord>> {
                Ok(None)
            }

            fn count(
                &self,
                _entity_type: &str,
                _entity_id: &str,
                _property: Option<&str>,
            ) -> Result<usize> {
                Ok(0)
            }

            fn prune(&self, _retention_days: u32) -> Result<usize> {
                Ok(0)
            }
        }

        let mut parts = parts_for(review_config());
        parts.history = Some(Arc::new(FailingRepo));
        parts.track_history = true;

        let mut article = Article::at("draft");
        let mut state = ManagerState::new("draft".to_string());
        let mut manager = StateManager::bind(&mut article, &mut state, parts);

        let err = manager.transition("submit", &Context::new()).unwrap_err();
        assert!(matches!(err, Error::History { .. }));
        assert_eq!(manager.state(), "draft");
        drop(manager);
        assert_eq!(article.status.as_deref(), Some("pending_review"));
    }

    #[test]
    fn bootstrap_state_name_matches_constant() {
        // The synthetic entries referenced throughout the tests.
        assert_eq!(INSTANTIATED, "instantiated");
        assert_eq!(crate::config::INIT, "init");
    }
}
