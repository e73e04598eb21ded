//! Lifecycle hook model.
//!
//! Hooks are ordered callbacks tied to a (category, target) key, where the
//! target is a transition name or a state name. The `Protect` category is
//! special: it carries a required authorization ability instead of a
//! callback and is read, never executed.

mod handler;
mod manager;

pub use handler::{HandlerCallError, HandlerRegistry, HandlerResolver, HookHandler};
pub use manager::HookManager;

use crate::core::Context;
use crate::entity::StateHolder;
use crate::error::BoxError;
use std::fmt;
use std::sync::Arc;

/// Invocable hook callback over (entity, context).
pub type HookCallback =
    Arc<dyn Fn(&mut dyn StateHolder, &Context) -> Result<(), BoxError> + Send + Sync>;

/// Runtime predicate deciding whether a registered hook runs at all.
pub type HookCondition = Arc<dyn Fn(&dyn StateHolder, &Context) -> bool + Send + Sync>;

/// Lifecycle point a hook is attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HookCategory {
    BeforeTransition,
    AfterTransition,
    BeforeEnter,
    AfterEnter,
    BeforeLeave,
    AfterLeave,
    Protect,
}

impl HookCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            HookCategory::BeforeTransition => "before-transition",
            HookCategory::AfterTransition => "after-transition",
            HookCategory::BeforeEnter => "before-enter",
            HookCategory::AfterEnter => "after-enter",
            HookCategory::BeforeLeave => "before-leave",
            HookCategory::AfterLeave => "after-leave",
            HookCategory::Protect => "protect",
        }
    }

    pub fn is_before(self) -> bool {
        matches!(
            self,
            HookCategory::BeforeTransition | HookCategory::BeforeEnter | HookCategory::BeforeLeave
        )
    }

    pub fn is_after(self) -> bool {
        matches!(
            self,
            HookCategory::AfterTransition | HookCategory::AfterEnter | HookCategory::AfterLeave
        )
    }

    /// Build the registry key for this category and target.
    pub fn key(self, target: impl Into<String>) -> HookKey {
        HookKey {
            category: self,
            target: target.into(),
        }
    }
}

/// Registry key: a lifecycle category plus the transition or state name it
/// targets.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HookKey {
    pub category: HookCategory,
    pub target: String,
}

impl fmt::Display for HookKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category.as_str(), self.target)
    }
}

/// The three supported authoring shapes for an executable hook, plus the
/// ability marker used by protect hooks.
#[derive(Clone)]
pub enum HookAction {
    /// Direct callback.
    Callback(HookCallback),
    /// Named handler type resolved through a [`HandlerResolver`]; its
    /// instance must expose `handle`.
    Handler(String),
    /// Named handler type plus the method to invoke on it.
    HandlerMethod(String, String),
    /// Required authorization ability; carries no callback.
    Authorize(String),
}

impl fmt::Debug for HookAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookAction::Callback(_) => f.write_str("Callback(..)"),
            HookAction::Handler(name) => write!(f, "Handler({name})"),
            HookAction::HandlerMethod(name, method) => {
                write!(f, "HandlerMethod({name}, {method})")
            }
            HookAction::Authorize(ability) => write!(f, "Authorize({ability})"),
        }
    }
}

/// Maximum hook priority; values above this are clamped.
pub const MAX_HOOK_PRIORITY: u8 = 100;

/// A registered lifecycle hook.
///
/// Hooks in a bucket run highest priority first; equal priorities keep
/// declaration order. A hook with `stop_on_error` (the default) aborts the
/// whole pipeline when it fails; one without logs the failure and lets the
/// pipeline continue.
#[derive(Clone)]
pub struct Hook {
    action: HookAction,
    priority: u8,
    condition: Option<HookCondition>,
    stop_on_error: bool,
    tags: Vec<String>,
}

impl Hook {
    fn with_action(action: HookAction) -> Self {
        Self {
            action,
            priority: 0,
            condition: None,
            stop_on_error: true,
            tags: Vec::new(),
        }
    }

    /// Hook around a direct callback.
    pub fn callback<F>(callback: F) -> Self
    where
        F: Fn(&mut dyn StateHolder, &Context) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self::with_action(HookAction::Callback(Arc::new(callback)))
    }

    /// Hook around a named handler type (its `handle` method is invoked).
    pub fn handler(type_name: impl Into<String>) -> Self {
        Self::with_action(HookAction::Handler(type_name.into()))
    }

    /// Hook around a named handler type and method.
    pub fn handler_method(type_name: impl Into<String>, method: impl Into<String>) -> Self {
        Self::with_action(HookAction::HandlerMethod(type_name.into(), method.into()))
    }

    /// Protect hook requiring the given ability.
    pub fn authorize(ability: impl Into<String>) -> Self {
        Self::with_action(HookAction::Authorize(ability.into()))
    }

    /// Execution priority, 0 to 100. Higher runs first; clamped at 100.
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority.min(MAX_HOOK_PRIORITY);
        self
    }

    /// Gate execution on a runtime predicate. Absent means always run.
    pub fn when<F>(mut self, condition: F) -> Self
    where
        F: Fn(&dyn StateHolder, &Context) -> bool + Send + Sync + 'static,
    {
        self.condition = Some(Arc::new(condition));
        self
    }

    /// Report this hook's failures instead of aborting the pipeline.
    pub fn continue_on_error(mut self) -> Self {
        self.stop_on_error = false;
        self
    }

    /// Attach a free-form tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn action(&self) -> &HookAction {
        &self.action
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn stop_on_error(&self) -> bool {
        self.stop_on_error
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// The required ability, for protect hooks.
    pub fn ability(&self) -> Option<&str> {
        match &self.action {
            HookAction::Authorize(ability) => Some(ability),
            _ => None,
        }
    }

    /// Evaluate the runtime condition; hooks without one always run.
    pub fn should_run(&self, entity: &dyn StateHolder, context: &Context) -> bool {
        match &self.condition {
            Some(condition) => condition(entity, context),
            None => true,
        }
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("action", &self.action)
            .field("priority", &self.priority)
            .field("conditional", &self.condition.is_some())
            .field("stop_on_error", &self.stop_on_error)
            .field("tags", &self.tags)
            .finish()
    }
}
