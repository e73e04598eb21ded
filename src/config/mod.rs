//! State configuration.
//!
//! A [`StateConfig`] declares the state graph for one entity type and
//! property: the state set, the transition map, registered hooks, and an
//! optional history-tracking policy. Configurations are built fluently,
//! then frozen with [`finalize`](StateConfig::finalize); any mutation
//! afterwards fails with [`Error::ConfigurationFrozen`].
//!
//! Every configuration carries two synthetic bootstrap entries the host
//! cannot remove: the `instantiated` state and the `init` transition from
//! it to the declared initial state. They guarantee that a freshly created
//! entity always has a well-defined path into the graph.

use crate::core::{Metadata, State, Transition};
use crate::error::{Error, Result};
use crate::hooks::{Hook, HookCategory, HookKey};
use std::collections::HashMap;

/// Synthetic bootstrap state every configuration contains.
pub const INSTANTIATED: &str = "instantiated";

/// Synthetic bootstrap transition from [`INSTANTIATED`] to the initial state.
pub const INIT: &str = "init";

/// Per-configuration history-tracking override.
///
/// When present, takes precedence over the process-wide setting.
#[derive(Clone, Debug, Default)]
pub struct HistoryPolicy {
    pub enabled: bool,
    /// Backend-specific options, passed through to the repository.
    pub options: Metadata,
}

impl HistoryPolicy {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            options: Metadata::new(),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn with_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }
}

/// Declarative state graph for one entity type and property.
///
/// # Example
///
/// ```rust
/// use statecraft::{StateConfig, Transition, INIT, INSTANTIATED};
///
/// fn build() -> statecraft::Result<StateConfig> {
///     let mut config = StateConfig::new("draft");
///     config.add_states(["draft", "pending_review"])?;
///     config.set_transition(
///         "submit",
///         Transition::new().from("draft").to("pending_review"),
///     )?;
///     Ok(config)
/// }
///
/// let config = build().unwrap();
/// assert_eq!(config.states()[0].name(), INSTANTIATED);
/// assert_eq!(config.transition_names()[0], INIT);
/// assert_eq!(config.initial_state(), "draft");
/// ```
#[derive(Debug)]
pub struct StateConfig {
    initial_state: String,
    states: Vec<State>,
    transitions: Vec<(String, Transition)>,
    hooks: HashMap<HookKey, Vec<Hook>>,
    history: Option<HistoryPolicy>,
    finalized: bool,
}

impl StateConfig {
    /// Create a configuration with the given initial state.
    ///
    /// The bootstrap entries are present from the start: `instantiated`
    /// leads the state set and `init` leads the transition map.
    pub fn new(initial_state: impl Into<String>) -> Self {
        let initial_state = initial_state.into();
        let mut states = vec![State::new(INSTANTIATED)];
        if initial_state != INSTANTIATED {
            states.push(State::new(initial_state.clone()).mark_initial());
        }
        let transitions = vec![(
            INIT.to_string(),
            Transition::new().from(INSTANTIATED).to(initial_state.clone()),
        )];
        Self {
            initial_state,
            states,
            transitions,
            hooks: HashMap::new(),
            history: None,
            finalized: false,
        }
    }

    pub fn initial_state(&self) -> &str {
        &self.initial_state
    }

    /// The full state set, bootstrap state first, declaration order after.
    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn state(&self, name: &str) -> Option<&State> {
        self.states.iter().find(|s| s.is(name))
    }

    pub fn state_names(&self) -> Vec<&str> {
        self.states.iter().map(State::name).collect()
    }

    /// The full transition map, bootstrap transition first, declaration
    /// order after.
    pub fn transitions(&self) -> impl Iterator<Item = (&str, &Transition)> {
        self.transitions.iter().map(|(name, t)| (name.as_str(), t))
    }

    pub fn transition(&self, name: &str) -> Option<&Transition> {
        self.transitions
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }

    pub fn transition_names(&self) -> Vec<&str> {
        self.transitions.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn hooks(&self) -> &HashMap<HookKey, Vec<Hook>> {
        &self.hooks
    }

    pub fn history_tracking(&self) -> Option<&HistoryPolicy> {
        self.history.as_ref()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Freeze the configuration. Idempotent.
    pub fn finalize(&mut self) -> &mut Self {
        self.finalized = true;
        self
    }

    /// Declare a state. Redeclaring a name replaces its descriptor in
    /// place; the initial flag always tracks the configured initial state.
    pub fn add_state(&mut self, state: State) -> Result<&mut Self> {
        self.ensure_open()?;
        if state.name().is_empty() {
            return Err(Error::configuration("state name cannot be empty"));
        }
        let mut state = state;
        state.set_initial(state.is(&self.initial_state));
        match self.states.iter_mut().find(|s| s.is(state.name())) {
            Some(existing) => *existing = state,
            None => self.states.push(state),
        }
        Ok(self)
    }

    /// Declare several plain states at once.
    pub fn add_states<I, S>(&mut self, names: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.add_state(State::new(name))?;
        }
        Ok(self)
    }

    /// Declare a named transition. The `init` name is reserved for the
    /// bootstrap transition; redeclaring any other name replaces it.
    pub fn set_transition(
        &mut self,
        name: impl Into<String>,
        transition: Transition,
    ) -> Result<&mut Self> {
        self.ensure_open()?;
        let name = name.into();
        if name.is_empty() {
            return Err(Error::configuration("transition name cannot be empty"));
        }
        if name == INIT {
            return Err(Error::configuration(format!(
                "'{INIT}' is a reserved transition name"
            )));
        }
        if transition.target().is_empty() {
            return Err(Error::configuration(format!(
                "transition '{name}' has no target state"
            )));
        }
        match self.transitions.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = transition,
            None => self.transitions.push((name, transition)),
        }
        Ok(self)
    }

    /// Register a hook under an explicit (category, target) key.
    pub fn add_hook(&mut self, key: HookKey, hook: Hook) -> Result<&mut Self> {
        self.ensure_open()?;
        self.hooks.entry(key).or_default().push(hook);
        Ok(self)
    }

    /// Hook running before the named transition.
    pub fn before_transition(&mut self, transition: &str, hook: Hook) -> Result<&mut Self> {
        self.add_hook(HookCategory::BeforeTransition.key(transition), hook)
    }

    /// Hook running after the named transition.
    pub fn after_transition(&mut self, transition: &str, hook: Hook) -> Result<&mut Self> {
        self.add_hook(HookCategory::AfterTransition.key(transition), hook)
    }

    /// Hook running before the named state is entered.
    pub fn before_enter(&mut self, state: &str, hook: Hook) -> Result<&mut Self> {
        self.add_hook(HookCategory::BeforeEnter.key(state), hook)
    }

    /// Hook running after the named state is entered.
    pub fn after_enter(&mut self, state: &str, hook: Hook) -> Result<&mut Self> {
        self.add_hook(HookCategory::AfterEnter.key(state), hook)
    }

    /// Hook running before the named state is left.
    pub fn before_leave(&mut self, state: &str, hook: Hook) -> Result<&mut Self> {
        self.add_hook(HookCategory::BeforeLeave.key(state), hook)
    }

    /// Hook running after the named state is left.
    pub fn after_leave(&mut self, state: &str, hook: Hook) -> Result<&mut Self> {
        self.add_hook(HookCategory::AfterLeave.key(state), hook)
    }

    /// Require an ability before the named transition may run.
    pub fn protect_transition(&mut self, transition: &str, ability: &str) -> Result<&mut Self> {
        self.add_hook(HookCategory::Protect.key(transition), Hook::authorize(ability))
    }

    /// Override the process-wide history-tracking setting.
    pub fn track_history(&mut self, policy: HistoryPolicy) -> Result<&mut Self> {
        self.ensure_open()?;
        self.history = Some(policy);
        Ok(self)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.finalized {
            Err(Error::ConfigurationFrozen)
        } else {
            Ok(())
        }
    }
}
