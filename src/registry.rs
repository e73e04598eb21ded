//! Configuration-to-entity binding.
//!
//! The [`Registry`] owns everything the engine shares across entities:
//! named configuration factories, (entity type, property) bindings, the
//! memoized built configurations, the per-entity manager state cache, the
//! authorizer, and the optional history repository. Its lifetime is owned
//! by whatever composes the system; there is no process-wide singleton.
//!
//! Registration is an initialization-phase activity: once concurrent use
//! begins, built configurations are read-only and shared.

use crate::auth::Authorizer;
use crate::config::{StateConfig, INIT, INSTANTIATED};
use crate::core::Context;
use crate::entity::StateHolder;
use crate::error::{Error, Result};
use crate::history::HistoryRepository;
use crate::hooks::HandlerResolver;
use crate::manager::{ManagerParts, ManagerState, StateManager};
use crate::settings::EngineSettings;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

type ConfigFactory = Box<dyn Fn() -> Result<StateConfig> + Send + Sync>;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct ManagerKey {
    entity_type: String,
    entity_id: String,
    property: String,
}

/// Owns state configurations and produces bound [`StateManager`] sessions.
pub struct Registry {
    settings: EngineSettings,
    authorizer: Arc<Authorizer>,
    history: Option<Arc<dyn HistoryRepository>>,
    resolver: Option<Arc<dyn HandlerResolver>>,
    factories: HashMap<String, ConfigFactory>,
    bindings: HashMap<String, HashMap<String, String>>,
    configs: HashMap<String, Arc<StateConfig>>,
    managers: HashMap<ManagerKey, ManagerState>,
}

impl Registry {
    pub fn new() -> Self {
        Self::with_settings(EngineSettings::default())
    }

    /// Compose a registry from engine settings; the authorizer starts from
    /// the configured default mode.
    pub fn with_settings(settings: EngineSettings) -> Self {
        let authorizer = Arc::new(Authorizer::new(settings.default_authorization));
        Self {
            settings,
            authorizer,
            history: None,
            resolver: None,
            factories: HashMap::new(),
            bindings: HashMap::new(),
            configs: HashMap::new(),
            managers: HashMap::new(),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn authorizer(&self) -> &Authorizer {
        &self.authorizer
    }

    /// Replace the authorizer. Gates and policies are registered on an
    /// [`Authorizer`] before it is installed here.
    pub fn set_authorizer(&mut self, authorizer: Authorizer) -> &mut Self {
        self.authorizer = Arc::new(authorizer);
        self
    }

    /// Install the history repository collaborator.
    pub fn set_history(&mut self, repository: Arc<dyn HistoryRepository>) -> &mut Self {
        self.history = Some(repository);
        self
    }

    pub fn history(&self) -> Option<&Arc<dyn HistoryRepository>> {
        self.history.as_ref()
    }

    /// Install the resolver backing name-addressed hooks.
    pub fn set_handler_resolver(&mut self, resolver: Arc<dyn HandlerResolver>) -> &mut Self {
        self.resolver = Some(resolver);
        self
    }

    /// Associate a named configuration type with a factory building it.
    ///
    /// Re-registering a type drops its memoized configuration.
    pub fn register_state_config<F>(&mut self, config_type: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<StateConfig> + Send + Sync + 'static,
    {
        let config_type = config_type.into();
        self.configs.remove(&config_type);
        self.factories.insert(config_type, Box::new(factory));
    }

    pub fn has_state_config(&self, config_type: &str) -> bool {
        self.factories.contains_key(config_type)
    }

    /// Bind an entity type and property to a registered configuration
    /// type.
    pub fn register_state_management(
        &mut self,
        entity_type: impl Into<String>,
        property: impl Into<String>,
        config_type: impl Into<String>,
    ) -> Result<()> {
        let config_type = config_type.into();
        if !self.factories.contains_key(&config_type) {
            return Err(Error::UnknownConfigType { config_type });
        }
        self.bindings
            .entry(entity_type.into())
            .or_default()
            .insert(property.into(), config_type);
        Ok(())
    }

    /// Build (or fetch the memoized) configuration for a type. The
    /// configuration is finalized before it is shared.
    pub fn config_for_type(&mut self, config_type: &str) -> Result<Arc<StateConfig>> {
        if let Some(config) = self.configs.get(config_type) {
            return Ok(Arc::clone(config));
        }
        let factory = self
            .factories
            .get(config_type)
            .ok_or_else(|| Error::UnknownConfigType {
                config_type: config_type.to_string(),
            })?;
        let mut config = factory()?;
        config.finalize();
        let config = Arc::new(config);
        self.configs
            .insert(config_type.to_string(), Arc::clone(&config));
        Ok(config)
    }

    /// Produce a manager session bound to the entity and property.
    ///
    /// The first access for a newly created entity (stored state absent or
    /// empty) boots it through the `init` transition before the session is
    /// returned. Repeated access continues the same cached in-memory view.
    pub fn manager_for<'a, E: StateHolder>(
        &'a mut self,
        entity: &'a mut E,
        property: &str,
    ) -> Result<StateManager<'a, E>> {
        let entity_type = entity.entity_type().to_string();
        let config_type = self
            .bindings
            .get(&entity_type)
            .and_then(|properties| properties.get(property))
            .cloned()
            .ok_or_else(|| Error::NotRegistered {
                entity_type: entity_type.clone(),
                property: property.to_string(),
            })?;

        let config = self.config_for_type(&config_type)?;
        let track_history = config
            .history_tracking()
            .map(|policy| policy.enabled)
            .unwrap_or(self.settings.history.enabled);
        if track_history && self.history.is_none() {
            warn!(
                entity_type = %entity_type,
                property,
                "history tracking enabled but no repository is installed"
            );
        }

        let parts = ManagerParts {
            property: property.to_string(),
            config,
            authorizer: Arc::clone(&self.authorizer),
            history: self.history.clone(),
            resolver: self.resolver.clone(),
            track_history: track_history && self.history.is_some(),
        };

        let key = ManagerKey {
            entity_type,
            entity_id: entity.entity_id(),
            property: property.to_string(),
        };

        match self.managers.entry(key) {
            Entry::Occupied(entry) => Ok(StateManager::bind(entity, entry.into_mut(), parts)),
            Entry::Vacant(entry) => {
                let stored = entity.get_state(property).filter(|s| !s.is_empty());
                let fresh = stored.is_none();
                let mut state =
                    ManagerState::new(stored.unwrap_or_else(|| INSTANTIATED.to_string()));
                if fresh {
                    let mut boot = StateManager::bind(&mut *entity, &mut state, parts.clone());
                    boot.transition(INIT, &Context::new())?;
                }
                Ok(StateManager::bind(entity, entry.insert(state), parts))
            }
        }
    }

    /// Operator maintenance surface: prune durable history.
    ///
    /// An explicit retention overrides the configured default; with
    /// neither, or without a repository, nothing is deleted.
    pub fn prune_history(&self, retention_days: Option<u32>) -> Result<usize> {
        let Some(days) = retention_days.or(self.settings.history.retention_days) else {
            return Ok(0);
        };
        match &self.history {
            Some(repository) => repository.prune(days),
            None => Ok(0),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
