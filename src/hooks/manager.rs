//! Hook execution.

use super::{Hook, HookAction, HookKey};
use crate::config::StateConfig;
use crate::core::Context;
use crate::entity::StateHolder;
use crate::error::{Error, Result};
use crate::hooks::handler::{HandlerCallError, HandlerResolver, HookHandler};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Executes the hooks registered on a configuration.
///
/// Buckets are sorted at construction: descending priority, declaration
/// order on ties. Execution honors each hook's runtime condition and
/// error policy.
pub struct HookManager {
    buckets: HashMap<HookKey, Vec<Hook>>,
    resolver: Option<Arc<dyn HandlerResolver>>,
}

impl HookManager {
    pub fn new(config: &StateConfig, resolver: Option<Arc<dyn HandlerResolver>>) -> Self {
        let mut buckets: HashMap<HookKey, Vec<Hook>> = HashMap::new();
        for (key, hooks) in config.hooks() {
            let mut bucket = hooks.clone();
            // Stable sort keeps declaration order for equal priorities.
            bucket.sort_by(|a, b| b.priority().cmp(&a.priority()));
            buckets.insert(key.clone(), bucket);
        }
        Self { buckets, resolver }
    }

    /// All hooks for a key, in execution order.
    pub fn hooks_for(&self, key: &HookKey) -> &[Hook] {
        self.buckets.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The highest-priority hook for a key, for introspection. Used to
    /// read a protect hook's required ability without executing anything.
    pub fn first(&self, key: &HookKey) -> Option<&Hook> {
        self.hooks_for(key).first()
    }

    pub fn has_hooks(&self, key: &HookKey) -> bool {
        !self.hooks_for(key).is_empty()
    }

    /// Run every hook registered under `key`.
    ///
    /// Hooks whose runtime condition returns false are skipped without
    /// side effect. A failing hook with `stop_on_error` aborts the rest of
    /// the bucket; one without has its failure logged and swallowed.
    /// Malformed hooks (unresolvable handler, missing method, protect hook
    /// in an executable bucket) always abort.
    pub fn execute(
        &self,
        key: &HookKey,
        entity: &mut dyn StateHolder,
        context: &Context,
    ) -> Result<()> {
        let Some(bucket) = self.buckets.get(key) else {
            return Ok(());
        };

        for hook in bucket {
            if !hook.should_run(entity, context) {
                continue;
            }

            match self.run_action(hook, entity, context) {
                Ok(()) => {}
                Err(RunError::Fatal(error)) => return Err(error),
                Err(RunError::Callback(cause)) => {
                    if hook.stop_on_error() {
                        return Err(Error::HookFailed {
                            key: key.to_string(),
                            cause,
                        });
                    }
                    warn!(hook = %key, error = %cause, "hook failed; continuing");
                }
            }
        }

        Ok(())
    }

    fn run_action(
        &self,
        hook: &Hook,
        entity: &mut dyn StateHolder,
        context: &Context,
    ) -> std::result::Result<(), RunError> {
        match hook.action() {
            HookAction::Callback(callback) => {
                callback(entity, context).map_err(RunError::Callback)
            }
            HookAction::Handler(type_name) => {
                let handler = self.resolve(type_name)?;
                handler.handle(entity, context).map_err(RunError::Callback)
            }
            HookAction::HandlerMethod(type_name, method) => {
                let handler = self.resolve(type_name)?;
                match handler.call(method, entity, context) {
                    Ok(()) => Ok(()),
                    Err(HandlerCallError::UnknownMethod) => {
                        Err(RunError::Fatal(Error::invalid_hook(format!(
                            "handler '{type_name}' does not expose method '{method}'"
                        ))))
                    }
                    Err(HandlerCallError::Failed(cause)) => Err(RunError::Callback(cause)),
                }
            }
            HookAction::Authorize(_) => Err(RunError::Fatal(Error::invalid_hook(
                "protect hooks declare an ability and cannot be executed",
            ))),
        }
    }

    fn resolve(&self, type_name: &str) -> std::result::Result<Arc<dyn HookHandler>, RunError> {
        let resolver = self.resolver.as_ref().ok_or_else(|| {
            RunError::Fatal(Error::invalid_hook(format!(
                "hook references handler '{type_name}' but no handler resolver is configured"
            )))
        })?;
        resolver.resolve(type_name).ok_or_else(|| {
            RunError::Fatal(Error::invalid_hook(format!(
                "unknown hook handler '{type_name}'"
            )))
        })
    }
}

enum RunError {
    /// Configuration problem; propagates regardless of error policy.
    Fatal(Error),
    /// The hook itself failed; subject to `stop_on_error`.
    Callback(crate::error::BoxError),
}
