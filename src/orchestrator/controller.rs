//! Dispatch and completion controller.
//!
//! Owns the registry for the lifetime of the process and emits every outcome
//! to the output sink injected at construction.

use crate::config::Config;
use crate::engine::{ExecutionHandle, Executor};
use crate::error::{ControllerError, Result};
use crate::model::{DispatchEvent, ExecutionId};
use crate::registry::Registry;
use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

pub(crate) struct Controller {
    registry: Arc<Registry>,
    executor: Executor,
    next_id: AtomicU64,
    event_tx: UnboundedSender<DispatchEvent>,
}

impl Controller {
    /// Build a controller scheduling onto the current tokio runtime.
    pub(crate) fn new(
        registry: Arc<Registry>,
        config: &Config,
        event_tx: UnboundedSender<DispatchEvent>,
    ) -> Result<Self> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ControllerError::Runtime(e.to_string()))?;
        let executor = Executor::new(
            runtime,
            config.max_concurrent,
            config.execution_timeout,
            event_tx.clone(),
        );
        Ok(Self {
            registry,
            executor,
            next_id: AtomicU64::new(1),
            event_tx,
        })
    }

    pub(crate) fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Resolve `tokens[0]` and schedule it with the remaining tokens as
    /// arguments. Returns as soon as the execution is scheduled.
    ///
    /// Malformed requests and unknown commands are reported to the sink and
    /// returned as errors; nothing is executed for them.
    pub(crate) fn dispatch<S: AsRef<str>>(&self, tokens: &[S]) -> Result<ExecutionHandle> {
        let Some((name, args)) = tokens.split_first() else {
            return Err(self.reject_invalid("empty request"));
        };
        let name = name.as_ref();
        if name.is_empty() {
            return Err(self.reject_invalid("empty command name"));
        }

        let Some(handler) = self.registry.lookup(name) else {
            debug!(command = %name, "unknown command");
            let _ = self.event_tx.send(DispatchEvent::UnknownCommand {
                name: name.to_string(),
            });
            return Err(ControllerError::UnknownCommand(name.to_string()));
        };

        let id = ExecutionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let args: Vec<String> = args.iter().map(|a| a.as_ref().to_string()).collect();
        debug!(%id, command = %name, args = args.len(), "scheduling execution");
        Ok(self.executor.spawn(id, handler, args))
    }

    /// Suggestions from every registered handler for `prefix`, with
    /// duplicates removed in first-occurrence order.
    ///
    /// A handler whose completion fails or panics contributes nothing.
    pub(crate) fn autocomplete(&self, prefix: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut suggestions = Vec::new();

        for handler in self.registry.all() {
            let completed = match catch_unwind(AssertUnwindSafe(|| handler.complete(prefix))) {
                Ok(Ok(items)) => items,
                Ok(Err(e)) => {
                    let error = format!("{e:#}");
                    warn!(command = %handler.name(), %error, "completion failed");
                    continue;
                }
                Err(_) => {
                    warn!(command = %handler.name(), "completion panicked");
                    continue;
                }
            };
            for item in completed {
                if seen.insert(item.clone()) {
                    suggestions.push(item);
                }
            }
        }

        suggestions
    }

    fn reject_invalid(&self, reason: &str) -> ControllerError {
        let _ = self.event_tx.send(DispatchEvent::InvalidInput {
            reason: reason.to_string(),
        });
        ControllerError::invalid_input(reason)
    }
}
