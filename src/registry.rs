//! Name to handler mapping.
//!
//! [`Registry`] keeps handlers behind a read-write lock so concurrent
//! dispatches can look them up while registration stays possible. Handlers
//! are handed out as `Arc`s and are never called while the lock is held.

use crate::error::{ControllerError, Result};
use crate::handler::Handler;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Default)]
pub struct Registry {
    handlers: RwLock<BTreeMap<String, Arc<dyn Handler>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under its own name.
    ///
    /// A handler already registered under the same name is replaced; the
    /// return value tells whether that happened.
    pub fn register<H: Handler + 'static>(&self, handler: H) -> Result<bool> {
        self.register_shared(Arc::new(handler))
    }

    /// Same as [`Registry::register`] for an already shared handler.
    pub fn register_shared(&self, handler: Arc<dyn Handler>) -> Result<bool> {
        let name = handler.name().to_string();
        validate_name(&name)?;

        let replaced = self.handlers.write().insert(name.clone(), handler).is_some();
        if replaced {
            debug!(command = %name, "replaced registered handler");
        } else {
            debug!(command = %name, "registered handler");
        }
        Ok(replaced)
    }

    /// Exact-match lookup.
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.read().get(name).cloned()
    }

    /// Snapshot of every registered handler, ordered by name.
    pub fn all(&self) -> Vec<Arc<dyn Handler>> {
        self.handlers.read().values().cloned().collect()
    }

    /// Registered names, ordered.
    pub fn names(&self) -> Vec<String> {
        self.handlers.read().keys().cloned().collect()
    }
}

/// Names are matched against the first whitespace-separated token, so a name
/// must be non-empty and contain no whitespace.
fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ControllerError::invalid_handler("handler name is empty"));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(ControllerError::invalid_handler(format!(
            "handler name `{}` contains whitespace",
            name
        )));
    }
    Ok(())
}
