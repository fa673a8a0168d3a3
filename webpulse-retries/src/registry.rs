//! Registry for looking up retry handlers by name.
//!
//! Requests name the handlers they want consulted; the registry resolves
//! those names when a call fails. It is shared by every call made through a
//! client and can be extended while requests are in flight.

use crate::handler::RetryHandler;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Shared handle to a retry handler.
pub type BoxedRetryHandler = Arc<dyn RetryHandler>;

/// Registry mapping names to retry handlers.
#[derive(Default)]
pub struct RetryHandlerRegistry {
    handlers: RwLock<HashMap<String, BoxedRetryHandler>>,
}

impl RetryHandlerRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a handler under `name`, replacing any previous one.
    pub fn register(&self, name: impl Into<String>, handler: impl RetryHandler + 'static) {
        self.register_arc(name, Arc::new(handler));
    }

    /// Register a shared handler under `name`, replacing any previous one.
    pub fn register_arc(&self, name: impl Into<String>, handler: BoxedRetryHandler) {
        let name = name.into();
        let replaced = self.handlers.write().insert(name.clone(), handler).is_some();
        if replaced {
            tracing::debug!(handler = %name, "Replaced retry handler");
        }
    }

    /// Register a handler under its own name.
    pub fn register_handler(&self, handler: impl RetryHandler + 'static) {
        let name = handler.name().to_string();
        self.register(name, handler);
    }

    /// Get a handler by name.
    pub fn get(&self, name: &str) -> Option<BoxedRetryHandler> {
        self.handlers.read().get(name).cloned()
    }

    /// Check if a handler exists.
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.read().contains_key(name)
    }

    /// List all registered handler names.
    pub fn names(&self) -> Vec<String> {
        self.handlers.read().keys().cloned().collect()
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }
}

impl fmt::Debug for RetryHandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = self.names();
        names.sort();
        f.debug_struct("RetryHandlerRegistry")
            .field("handlers", &names)
            .finish()
    }
}
