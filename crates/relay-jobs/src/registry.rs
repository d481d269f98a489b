//! Handler registry: strongly-typed replacement for name-based reflection.
//!
//! A job request names a class and a method as strings. Instead of resolving
//! those through runtime reflection, every executable job class is a
//! [`Runnable`] registered here at startup. The registry is populated once
//! and immutable afterwards; the allow-list stays the security boundary on
//! top of it.

use crate::error::{JobError, JobResult};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Capability interface for an executable job class.
#[async_trait::async_trait]
pub trait Runnable: Send + Sync {
    /// Fully-qualified class identifier, e.g. `reports.DailySummary`.
    fn name(&self) -> &str;

    /// Methods this handler exposes for dispatch.
    fn methods(&self) -> &[&str];

    /// Invokes `method` with the given positional parameters.
    ///
    /// Returns an optional note for the audit success line. Implementations
    /// must return [`JobError::MethodNotFound`] for unknown methods rather
    /// than panicking.
    async fn invoke(&self, method: &str, parameters: &[Value]) -> JobResult<Option<String>>;
}

/// Immutable map from class identifier to handler.
#[derive(Default)]
pub struct JobRegistry {
    handlers: HashMap<String, Arc<dyn Runnable>>,
}

impl JobRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler under its own name. Later registrations replace
    /// earlier ones with the same name.
    pub fn register(&mut self, handler: Arc<dyn Runnable>) {
        self.handlers.insert(handler.name().to_string(), handler);
    }

    /// Looks up a handler by class identifier.
    #[must_use]
    pub fn get(&self, class_name: &str) -> Option<Arc<dyn Runnable>> {
        self.handlers.get(class_name).cloned()
    }

    /// Returns true if a handler is registered for the class.
    #[must_use]
    pub fn contains(&self, class_name: &str) -> bool {
        self.handlers.contains_key(class_name)
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if no handlers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Builds the standard "method not found" error for a handler.
#[must_use]
pub fn method_not_found(class: &str, method: &str) -> JobError {
    JobError::MethodNotFound {
        class: class.to_string(),
        method: method.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait::async_trait]
    impl Runnable for Echo {
        fn name(&self) -> &str {
            "test.Echo"
        }

        fn methods(&self) -> &[&str] {
            &["run"]
        }

        async fn invoke(&self, method: &str, parameters: &[Value]) -> JobResult<Option<String>> {
            match method {
                "run" => Ok(Some(format!("echoed {} params", parameters.len()))),
                other => Err(method_not_found(self.name(), other)),
            }
        }
    }

    #[tokio::test]
    async fn test_register_and_invoke() {
        let mut registry = JobRegistry::new();
        registry.register(Arc::new(Echo));

        assert!(registry.contains("test.Echo"));
        assert!(!registry.contains("test.Missing"));
        assert_eq!(registry.len(), 1);

        let handler = registry.get("test.Echo").unwrap();
        let note = handler.invoke("run", &[Value::Null]).await.unwrap();
        assert_eq!(note.as_deref(), Some("echoed 1 params"));
    }

    #[tokio::test]
    async fn test_unknown_method_is_rejected() {
        let handler = Echo;
        let err = handler.invoke("missing", &[]).await.unwrap_err();
        assert!(matches!(err, JobError::MethodNotFound { .. }));
    }
}
