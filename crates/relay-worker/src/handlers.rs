//! Built-in job handlers registered at worker startup.
//!
//! Application-specific jobs implement [`Runnable`] and get added to
//! [`build_registry`]. Registration alone does not make a job executable;
//! its class name must also be on the configured allow-list.

use relay_jobs::registry::method_not_found;
use relay_jobs::{JobRegistry, JobResult, Runnable};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Demonstration job that logs its parameters.
pub struct ExampleJob;

#[async_trait::async_trait]
impl Runnable for ExampleJob {
    fn name(&self) -> &str {
        "demo.ExampleJob"
    }

    fn methods(&self) -> &[&str] {
        &["run"]
    }

    async fn invoke(&self, method: &str, parameters: &[Value]) -> JobResult<Option<String>> {
        match method {
            "run" => {
                info!(?parameters, "ExampleJob running");
                Ok(Some(format!("processed {} parameters", parameters.len())))
            }
            other => Err(method_not_found(self.name(), other)),
        }
    }
}

/// Liveness probe job; useful for verifying the dispatch pipeline end to end.
pub struct Heartbeat;

#[async_trait::async_trait]
impl Runnable for Heartbeat {
    fn name(&self) -> &str {
        "ops.Heartbeat"
    }

    fn methods(&self) -> &[&str] {
        &["ping"]
    }

    async fn invoke(&self, method: &str, _parameters: &[Value]) -> JobResult<Option<String>> {
        match method {
            "ping" => Ok(Some("pong".to_string())),
            other => Err(method_not_found(self.name(), other)),
        }
    }
}

/// Builds the registry of every job class this worker can execute.
#[must_use]
pub fn build_registry() -> JobRegistry {
    let mut registry = JobRegistry::new();
    registry.register(Arc::new(ExampleJob));
    registry.register(Arc::new(Heartbeat));
    registry
}
