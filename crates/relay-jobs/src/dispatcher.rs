//! Job dispatcher: validate, execute, retry-or-stop.

use crate::audit::AuditSink;
use crate::error::JobResult;
use crate::launcher::ProcessLauncher;
use crate::record::JobRequest;
use crate::registry::JobRegistry;
use crate::retry::RetryPolicy;
use crate::store::JobStore;
use crate::validator::{AllowList, Rejection, Validator};
use std::sync::Arc;
use tracing::{info, warn};

/// Terminal outcome of one dispatch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The job body completed successfully.
    Succeeded,
    /// The job failed and a retry process was spawned.
    FailedRetryable,
    /// The job failed with no further retry: a rejection, or the ceiling
    /// was reached.
    FailedTerminal,
}

/// Orchestrates one execution attempt inside the current process.
///
/// The run is a single synchronous sequence: create the record, validate,
/// execute, and on failure hand the next attempt to the process launcher.
/// Concurrency across retries comes from process boundaries alone.
pub struct Dispatcher {
    store: Arc<dyn JobStore>,
    audit: Arc<dyn AuditSink>,
    registry: Arc<JobRegistry>,
    launcher: Arc<dyn ProcessLauncher>,
    validator: Validator,
    policy: RetryPolicy,
}

impl Dispatcher {
    /// Creates a dispatcher over its collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn JobStore>,
        audit: Arc<dyn AuditSink>,
        registry: Arc<JobRegistry>,
        launcher: Arc<dyn ProcessLauncher>,
        allow_list: AllowList,
        policy: RetryPolicy,
    ) -> Self {
        let validator = Validator::new(allow_list, registry.clone());
        Self {
            store,
            audit,
            registry,
            launcher,
            validator,
            policy,
        }
    }

    /// Runs one execution attempt for the request.
    ///
    /// Every fault raised by the job body is caught at this boundary; it is
    /// always reflected in the record and the audit trail before the method
    /// returns. Errors escape only for infrastructure faults (the store
    /// itself failing).
    pub async fn run(&self, request: &JobRequest) -> JobResult<DispatchOutcome> {
        let class = &request.class_name;
        let method = &request.method_name;

        let mut record = self.store.create(request).await?;
        self.store.mark_started(&mut record).await?;
        self.audit
            .record_success(class, method, Some("job started"), Some(&record))
            .await;

        info!(
            job_id = %record.id,
            request_id = %record.request_id,
            class = %class,
            method = %method,
            retry_count = request.retry_count,
            "Job started"
        );

        // Rejections are terminal: retries exist for transient execution
        // errors, never for configuration or security errors.
        if let Err(rejection) = self.validator.approve(class, method) {
            let detail = rejection.into_error(class, method).to_string();
            self.store
                .mark_failed(&mut record, rejection.record_reason())
                .await?;
            self.audit
                .record_failure(class, method, &detail, Some(&record))
                .await;
            warn!(job_id = %record.id, class = %class, method = %method, "Job rejected: {}", detail);
            return Ok(DispatchOutcome::FailedTerminal);
        }

        // The validator guarantees the handler exists.
        let Some(handler) = self.registry.get(class) else {
            self.store
                .mark_failed(&mut record, Rejection::ClassNotFound.record_reason())
                .await?;
            self.audit
                .record_failure(class, method, "handler disappeared after validation", Some(&record))
                .await;
            return Ok(DispatchOutcome::FailedTerminal);
        };

        match handler.invoke(method, &request.parameters).await {
            Ok(note) => {
                self.store.mark_completed(&mut record).await?;
                self.audit
                    .record_success(class, method, note.as_deref(), Some(&record))
                    .await;
                info!(job_id = %record.id, class = %class, method = %method, "Job completed");
                Ok(DispatchOutcome::Succeeded)
            }
            Err(err) => {
                let detail = err.to_string();
                self.audit
                    .record_failure(class, method, &detail, Some(&record))
                    .await;
                self.store
                    .mark_failed(&mut record, &err.record_reason())
                    .await?;
                warn!(
                    job_id = %record.id,
                    class = %class,
                    method = %method,
                    retry_count = request.retry_count,
                    "Job failed: {}",
                    detail
                );

                if !self.policy.should_retry(request.retry_count) {
                    info!(
                        job_id = %record.id,
                        class = %class,
                        method = %method,
                        "Retry ceiling reached, giving up"
                    );
                    return Ok(DispatchOutcome::FailedTerminal);
                }

                let next = request.next_attempt();
                if let Err(spawn_err) = self.launcher.spawn_retry(&next).await {
                    warn!(
                        job_id = %record.id,
                        class = %class,
                        method = %method,
                        "Failed to schedule retry: {}",
                        spawn_err
                    );
                    self.audit
                        .record_failure(
                            class,
                            method,
                            &format!("failed to schedule retry: {spawn_err}"),
                            Some(&record),
                        )
                        .await;
                    return Ok(DispatchOutcome::FailedTerminal);
                }

                Ok(DispatchOutcome::FailedRetryable)
            }
        }
    }
}
