//! Dual audit trail: append-only log file plus structured store events.
//!
//! Auditing is a best-effort side effect. A failure to write the trail must
//! never abort or mask the job outcome, so nothing here returns an error to
//! the caller; write failures are reported through `tracing` only.

use crate::record::{EventKind, JobRecord};
use crate::store::JobStore;
use async_trait::async_trait;
use chrono::Utc;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// Sink for audit entries emitted on every significant job event.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Appends a `SUCCESS: Class::method[ - note]` line; with a job, also
    /// persists a structured success event referencing it.
    async fn record_success(
        &self,
        class_name: &str,
        method_name: &str,
        note: Option<&str>,
        job: Option<&JobRecord>,
    );

    /// Appends a `FAILURE: Class::method - error` line; with a job, also
    /// persists a structured failure event referencing it.
    async fn record_failure(
        &self,
        class_name: &str,
        method_name: &str,
        error: &str,
        job: Option<&JobRecord>,
    );
}

/// File-backed audit sink with optional structured events.
///
/// Line format: `[YYYY-MM-DD HH:MM:SS] SUCCESS|FAILURE: Class::method - detail`.
/// Consumers needing structured data must read the job store instead.
pub struct FileAuditSink {
    log_path: PathBuf,
    store: Option<Arc<dyn JobStore>>,
}

impl FileAuditSink {
    /// Creates a sink writing to the given log file, without structured events.
    ///
    /// Used during process bootstrap, before the store is available.
    #[must_use]
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
            store: None,
        }
    }

    /// Attaches a store so entries tied to a job also land in `job_events`.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn JobStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Returns the log file path.
    #[must_use]
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    fn write_line(&self, message: &str) {
        if let Err(e) = self.try_write_line(message) {
            warn!("Failed to write audit log line: {}", e);
        }
    }

    fn try_write_line(&self, message: &str) -> std::io::Result<()> {
        if let Some(dir) = self.log_path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                std::fs::create_dir_all(dir)?;
            }
        }

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;

        let stamp = Utc::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(file, "[{stamp}] {message}")
    }

    async fn append_event(&self, job: &JobRecord, kind: EventKind, message: &str) {
        let Some(store) = &self.store else {
            return;
        };

        if let Err(e) = store.append_event(job.id, kind, message).await {
            warn!(job_id = %job.id, "Failed to persist audit event: {}", e);
        }
    }
}

#[async_trait]
impl AuditSink for FileAuditSink {
    async fn record_success(
        &self,
        class_name: &str,
        method_name: &str,
        note: Option<&str>,
        job: Option<&JobRecord>,
    ) {
        let line = match note {
            Some(note) => format!("SUCCESS: {class_name}::{method_name} - {note}"),
            None => format!("SUCCESS: {class_name}::{method_name}"),
        };
        self.write_line(&line);

        if let Some(job) = job {
            let message = note.unwrap_or("Job executed successfully");
            self.append_event(job, EventKind::Success, message).await;
        }
    }

    async fn record_failure(
        &self,
        class_name: &str,
        method_name: &str,
        error: &str,
        job: Option<&JobRecord>,
    ) {
        self.write_line(&format!("FAILURE: {class_name}::{method_name} - {error}"));

        if let Some(job) = job {
            self.append_event(job, EventKind::Failure, error).await;
        }
    }
}
