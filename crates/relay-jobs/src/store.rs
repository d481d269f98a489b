//! Job store trait and query types.

use crate::error::JobResult;
use crate::record::{EventKind, JobEvent, JobRecord, JobRequest, JobStatus};
use async_trait::async_trait;
use relay_core::{JobId, RequestId};

/// Search query over historical job records.
///
/// Backs the external job-list view; dispatch logic never searches.
#[derive(Debug, Clone)]
pub struct JobSearchQuery {
    /// Filter by status.
    pub status: Option<JobStatus>,

    /// Filter by class name (exact match).
    pub class_name: Option<String>,

    /// Pagination offset.
    pub offset: u32,

    /// Pagination limit.
    pub limit: u32,
}

impl Default for JobSearchQuery {
    fn default() -> Self {
        Self {
            status: None,
            class_name: None,
            offset: 0,
            limit: 50,
        }
    }
}

impl JobSearchQuery {
    /// Create a new search query with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by status.
    #[must_use]
    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Filter by class name.
    #[must_use]
    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    /// Set pagination.
    #[must_use]
    pub fn paginate(mut self, offset: u32, limit: u32) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }
}

/// Durable store for job records and their structured audit events.
///
/// Every `mark_*` transition is an idempotent no-op when called on a record
/// that already reached a terminal status; terminal states never regress.
/// The store is assumed to tolerate concurrent writers across independent
/// processes; no two processes mutate the same record.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Inserts a new record for the request with status `pending` and
    /// `scheduled_at = now`.
    async fn create(&self, request: &JobRequest) -> JobResult<JobRecord>;

    /// Transitions the record to `started` and stamps `started_at`.
    async fn mark_started(&self, record: &mut JobRecord) -> JobResult<()>;

    /// Transitions the record to `completed` and stamps `completed_at`.
    async fn mark_completed(&self, record: &mut JobRecord) -> JobResult<()>;

    /// Transitions the record to `failed`, stamps `completed_at`, and stores
    /// the failure reason.
    async fn mark_failed(&self, record: &mut JobRecord, reason: &str) -> JobResult<()>;

    /// Appends a structured audit event for the job. Append-only.
    async fn append_event(&self, job_id: JobId, kind: EventKind, message: &str) -> JobResult<()>;

    /// Fetches a record by ID.
    async fn get(&self, id: JobId) -> JobResult<Option<JobRecord>>;

    /// Lists every attempt of one logical request, oldest first.
    async fn list_for_request(&self, request_id: RequestId) -> JobResult<Vec<JobRecord>>;

    /// Lists the structured events for one job, oldest first.
    async fn list_events(&self, job_id: JobId) -> JobResult<Vec<JobEvent>>;

    /// Searches historical records, newest first.
    async fn search(&self, query: &JobSearchQuery) -> JobResult<Vec<JobRecord>>;
}
