//! Job record and request definitions.

use chrono::{DateTime, Utc};
use relay_core::{JobId, RequestId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Job status enumeration.
///
/// Transitions are monotonic along `pending -> started -> {completed | failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Record created, execution not started.
    Pending,
    /// Execution in progress.
    Started,
    /// Execution finished successfully.
    Completed,
    /// Execution failed or was rejected.
    Failed,
}

impl JobStatus {
    /// Returns the status as the string stored in the database.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Started => "started",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Returns true if the status is terminal.
    ///
    /// Terminal records must never regress to an earlier state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "started" => Ok(JobStatus::Started),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// One durable record per execution attempt.
///
/// Each retry of a logical request creates its own record; the chain shares
/// a `request_id`. A record is owned by the process that created it and is
/// mutated only through the store's `mark_*` operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    /// Record ID, assigned at creation.
    pub id: JobId,

    /// Correlation ID shared by every attempt of one logical request.
    pub request_id: RequestId,

    /// Fully-qualified job class identifier.
    pub class_name: String,

    /// Method invoked on the handler.
    pub method_name: String,

    /// Positional JSON parameters.
    pub parameters: Vec<Value>,

    /// Current status.
    pub status: JobStatus,

    /// Retry number of this attempt (0 for the initial dispatch).
    pub retry_count: u32,

    /// Stored for external queries; unused by dispatch logic.
    pub priority: i64,

    /// When the attempt was scheduled.
    pub scheduled_at: DateTime<Utc>,

    /// Set when the attempt starts executing.
    pub started_at: Option<DateTime<Utc>>,

    /// Set when the attempt reaches a terminal status.
    pub completed_at: Option<DateTime<Utc>>,

    /// Failure reason for failed records.
    pub error_message: Option<String>,

    /// Row bookkeeping.
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// Returns true if the record is in a terminal status.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Kind of a structured audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Success,
    Failure,
}

impl EventKind {
    /// Returns the kind as the string stored in the database.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            EventKind::Success => "success",
            EventKind::Failure => "failure",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured audit entry tied to one job record. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEvent {
    pub id: i64,
    pub job_id: JobId,
    pub kind: EventKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// One request to execute a job, as carried across the process boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequest {
    /// Correlation ID for the whole retry chain.
    pub request_id: RequestId,

    /// Fully-qualified job class identifier.
    pub class_name: String,

    /// Method to invoke on the handler.
    pub method_name: String,

    /// Positional JSON parameters.
    pub parameters: Vec<Value>,

    /// Retry number of this attempt (0 for the initial dispatch).
    pub retry_count: u32,
}

impl JobRequest {
    /// Creates an initial request with a fresh correlation ID.
    #[must_use]
    pub fn new(
        class_name: impl Into<String>,
        method_name: impl Into<String>,
        parameters: Vec<Value>,
    ) -> Self {
        Self {
            request_id: RequestId::new(),
            class_name: class_name.into(),
            method_name: method_name.into(),
            parameters,
            retry_count: 0,
        }
    }

    /// Returns the request for the next retry attempt.
    ///
    /// Everything is carried forward unchanged except the retry count.
    #[must_use]
    pub fn next_attempt(&self) -> Self {
        Self {
            request_id: self.request_id,
            class_name: self.class_name.clone(),
            method_name: self.method_name.clone(),
            parameters: self.parameters.clone(),
            retry_count: self.retry_count + 1,
        }
    }
}
