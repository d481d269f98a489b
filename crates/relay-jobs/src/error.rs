//! Job error types.

use thiserror::Error;

/// Result type for job operations.
pub type JobResult<T> = Result<T, JobError>;

/// Job-related errors.
#[derive(Debug, Error)]
pub enum JobError {
    /// The requested class is not on the allow-list.
    #[error("Class not approved for background execution: {0}")]
    NotApproved(String),

    /// No handler is registered for the requested class.
    #[error("Class not found: {0}")]
    ClassNotFound(String),

    /// The handler does not expose the requested method.
    #[error("Method not found: {class}::{method}")]
    MethodNotFound { class: String, method: String },

    /// The job body raised an error during execution.
    #[error("Job execution failed: {0}")]
    ExecutionFailed(String),

    /// The job parameters did not parse as a JSON array.
    #[error("Invalid job parameters: {0}")]
    InvalidParameters(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Failed to spawn the worker process.
    #[error("Process spawn failed: {0}")]
    Spawn(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl JobError {
    /// Creates an execution error from any displayable fault.
    #[must_use]
    pub fn execution<T: ToString>(err: T) -> Self {
        Self::ExecutionFailed(err.to_string())
    }

    /// Returns true if a retry process may be spawned for this error.
    ///
    /// Only faults raised by the job body itself are retryable. Security
    /// rejections, validation errors, and infrastructure faults are terminal.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, JobError::ExecutionFailed(_))
    }

    /// Returns the reason string persisted on a failed job record.
    ///
    /// Rejections map to their taxonomy names; execution errors surface the
    /// underlying message as an opaque string.
    #[must_use]
    pub fn record_reason(&self) -> String {
        match self {
            JobError::NotApproved(_) => "NotApproved".to_string(),
            JobError::ClassNotFound(_) => "ClassNotFound".to_string(),
            JobError::MethodNotFound { .. } => "MethodNotFound".to_string(),
            JobError::ExecutionFailed(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_execution_errors_are_retryable() {
        assert!(JobError::ExecutionFailed("boom".into()).is_retryable());
        assert!(!JobError::NotApproved("jobs.X".into()).is_retryable());
        assert!(!JobError::ClassNotFound("jobs.X".into()).is_retryable());
        assert!(!JobError::MethodNotFound {
            class: "jobs.X".into(),
            method: "run".into()
        }
        .is_retryable());
        assert!(!JobError::InvalidParameters("not an array".into()).is_retryable());
        assert!(!JobError::Spawn("fork failed".into()).is_retryable());
    }

    #[test]
    fn test_record_reason_taxonomy() {
        assert_eq!(
            JobError::NotApproved("jobs.X".into()).record_reason(),
            "NotApproved"
        );
        assert_eq!(
            JobError::ClassNotFound("jobs.X".into()).record_reason(),
            "ClassNotFound"
        );
        assert_eq!(
            JobError::MethodNotFound {
                class: "jobs.X".into(),
                method: "run".into()
            }
            .record_reason(),
            "MethodNotFound"
        );
        assert_eq!(
            JobError::ExecutionFailed("disk full".into()).record_reason(),
            "disk full"
        );
    }

    #[test]
    fn test_method_not_found_display() {
        let err = JobError::MethodNotFound {
            class: "jobs.Report".into(),
            method: "missing".into(),
        };
        assert!(err.to_string().contains("jobs.Report::missing"));
    }
}
