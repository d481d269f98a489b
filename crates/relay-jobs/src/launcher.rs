//! Detached process launcher.
//!
//! Every execution attempt runs in its own short-lived OS process. The
//! launcher re-invokes the worker binary with the request carried as
//! positional arguments and detaches the child so its lifetime is not tied
//! to the parent. Fire-and-forget: the parent never waits for or observes
//! the child's outcome; all further auditing happens inside the child.

use crate::audit::AuditSink;
use crate::error::{JobError, JobResult};
use crate::record::JobRequest;
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;
use tracing::{debug, info};

/// Spawns worker processes for job attempts.
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Spawns a detached process for the request immediately.
    async fn spawn_job(&self, request: &JobRequest) -> JobResult<()>;

    /// Waits the fixed retry delay, then spawns a detached process for the
    /// request. The request must already carry the incremented retry count.
    async fn spawn_retry(&self, request: &JobRequest) -> JobResult<()>;
}

/// Launcher spawning the worker binary as a detached background process.
pub struct DetachedLauncher {
    program: PathBuf,
    policy: RetryPolicy,
    audit: Arc<dyn AuditSink>,
}

impl DetachedLauncher {
    /// Creates a launcher for the given worker binary.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, policy: RetryPolicy, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            program: program.into(),
            policy,
            audit,
        }
    }

    /// Creates a launcher re-invoking the current executable.
    pub fn from_current_exe(policy: RetryPolicy, audit: Arc<dyn AuditSink>) -> JobResult<Self> {
        let program = std::env::current_exe()
            .map_err(|e| JobError::Spawn(format!("Cannot resolve current executable: {e}")))?;
        Ok(Self::new(program, policy, audit))
    }

    /// Positional arguments passed to the worker process:
    /// `[class, method, json_parameters, retry_count, request_id]`.
    pub fn command_args(request: &JobRequest) -> JobResult<Vec<String>> {
        Ok(vec![
            request.class_name.clone(),
            request.method_name.clone(),
            serde_json::to_string(&request.parameters)?,
            request.retry_count.to_string(),
            request.request_id.to_string(),
        ])
    }

    fn spawn_detached(&self, request: &JobRequest) -> JobResult<()> {
        let args = Self::command_args(request)?;

        debug!(
            program = %self.program.display(),
            class = %request.class_name,
            method = %request.method_name,
            retry_count = request.retry_count,
            "Spawning worker process"
        );

        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // New process group, so the child survives the parent's exit and
            // ignores its terminal signals.
            command.process_group(0);
        }

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const DETACHED_PROCESS: u32 = 0x0000_0008;
            const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
            command.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
        }

        // The child handle is dropped without waiting: fire-and-forget.
        command
            .spawn()
            .map_err(|e| JobError::Spawn(format!("Failed to spawn worker process: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl ProcessLauncher for DetachedLauncher {
    async fn spawn_job(&self, request: &JobRequest) -> JobResult<()> {
        self.spawn_detached(request)
    }

    async fn spawn_retry(&self, request: &JobRequest) -> JobResult<()> {
        tokio::time::sleep(self.policy.delay).await;

        self.spawn_detached(request)?;

        info!(
            class = %request.class_name,
            method = %request.method_name,
            retry_count = request.retry_count,
            "Retry process spawned"
        );

        // Audits that the spawn was issued, not that the retry succeeded.
        self.audit
            .record_success(
                &request.class_name,
                &request.method_name,
                Some(&format!(
                    "scheduled retry attempt {} of {}",
                    request.retry_count, self.policy.max_retries
                )),
                None,
            )
            .await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::FileAuditSink;
    use serde_json::json;
    use std::time::{Duration, Instant};

    #[test]
    fn test_command_args_layout() {
        let request = JobRequest::new("jobs.Report", "generate", vec![json!({"day": 7})]);
        let args = DetachedLauncher::command_args(&request).unwrap();

        assert_eq!(args.len(), 5);
        assert_eq!(args[0], "jobs.Report");
        assert_eq!(args[1], "generate");
        assert_eq!(args[2], r#"[{"day":7}]"#);
        assert_eq!(args[3], "0");
        assert_eq!(args[4], request.request_id.to_string());
    }

    #[test]
    fn test_command_args_carry_retry_count() {
        let request = JobRequest::new("jobs.Report", "generate", vec![]).next_attempt();
        let args = DetachedLauncher::command_args(&request).unwrap();

        assert_eq!(args[2], "[]");
        assert_eq!(args[3], "1");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_spawn_retry_waits_then_audits_the_schedule() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("audit.log");
        let audit = Arc::new(FileAuditSink::new(&log_path));

        let delay = Duration::from_millis(50);
        let launcher = DetachedLauncher::new("true", RetryPolicy::fixed(3, delay), audit);
        let request = JobRequest::new("jobs.Report", "generate", vec![]).next_attempt();

        let begun = Instant::now();
        launcher.spawn_retry(&request).await.unwrap();
        assert!(begun.elapsed() >= delay);

        let log = std::fs::read_to_string(&log_path).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 1);
        assert!(
            lines[0].ends_with("SUCCESS: jobs.Report::generate - scheduled retry attempt 1 of 3"),
            "unexpected audit line: {}",
            lines[0]
        );
    }

    #[tokio::test]
    async fn test_spawn_retry_failure_is_an_error_and_not_audited() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("audit.log");
        let audit = Arc::new(FileAuditSink::new(&log_path));

        let launcher = DetachedLauncher::new(
            dir.path().join("no-such-binary"),
            RetryPolicy::fixed(3, Duration::ZERO),
            audit,
        );
        let request = JobRequest::new("jobs.Report", "generate", vec![]).next_attempt();

        let err = launcher.spawn_retry(&request).await.unwrap_err();
        assert!(matches!(err, JobError::Spawn(_)));
        assert!(!log_path.exists());
    }
}
