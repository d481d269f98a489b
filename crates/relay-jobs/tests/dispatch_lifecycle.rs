//! End-to-end dispatch lifecycle tests.
//!
//! The launcher is replaced by a recording fake, and the chain of retry
//! processes is simulated by feeding each spawned request back into a fresh
//! dispatcher run, the way a real child process would execute it.

use async_trait::async_trait;
use relay_jobs::{
    AllowList, AuditSink, DispatchOutcome, Dispatcher, FileAuditSink, JobError, JobRegistry,
    JobRequest, JobResult, JobStatus, JobStore, ProcessLauncher, RetryPolicy, Runnable,
    SqliteJobStore,
};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct AlwaysThrows;

#[async_trait]
impl Runnable for AlwaysThrows {
    fn name(&self) -> &str {
        "jobs.AlwaysThrows"
    }

    fn methods(&self) -> &[&str] {
        &["run"]
    }

    async fn invoke(&self, _method: &str, _parameters: &[Value]) -> JobResult<Option<String>> {
        Err(JobError::execution("simulated transient failure"))
    }
}

struct Greeter;

#[async_trait]
impl Runnable for Greeter {
    fn name(&self) -> &str {
        "jobs.Greeter"
    }

    fn methods(&self) -> &[&str] {
        &["greet"]
    }

    async fn invoke(&self, _method: &str, parameters: &[Value]) -> JobResult<Option<String>> {
        let name = parameters
            .first()
            .and_then(Value::as_str)
            .unwrap_or("world");
        Ok(Some(format!("greeted {name}")))
    }
}

#[derive(Default)]
struct RecordingLauncher {
    spawned: Mutex<Vec<JobRequest>>,
}

impl RecordingLauncher {
    fn take(&self) -> Vec<JobRequest> {
        std::mem::take(&mut *self.spawned.lock().unwrap())
    }

    fn count(&self) -> usize {
        self.spawned.lock().unwrap().len()
    }
}

#[async_trait]
impl ProcessLauncher for RecordingLauncher {
    async fn spawn_job(&self, request: &JobRequest) -> JobResult<()> {
        self.spawned.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn spawn_retry(&self, request: &JobRequest) -> JobResult<()> {
        self.spawned.lock().unwrap().push(request.clone());
        Ok(())
    }
}

struct Harness {
    store: Arc<SqliteJobStore>,
    launcher: Arc<RecordingLauncher>,
    dispatcher: Dispatcher,
    log_path: PathBuf,
    _dir: tempfile::TempDir,
}

async fn harness(allowed: &[&str]) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("background_jobs.log");

    let store = Arc::new(SqliteJobStore::in_memory().await.unwrap());
    let audit: Arc<dyn AuditSink> =
        Arc::new(FileAuditSink::new(&log_path).with_store(store.clone()));
    let launcher = Arc::new(RecordingLauncher::default());

    let mut registry = JobRegistry::new();
    registry.register(Arc::new(AlwaysThrows));
    registry.register(Arc::new(Greeter));

    let dispatcher = Dispatcher::new(
        store.clone(),
        audit,
        Arc::new(registry),
        launcher.clone(),
        AllowList::new(allowed.iter().map(|s| s.to_string())),
        RetryPolicy::fixed(3, Duration::ZERO),
    );

    Harness {
        store,
        launcher,
        dispatcher,
        log_path,
        _dir: dir,
    }
}

#[tokio::test]
async fn test_failing_job_exhausts_exactly_three_retries() {
    let h = harness(&["jobs.AlwaysThrows"]).await;
    let initial = JobRequest::new("jobs.AlwaysThrows", "run", vec![json!({"x": 1})]);

    // Initial attempt plus the chain of simulated child processes.
    let mut outcome = h.dispatcher.run(&initial).await.unwrap();
    let mut attempts = 1;
    loop {
        let spawned = h.launcher.take();
        if spawned.is_empty() {
            break;
        }
        assert_eq!(spawned.len(), 1, "one retry spawn per failed attempt");
        outcome = h.dispatcher.run(&spawned[0]).await.unwrap();
        attempts += 1;
    }

    // 1 initial record + 3 retries, no fifth spawn.
    assert_eq!(attempts, 4);
    assert_eq!(outcome, DispatchOutcome::FailedTerminal);
    assert_eq!(h.launcher.count(), 0);

    let chain = h.store.list_for_request(initial.request_id).await.unwrap();
    assert_eq!(chain.len(), 4);
    for (i, record) in chain.iter().enumerate() {
        assert_eq!(record.status, JobStatus::Failed);
        assert_eq!(record.retry_count, i as u32);
        assert_eq!(
            record.error_message.as_deref(),
            Some("simulated transient failure")
        );
    }
}

#[tokio::test]
async fn test_class_off_the_allow_list_leaves_one_failed_record() {
    let h = harness(&["jobs.Greeter"]).await;
    let request = JobRequest::new("jobs.NotOnAllowList", "run", vec![]);

    let outcome = h.dispatcher.run(&request).await.unwrap();
    assert_eq!(outcome, DispatchOutcome::FailedTerminal);
    assert_eq!(h.launcher.count(), 0);

    let chain = h.store.list_for_request(request.request_id).await.unwrap();
    assert_eq!(chain.len(), 1);
    assert_eq!(chain[0].status, JobStatus::Failed);
    assert_eq!(chain[0].error_message.as_deref(), Some("NotApproved"));
}

#[tokio::test]
async fn test_missing_method_leaves_one_failed_record() {
    let h = harness(&["jobs.Greeter"]).await;
    let request = JobRequest::new("jobs.Greeter", "missingMethod", vec![]);

    let outcome = h.dispatcher.run(&request).await.unwrap();
    assert_eq!(outcome, DispatchOutcome::FailedTerminal);
    assert_eq!(h.launcher.count(), 0);

    let chain = h.store.list_for_request(request.request_id).await.unwrap();
    assert_eq!(chain.len(), 1);
    assert_eq!(chain[0].error_message.as_deref(), Some("MethodNotFound"));
}

#[tokio::test]
async fn test_successful_run_writes_the_dual_audit_trail() {
    let h = harness(&["jobs.Greeter"]).await;
    let request = JobRequest::new("jobs.Greeter", "greet", vec![json!("ada")]);

    let outcome = h.dispatcher.run(&request).await.unwrap();
    assert_eq!(outcome, DispatchOutcome::Succeeded);

    let chain = h.store.list_for_request(request.request_id).await.unwrap();
    let record = &chain[0];
    assert_eq!(record.status, JobStatus::Completed);
    assert!(record.started_at.unwrap() <= record.completed_at.unwrap());

    // File half of the trail.
    let log = std::fs::read_to_string(&h.log_path).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("SUCCESS: jobs.Greeter::greet - job started"));
    assert!(lines[1].ends_with("SUCCESS: jobs.Greeter::greet - greeted ada"));

    // Structured half of the trail.
    let events = h.store.list_events(record.id).await.unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].message, "job started");
    assert_eq!(events[1].message, "greeted ada");
}

#[tokio::test]
async fn test_audit_failure_lines_carry_the_error_detail() {
    let h = harness(&["jobs.AlwaysThrows"]).await;
    let request = JobRequest {
        retry_count: 3,
        ..JobRequest::new("jobs.AlwaysThrows", "run", vec![])
    };

    h.dispatcher.run(&request).await.unwrap();

    let log = std::fs::read_to_string(&h.log_path).unwrap();
    let failure_line = log
        .lines()
        .find(|l| l.contains("FAILURE:"))
        .expect("failure line present");
    assert!(failure_line.contains("jobs.AlwaysThrows::run"));
    assert!(failure_line.contains("simulated transient failure"));
}
