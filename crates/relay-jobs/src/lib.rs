//! Relay Jobs - Background Job Dispatch and Retry Engine
//!
//! Runs application jobs outside the request lifecycle by spawning one
//! detached OS process per execution attempt, with bounded automatic
//! retries and a dual audit trail.
//!
//! # Architecture
//!
//! ```text
//!  dispatch(class, method, params)
//!        │ spawn (retry 0)
//!        ▼
//!  worker process ──► Dispatcher::run
//!                        │ create record (pending → started)
//!                        │ Validator: allow-list + registry
//!                        │ Runnable::invoke
//!                        ├─ ok   → completed, audit SUCCESS
//!                        └─ err  → failed, audit FAILURE
//!                                   │ retry_count < ceiling?
//!                                   ▼
//!                            ProcessLauncher::spawn_retry
//!                            (fixed delay, retry_count + 1)
//!                                   │
//!                                   ▼
//!                            next worker process ...
//! ```
//!
//! Each spawned process is independent; retries form a chain of short-lived
//! processes coordinated only through the job store and the command-line
//! arguments. There is no shared queue, worker pool, or locking.
//!
//! # Example
//!
//! ```rust,ignore
//! use relay_jobs::{dispatch, DetachedLauncher, FileAuditSink, RetryPolicy};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let audit = Arc::new(FileAuditSink::new("storage/logs/background_jobs.log"));
//! let launcher = DetachedLauncher::from_current_exe(RetryPolicy::default(), audit)?;
//!
//! let request_id = dispatch(&launcher, "reports.DailySummary", "generate", vec![json!({"day": 7})]).await?;
//! ```

pub mod audit;
pub mod dispatch;
pub mod dispatcher;
pub mod error;
pub mod launcher;
pub mod record;
pub mod registry;
pub mod retry;
pub mod sqlite;
pub mod store;
pub mod validator;

pub use audit::{AuditSink, FileAuditSink};
pub use dispatch::dispatch;
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use error::{JobError, JobResult};
pub use launcher::{DetachedLauncher, ProcessLauncher};
pub use record::{EventKind, JobEvent, JobRecord, JobRequest, JobStatus};
pub use registry::{JobRegistry, Runnable};
pub use retry::RetryPolicy;
pub use sqlite::SqliteJobStore;
pub use store::{JobSearchQuery, JobStore};
pub use validator::{AllowList, Rejection, Validator};
