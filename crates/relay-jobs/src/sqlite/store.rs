//! SQLite implementation of the job store.

use crate::error::{JobError, JobResult};
use crate::record::{EventKind, JobEvent, JobRecord, JobRequest, JobStatus};
use crate::store::{JobSearchQuery, JobStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relay_config::DatabaseConfig;
use relay_core::{JobId, RequestId};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

const JOB_COLUMNS: &str = "id, request_id, class_name, method_name, parameters, status, \
     retry_count, priority, scheduled_at, started_at, completed_at, error_message, \
     created_at, updated_at";

/// SQLite-backed job store.
#[derive(Clone)]
pub struct SqliteJobStore {
    pool: SqlitePool,
}

impl SqliteJobStore {
    /// Creates a store from configuration, opening the database file.
    pub async fn connect(config: &DatabaseConfig) -> JobResult<Self> {
        info!("Opening job database: {}", config.url);

        ensure_parent_dir(&config.url)?;

        let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout())
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Creates an in-memory store, used by tests.
    pub async fn in_memory() -> JobResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        // A single connection, otherwise each connection sees its own
        // private in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Creates the schema if it does not exist.
    pub async fn run_migrations(&self) -> JobResult<()> {
        debug!("Running job store migrations");

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS background_jobs (
                id TEXT PRIMARY KEY,
                request_id TEXT NOT NULL,
                class_name TEXT NOT NULL,
                method_name TEXT NOT NULL,
                parameters TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                retry_count INTEGER NOT NULL DEFAULT 0,
                priority INTEGER NOT NULL DEFAULT 0,
                scheduled_at TEXT NOT NULL,
                started_at TEXT,
                completed_at TEXT,
                error_message TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_background_jobs_status_priority_scheduled
                ON background_jobs (status, priority, scheduled_at)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_background_jobs_request
                ON background_jobs (request_id)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS job_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                job_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                message TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_job_events_job ON job_events (job_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Checks if the database connection is healthy.
    pub async fn health_check(&self) -> JobResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Creates the directory holding a file-backed database, if any.
fn ensure_parent_dir(url: &str) -> JobResult<()> {
    let path = url.trim_start_matches("sqlite://").trim_start_matches("sqlite:");
    if path.is_empty() || path.starts_with(':') {
        return Ok(());
    }
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| JobError::Internal(format!("Failed to create {parent:?}: {e}")))?;
        }
    }
    Ok(())
}

/// Database row representation of a job record.
#[derive(Debug, FromRow)]
struct JobRow {
    id: String,
    request_id: String,
    class_name: String,
    method_name: String,
    parameters: Option<String>,
    status: String,
    retry_count: i64,
    priority: i64,
    scheduled_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for JobRecord {
    type Error = JobError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let id = JobId::parse(&row.id)
            .map_err(|e| JobError::Internal(format!("Invalid job id in database: {e}")))?;
        let request_id = RequestId::parse(&row.request_id)
            .map_err(|e| JobError::Internal(format!("Invalid request id in database: {e}")))?;
        let status = row
            .status
            .parse::<JobStatus>()
            .map_err(JobError::Internal)?;
        let parameters = match row.parameters.as_deref() {
            Some(json) => serde_json::from_str(json)?,
            None => Vec::new(),
        };

        Ok(JobRecord {
            id,
            request_id,
            class_name: row.class_name,
            method_name: row.method_name,
            parameters,
            status,
            retry_count: row.retry_count.max(0) as u32,
            priority: row.priority,
            scheduled_at: row.scheduled_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
            error_message: row.error_message,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Database row representation of a structured audit event.
#[derive(Debug, FromRow)]
struct EventRow {
    id: i64,
    job_id: String,
    kind: String,
    message: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for JobEvent {
    type Error = JobError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let job_id = JobId::parse(&row.job_id)
            .map_err(|e| JobError::Internal(format!("Invalid job id in database: {e}")))?;
        let kind = match row.kind.as_str() {
            "success" => EventKind::Success,
            "failure" => EventKind::Failure,
            other => {
                return Err(JobError::Internal(format!("unknown event kind: {other}")));
            }
        };

        Ok(JobEvent {
            id: row.id,
            job_id,
            kind,
            message: row.message,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn create(&self, request: &JobRequest) -> JobResult<JobRecord> {
        let id = JobId::new();
        let now = Utc::now();
        let parameters = serde_json::to_string(&request.parameters)?;

        sqlx::query(
            "INSERT INTO background_jobs \
                 (id, request_id, class_name, method_name, parameters, status, \
                  retry_count, priority, scheduled_at, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, 'pending', ?, 0, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(request.request_id.to_string())
        .bind(&request.class_name)
        .bind(&request.method_name)
        .bind(&parameters)
        .bind(i64::from(request.retry_count))
        .bind(now)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(JobRecord {
            id,
            request_id: request.request_id,
            class_name: request.class_name.clone(),
            method_name: request.method_name.clone(),
            parameters: request.parameters.clone(),
            status: JobStatus::Pending,
            retry_count: request.retry_count,
            priority: 0,
            scheduled_at: now,
            started_at: None,
            completed_at: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        })
    }

    async fn mark_started(&self, record: &mut JobRecord) -> JobResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE background_jobs \
             SET status = 'started', started_at = ?, updated_at = ? \
             WHERE id = ? AND status = 'pending'",
        )
        .bind(now)
        .bind(now)
        .bind(record.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            record.status = JobStatus::Started;
            record.started_at = Some(now);
            record.updated_at = now;
        }

        Ok(())
    }

    async fn mark_completed(&self, record: &mut JobRecord) -> JobResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE background_jobs \
             SET status = 'completed', completed_at = ?, updated_at = ? \
             WHERE id = ? AND status NOT IN ('completed', 'failed')",
        )
        .bind(now)
        .bind(now)
        .bind(record.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            record.status = JobStatus::Completed;
            record.completed_at = Some(now);
            record.updated_at = now;
        }

        Ok(())
    }

    async fn mark_failed(&self, record: &mut JobRecord, reason: &str) -> JobResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE background_jobs \
             SET status = 'failed', completed_at = ?, error_message = ?, updated_at = ? \
             WHERE id = ? AND status NOT IN ('completed', 'failed')",
        )
        .bind(now)
        .bind(reason)
        .bind(now)
        .bind(record.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            record.status = JobStatus::Failed;
            record.completed_at = Some(now);
            record.error_message = Some(reason.to_string());
            record.updated_at = now;
        }

        Ok(())
    }

    async fn append_event(&self, job_id: JobId, kind: EventKind, message: &str) -> JobResult<()> {
        sqlx::query(
            "INSERT INTO job_events (job_id, kind, message, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(job_id.to_string())
        .bind(kind.as_str())
        .bind(message)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: JobId) -> JobResult<Option<JobRecord>> {
        let row: Option<JobRow> = sqlx::query_as(&format!(
            "SELECT {JOB_COLUMNS} FROM background_jobs WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(JobRecord::try_from).transpose()
    }

    async fn list_for_request(&self, request_id: RequestId) -> JobResult<Vec<JobRecord>> {
        let rows: Vec<JobRow> = sqlx::query_as(&format!(
            "SELECT {JOB_COLUMNS} FROM background_jobs \
             WHERE request_id = ? ORDER BY retry_count ASC, rowid ASC"
        ))
        .bind(request_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(JobRecord::try_from).collect()
    }

    async fn list_events(&self, job_id: JobId) -> JobResult<Vec<JobEvent>> {
        let rows: Vec<EventRow> = sqlx::query_as(
            "SELECT id, job_id, kind, message, created_at FROM job_events \
             WHERE job_id = ? ORDER BY id ASC",
        )
        .bind(job_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(JobEvent::try_from).collect()
    }

    async fn search(&self, query: &JobSearchQuery) -> JobResult<Vec<JobRecord>> {
        let mut builder = sqlx::QueryBuilder::<sqlx::Sqlite>::new(format!(
            "SELECT {JOB_COLUMNS} FROM background_jobs WHERE 1 = 1"
        ));

        if let Some(status) = query.status {
            builder.push(" AND status = ");
            builder.push_bind(status.as_str());
        }
        if let Some(class_name) = &query.class_name {
            builder.push(" AND class_name = ");
            builder.push_bind(class_name.clone());
        }

        builder.push(" ORDER BY created_at DESC, rowid DESC LIMIT ");
        builder.push_bind(i64::from(query.limit));
        builder.push(" OFFSET ");
        builder.push_bind(i64::from(query.offset));

        let rows: Vec<JobRow> = builder.build_query_as().fetch_all(&self.pool).await?;

        rows.into_iter().map(JobRecord::try_from).collect()
    }
}
