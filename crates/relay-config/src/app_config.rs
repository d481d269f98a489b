//! Application configuration structures.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name and metadata.
    #[serde(default)]
    pub app: AppMetadata,

    /// Job dispatch and retry configuration.
    #[serde(default)]
    pub jobs: JobsConfig,

    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Audit log configuration.
    #[serde(default)]
    pub audit: AuditConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppMetadata::default(),
            jobs: JobsConfig::default(),
            database: DatabaseConfig::default(),
            audit: AuditConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Application metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppMetadata {
    /// Application name.
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Runtime environment (development, staging, production).
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            environment: default_environment(),
        }
    }
}

fn default_app_name() -> String {
    "relay".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

/// Job dispatch and retry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Maximum number of automatic retries after an execution error.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed delay before a retry process is spawned, in seconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,

    /// Fully-qualified job class names permitted to run.
    ///
    /// This is a security boundary: requests naming a class outside this
    /// list are recorded as failed and never executed or retried.
    #[serde(default)]
    pub allow_list: Vec<String>,

    /// Path to the worker binary re-invoked for each attempt.
    ///
    /// Defaults to the current executable when unset.
    #[serde(default)]
    pub worker_binary: Option<String>,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay(),
            allow_list: Vec::new(),
            worker_binary: None,
        }
    }
}

impl JobsConfig {
    /// Returns the retry delay as a Duration.
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    5
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database URL.
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Maximum connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connection acquire timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl DatabaseConfig {
    /// Returns the connect timeout as a Duration.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn default_database_url() -> String {
    "sqlite://storage/relay_jobs.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_connect_timeout() -> u64 {
    5
}

/// Audit log configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Path of the append-only audit log file.
    #[serde(default = "default_audit_log_path")]
    pub log_path: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            log_path: default_audit_log_path(),
        }
    }
}

fn default_audit_log_path() -> String {
    "storage/logs/background_jobs.log".to_string()
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Default tracing filter directive, overridable via `RUST_LOG`.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "info,relay=debug".to_string()
}
