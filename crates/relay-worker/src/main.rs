//! # Relay Worker
//!
//! Entry point of the process spawned for each job execution attempt.
//!
//! The process is short-lived: it parses its positional arguments, runs one
//! dispatch through the engine, and exits. Retries are new processes spawned
//! by this one, never an in-process loop.
//!
//! Exit code 0 covers every handled completion, including a terminal
//! failure after exhausting retries. A non-zero code means the entry point
//! itself hit an infrastructure error (bad arguments, unparseable JSON
//! parameters, config or database bootstrap failure).

use relay_config::{AppConfig, ConfigLoader};
use relay_jobs::{
    AllowList, AuditSink, DetachedLauncher, Dispatcher, FileAuditSink, ProcessLauncher,
    RetryPolicy, SqliteJobStore,
};
use std::sync::Arc;
use tracing::{error, info};

mod args;
mod handlers;

#[tokio::main]
async fn main() {
    let config = match ConfigLoader::from_default_location() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config.observability.log_filter);

    if let Err(e) = run(config).await {
        error!("Worker error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    info!("Starting relay worker");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let raw: Vec<String> = std::env::args().skip(1).collect();
    let cli = match args::parse(raw.clone().into_iter()) {
        Ok(cli) => cli,
        Err(e) => {
            // Fatal for this process; still leaves a trace in the audit log.
            let class = raw.first().map(String::as_str).unwrap_or("unknown");
            let method = raw.get(1).map(String::as_str).unwrap_or("unknown");
            FileAuditSink::new(&config.audit.log_path)
                .record_failure(class, method, &e.to_string(), None)
                .await;
            return Err(e.into());
        }
    };

    let store = SqliteJobStore::connect(&config.database).await?;
    store.run_migrations().await?;
    let store = Arc::new(store);

    let audit: Arc<dyn AuditSink> =
        Arc::new(FileAuditSink::new(&config.audit.log_path).with_store(store.clone()));

    let policy = RetryPolicy::from_config(&config.jobs);
    let launcher: Arc<dyn ProcessLauncher> = match &config.jobs.worker_binary {
        Some(path) => Arc::new(DetachedLauncher::new(path, policy, audit.clone())),
        None => Arc::new(DetachedLauncher::from_current_exe(policy, audit.clone())?),
    };

    let dispatcher = Dispatcher::new(
        store,
        audit,
        Arc::new(handlers::build_registry()),
        launcher,
        AllowList::new(config.jobs.allow_list.iter().cloned()),
        policy,
    );

    let outcome = dispatcher.run(&cli.into_request()).await?;
    info!(?outcome, "Dispatch finished");

    Ok(())
}

fn init_logging(default_filter: &str) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter.to_string()));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}
