//! Dispatch request API consumed by application code.

use crate::error::JobResult;
use crate::launcher::ProcessLauncher;
use crate::record::JobRequest;
use relay_core::RequestId;
use serde_json::Value;
use tracing::info;

/// Enqueues a job for background execution.
///
/// Issues the initial process spawn with retry count 0 and returns as soon
/// as the spawn is handed to the operating system. There is no handle to
/// observe the outcome; callers read the job store for history.
pub async fn dispatch(
    launcher: &dyn ProcessLauncher,
    class_name: impl Into<String>,
    method_name: impl Into<String>,
    parameters: Vec<Value>,
) -> JobResult<RequestId> {
    let request = JobRequest::new(class_name, method_name, parameters);

    launcher.spawn_job(&request).await?;

    info!(
        request_id = %request.request_id,
        class = %request.class_name,
        method = %request.method_name,
        "Dispatched background job"
    );

    Ok(request.request_id)
}
