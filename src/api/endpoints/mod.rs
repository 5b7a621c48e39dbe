//! API endpoint handlers.
//!
//! The pipeline is blocking (HTTP clients, image resizing, retry sleeps),
//! so every handler hands its work to `run_blocking`: one blocking worker
//! per request, tagged with a job id for log correlation.

pub mod files;
pub mod folders;
pub mod health;
pub mod process;

use tracing::Instrument;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::pipeline::PipelineError;

pub(crate) async fn run_blocking<T, F>(operation: &'static str, job: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, PipelineError> + Send + 'static,
    T: Send + 'static,
{
    let span = tracing::info_span!("job", job_id = %Uuid::new_v4(), operation);
    let worker_span = span.clone();

    let result = tokio::task::spawn_blocking(move || worker_span.in_scope(job))
        .instrument(span)
        .await
        .map_err(|e| ApiError::Internal(format!("worker task failed: {e}")))?;

    result.map_err(ApiError::from)
}
