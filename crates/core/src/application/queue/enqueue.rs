// Enqueue Use Case

use crate::domain::{Job, JobPayload, JobType};
use crate::error::{AppError, Result};
use crate::port::{IdProvider, JobRepository, TimeProvider};
use serde::{Deserialize, Serialize};
use tracing::info;

const MAX_QUEUE_NAME_LEN: usize = 64;
const MAX_PAYLOAD_DEPTH: usize = 32;

/// Enqueue request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueRequest {
    pub job_type: String,
    pub queue: String,
    pub payload: serde_json::Value,
    pub max_attempts: i32,
    pub backoff_factor: f64,
}

/// Reject requests the worker could never process
pub fn validate_request(req: &EnqueueRequest) -> Result<()> {
    if req.queue.is_empty() {
        return Err(AppError::Validation("Queue name must not be empty".into()));
    }
    if req.queue.len() > MAX_QUEUE_NAME_LEN {
        return Err(AppError::Validation(format!(
            "Queue name too long ({} > {})",
            req.queue.len(),
            MAX_QUEUE_NAME_LEN
        )));
    }
    if !req
        .queue
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AppError::Validation(
            "Queue name must be alphanumeric (plus '_' and '-')".into(),
        ));
    }
    if req.job_type.is_empty() {
        return Err(AppError::Validation("Job type must not be empty".into()));
    }
    if req.max_attempts < 1 {
        return Err(AppError::Validation(format!(
            "max_attempts out of range: {}",
            req.max_attempts
        )));
    }
    if req.backoff_factor.is_nan() || req.backoff_factor < 1.0 {
        return Err(AppError::Validation(format!(
            "backoff_factor out of range: {}",
            req.backoff_factor
        )));
    }
    if json_depth(&req.payload) > MAX_PAYLOAD_DEPTH {
        return Err(AppError::Validation(format!(
            "Payload too deeply nested (max depth {})",
            MAX_PAYLOAD_DEPTH
        )));
    }
    Ok(())
}

fn json_depth(value: &serde_json::Value) -> usize {
    match value {
        serde_json::Value::Object(map) => 1 + map.values().map(json_depth).max().unwrap_or(0),
        serde_json::Value::Array(items) => 1 + items.iter().map(json_depth).max().unwrap_or(0),
        _ => 0,
    }
}

/// Execute enqueue use case
///
/// # Arguments
///
/// * `job_repo` - Job repository
/// * `id_provider` - ID generator (injected for determinism)
/// * `time_provider` - Time provider (injected for determinism)
/// * `req` - Enqueue request
///
/// Returns once the job is durably stored; storage failures surface as
/// `AppError::QueueDelivery`.
pub async fn execute(
    job_repo: &dyn JobRepository,
    id_provider: &dyn IdProvider,
    time_provider: &dyn TimeProvider,
    req: EnqueueRequest,
) -> Result<String> {
    validate_request(&req)?;

    let job_id = id_provider.generate_id();
    let created_at = time_provider.now_millis();

    let mut job = Job::new(
        job_id.clone(),
        created_at,
        req.queue,
        JobType::new(req.job_type),
        JobPayload::new(req.payload),
    );
    job.max_attempts = req.max_attempts;
    job.backoff_factor = req.backoff_factor;

    job_repo
        .insert(&job)
        .await
        .map_err(|e| AppError::QueueDelivery(e.to_string()))?;

    info!(job_id = %job.id, queue = %job.queue, job_type = %job.job_type.as_str(), "Job enqueued");

    Ok(job_id)
}
