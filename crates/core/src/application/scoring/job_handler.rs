// Worker-side scoring: run the engine, write the outcome to the cache

use super::{ScoringEngine, ScoringError};
use crate::domain::{CacheKey, CachedPayload, Job, JobType, ScoringJob};
use crate::error::Result;
use crate::port::{JobFailure, JobHandler, ScoreCache};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Handles `score` jobs
///
/// Every attempt leaves a cache entry behind: the result on success,
/// `{error}` on failure. A later successful retry overwrites the error.
pub struct ScoringJobHandler {
    engine: ScoringEngine,
    cache: Arc<dyn ScoreCache>,
}

impl ScoringJobHandler {
    pub fn new(engine: ScoringEngine, cache: Arc<dyn ScoreCache>) -> Self {
        Self { engine, cache }
    }

    fn decode(job: &Job) -> std::result::Result<ScoringJob, JobFailure> {
        if job.job_type.as_str() != JobType::SCORE {
            return Err(JobFailure::Permanent(format!(
                "Unknown job type: {}",
                job.job_type.as_str()
            )));
        }
        serde_json::from_value(job.payload.as_value().clone())
            .map_err(|e| JobFailure::Permanent(format!("Malformed scoring payload: {}", e)))
    }

    async fn record_error(&self, key: &CacheKey, message: &str) {
        if let Err(e) = self
            .cache
            .put(key, &CachedPayload::failed(message).to_value())
            .await
        {
            error!(key = %key, error = %e, "Failed to cache scoring error");
        }
    }
}

#[async_trait]
impl JobHandler for ScoringJobHandler {
    async fn handle(&self, job: &Job) -> std::result::Result<(), JobFailure> {
        let payload = Self::decode(job)?;
        let key = CacheKey::for_request(&payload.property_id, &payload.filter);

        match self.engine.score(&payload.filter, &payload.property).await {
            Ok(result) => {
                let value = CachedPayload::Scored(result).to_value();
                self.cache
                    .put(&key, &value)
                    .await
                    .map_err(|e| JobFailure::Retryable(e.to_string()))?;
                info!(job_id = %job.id, property_id = %payload.property_id, "Score cached");
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                match &e {
                    ScoringError::Parse(_) => {
                        warn!(job_id = %job.id, error = %message, "Scoring response rejected")
                    }
                    ScoringError::Upstream(_) => {
                        warn!(job_id = %job.id, error = %message, "Scoring call failed")
                    }
                }
                self.record_error(&key, &message).await;
                Err(JobFailure::Retryable(message))
            }
        }
    }

    async fn abandon(&self, job: &Job, reason: &str) -> Result<()> {
        let Ok(payload) = Self::decode(job) else {
            return Ok(());
        };
        let key = CacheKey::for_request(&payload.property_id, &payload.filter);
        self.cache
            .put(&key, &CachedPayload::failed(reason).to_value())
            .await
    }
}
