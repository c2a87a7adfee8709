// Scoring Orchestrator - public entry point for sync and async scoring

use crate::application::queue::ScoringQueue;
use crate::application::scoring::ScoringEngine;
use crate::domain::{AsyncScore, CacheKey, ScoringJob, ScoringRequest, ScoringResult};
use crate::error::{AppError, Result};
use crate::port::score_cache::ttl_minutes;
use crate::port::ScoreCache;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Staleness tolerance for `score_async` lookups
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

pub struct ScoringOrchestrator {
    engine: ScoringEngine,
    cache: Arc<dyn ScoreCache>,
    queue: Arc<ScoringQueue>,
    ttl: Duration,
}

impl ScoringOrchestrator {
    pub fn new(
        engine: ScoringEngine,
        cache: Arc<dyn ScoreCache>,
        queue: Arc<ScoringQueue>,
        ttl: Duration,
    ) -> Self {
        Self {
            engine,
            cache,
            queue,
            ttl,
        }
    }

    /// Orchestrator with the TTL given in minutes
    pub fn with_ttl_minutes(
        engine: ScoringEngine,
        cache: Arc<dyn ScoreCache>,
        queue: Arc<ScoringQueue>,
        minutes: u64,
    ) -> Self {
        Self::new(engine, cache, queue, ttl_minutes(minutes))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Score immediately; bypasses cache and queue
    pub async fn score_sync(&self, request: &ScoringRequest) -> Result<ScoringResult> {
        Ok(self.engine.score(&request.filter, &request.property).await?)
    }

    /// Cached result if fresh, otherwise enqueue a job and report `pending`
    ///
    /// Never waits for the job. The only failures surfaced here are a
    /// missing property identifier, cache read errors and enqueue errors.
    pub async fn score_async(&self, request: &ScoringRequest) -> Result<AsyncScore> {
        let property_id = request
            .property_id()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        let key = CacheKey::for_request(&property_id, &request.filter);

        if let Some(entry) = self.cache.get(&key, self.ttl).await? {
            debug!(key = %key, "Score cache hit");
            return Ok(AsyncScore::from_cached(entry.payload, &property_id));
        }

        let job = ScoringJob {
            property_id: property_id.clone(),
            filter: request.filter.clone(),
            property: request.property.clone(),
        };
        let job_id = self.queue.enqueue(&job).await?;
        info!(key = %key, job_id = %job_id, "Score cache miss, job enqueued");

        Ok(AsyncScore::Pending)
    }
}
