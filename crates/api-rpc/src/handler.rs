//! RPC Method Handlers

use crate::error::to_rpc_error;
use crate::types::{AsyncScore, ScoreRequest, ScoringResult, StatsRequest, StatsResponse};
use jsonrpsee::types::ErrorObjectOwned;
use propscore_core::application::ScoringOrchestrator;
use propscore_core::domain::JobState;
use propscore_core::port::{JobRepository, ScoreCache};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    orchestrator: Arc<ScoringOrchestrator>,
    job_repo: Arc<dyn JobRepository>,
    cache: Arc<dyn ScoreCache>,
    queue: String,
    start_time: Instant,
}

impl RpcHandler {
    pub fn new(
        orchestrator: Arc<ScoringOrchestrator>,
        job_repo: Arc<dyn JobRepository>,
        cache: Arc<dyn ScoreCache>,
        queue: impl Into<String>,
    ) -> Self {
        Self {
            orchestrator,
            job_repo,
            cache,
            queue: queue.into(),
            start_time: Instant::now(),
        }
    }

    /// score.sync.v1
    pub async fn score_sync(&self, params: ScoreRequest) -> Result<ScoringResult, ErrorObjectOwned> {
        self.orchestrator
            .score_sync(&params)
            .await
            .map_err(to_rpc_error)
    }

    /// score.async.v1
    pub async fn score_async(&self, params: ScoreRequest) -> Result<AsyncScore, ErrorObjectOwned> {
        let outcome = self
            .orchestrator
            .score_async(&params)
            .await
            .map_err(to_rpc_error)?;
        debug!(status = %outcome.status(), "score.async.v1");
        Ok(outcome)
    }

    /// admin.stats.v1
    pub async fn stats(&self, _params: StatsRequest) -> Result<StatsResponse, ErrorObjectOwned> {
        let count = |state| self.job_repo.count_by_state(&self.queue, state);

        Ok(StatsResponse {
            queue: self.queue.clone(),
            queued_jobs: count(JobState::Queued).await.map_err(to_rpc_error)?,
            running_jobs: count(JobState::Running).await.map_err(to_rpc_error)?,
            done_jobs: count(JobState::Done).await.map_err(to_rpc_error)?,
            failed_jobs: count(JobState::Failed).await.map_err(to_rpc_error)?,
            cached_entries: self.cache.count().await.map_err(to_rpc_error)?,
            uptime_seconds: self.start_time.elapsed().as_secs() as i64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::code;
    use propscore_core::application::{
        JobOptions, ScoringEngine, ScoringQueue, DEFAULT_CACHE_TTL, DEFAULT_QUEUE,
    };
    use propscore_core::port::id_provider::mocks::SequentialIdProvider;
    use propscore_core::port::job_repository::mocks::InMemoryJobRepository;
    use propscore_core::port::score_cache::mocks::InMemoryScoreCache;
    use propscore_core::port::text_generator::mocks::MockTextGenerator;
    use propscore_core::port::time_provider::mocks::ManualClock;
    use serde_json::json;

    fn handler(generator: MockTextGenerator) -> RpcHandler {
        let clock = Arc::new(ManualClock::new(0));
        let repo = Arc::new(InMemoryJobRepository::new(clock.clone()));
        let cache = Arc::new(InMemoryScoreCache::new(clock.clone()));
        let queue = Arc::new(ScoringQueue::new(
            DEFAULT_QUEUE,
            JobOptions::default(),
            repo.clone(),
            Arc::new(SequentialIdProvider::default()),
            clock,
        ));
        let orchestrator = Arc::new(ScoringOrchestrator::new(
            ScoringEngine::new(Arc::new(generator)),
            cache.clone(),
            queue,
            DEFAULT_CACHE_TTL,
        ));
        RpcHandler::new(orchestrator, repo, cache, DEFAULT_QUEUE)
    }

    fn params(value: serde_json::Value) -> ScoreRequest {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_async_then_stats() {
        let handler = handler(MockTextGenerator::new_text("unused"));

        let outcome = handler
            .score_async(params(json!({"filter": {"budget": 1}, "property": {"propertyId": 7}})))
            .await
            .unwrap();
        assert_eq!(serde_json::to_value(&outcome).unwrap(), json!({"status": "pending"}));

        let stats = handler.stats(StatsRequest::default()).await.unwrap();
        assert_eq!(stats.queued_jobs, 1);
        assert_eq!(stats.done_jobs, 0);
        assert_eq!(stats.cached_entries, 0);
    }

    #[tokio::test]
    async fn test_missing_id_maps_to_validation_code() {
        let handler = handler(MockTextGenerator::new_text("unused"));

        let err = handler
            .score_async(params(json!({"property": {"price": 1}})))
            .await
            .unwrap_err();
        assert_eq!(err.code(), code::VALIDATION_ERROR);
    }

    #[tokio::test]
    async fn test_sync_parse_failure_code() {
        let handler = handler(MockTextGenerator::new_text("No JSON here"));

        let err = handler
            .score_sync(params(json!({"filter": {}, "property": {"id": "p1"}})))
            .await
            .unwrap_err();
        assert_eq!(err.code(), code::PARSE_ERROR);
    }
}
