//! Shared wiring: the full pipeline on in-memory SQLite with a manual clock

#![allow(dead_code)]

use propscore_core::application::{
    JobOptions, RecoveryService, RetryPolicy, ScoringEngine, ScoringJobHandler,
    ScoringOrchestrator, ScoringQueue, Worker, DEFAULT_CACHE_TTL, DEFAULT_QUEUE,
};
use propscore_core::domain::{JsonMap, ScoringRequest};
use propscore_core::port::id_provider::mocks::SequentialIdProvider;
use propscore_core::port::text_generator::mocks::MockTextGenerator;
use propscore_core::port::time_provider::mocks::ManualClock;
use propscore_infra_sqlite::{create_pool, run_migrations, SqliteJobRepository, SqliteScoreCache};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::sync::Arc;

pub const MINUTE: i64 = 60 * 1000;
pub const LEASE_MS: i64 = 5 * MINUTE;

pub const SCORED: &str = r#"Here is my evaluation:
{"total_score": 95, "breakdown": {"price": 20, "location": 20, "specs": 20, "lifestyle": 20, "timing": 10, "sentiment": 5}, "tier": "Top Match", "explanation": "Under budget in a preferred ZIP with every required feature."}
Let me know if you need anything else."#;

pub fn scored_value() -> Value {
    json!({
        "total_score": 95,
        "breakdown": {"price": 20, "location": 20, "specs": 20, "lifestyle": 20, "timing": 10, "sentiment": 5},
        "tier": "Top Match",
        "explanation": "Under budget in a preferred ZIP with every required feature."
    })
}

pub fn map(value: Value) -> JsonMap {
    serde_json::from_value(value).unwrap()
}

pub fn request(property_id: &str) -> ScoringRequest {
    ScoringRequest::new(
        map(json!({"budget": 500000, "zip": ["78704"], "bedrooms": 3})),
        map(json!({"id": property_id, "price": 480000, "zip": "78704", "bedrooms": 3})),
    )
}

pub struct Pipeline {
    pub pool: SqlitePool,
    pub clock: Arc<ManualClock>,
    pub job_repo: Arc<SqliteJobRepository>,
    pub cache: Arc<SqliteScoreCache>,
    pub generator: Arc<MockTextGenerator>,
    pub orchestrator: Arc<ScoringOrchestrator>,
    pub handler: Arc<ScoringJobHandler>,
    pub retry_policy: Arc<RetryPolicy>,
    pub worker: Arc<Worker>,
}

impl Pipeline {
    pub async fn new(generator: MockTextGenerator) -> Self {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();

        let clock = Arc::new(ManualClock::new(1_000 * MINUTE));
        let job_repo = Arc::new(SqliteJobRepository::new(pool.clone(), clock.clone()));
        let cache = Arc::new(SqliteScoreCache::new(pool.clone(), clock.clone()));
        let generator = Arc::new(generator);
        let engine = ScoringEngine::new(generator.clone());

        let queue = Arc::new(ScoringQueue::new(
            DEFAULT_QUEUE,
            JobOptions::default(),
            job_repo.clone(),
            Arc::new(SequentialIdProvider::default()),
            clock.clone(),
        ));
        let orchestrator = Arc::new(ScoringOrchestrator::new(
            engine.clone(),
            cache.clone(),
            queue,
            DEFAULT_CACHE_TTL,
        ));
        let handler = Arc::new(ScoringJobHandler::new(engine, cache.clone()));
        let retry_policy = Arc::new(RetryPolicy::new(clock.clone(), 1000));
        let worker = Arc::new(Worker::new(
            DEFAULT_QUEUE,
            job_repo.clone(),
            handler.clone(),
            retry_policy.clone(),
            clock.clone(),
        ));

        Self {
            pool,
            clock,
            job_repo,
            cache,
            generator,
            orchestrator,
            handler,
            retry_policy,
            worker,
        }
    }

    pub fn recovery(&self) -> RecoveryService {
        RecoveryService::new(
            self.job_repo.clone(),
            self.handler.clone(),
            self.retry_policy.clone(),
            self.clock.clone(),
            LEASE_MS,
        )
    }

    /// Process jobs until none is claimable right now
    pub async fn drain(&self) -> usize {
        let mut processed = 0;
        while self.worker.process_next_job().await.unwrap() {
            processed += 1;
        }
        processed
    }
}
