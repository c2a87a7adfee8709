// Scoring Queue - durable enqueue of scoring jobs

pub mod enqueue;

pub use enqueue::EnqueueRequest;

use crate::domain::job::{DEFAULT_BACKOFF_FACTOR, DEFAULT_MAX_ATTEMPTS};
use crate::domain::{JobId, JobType, ScoringJob};
use crate::error::Result;
use crate::port::{IdProvider, JobRepository, TimeProvider};
use std::sync::Arc;

/// Default queue name for scoring jobs
pub const DEFAULT_QUEUE: &str = "property-scoring";

/// Per-job retry options applied at enqueue time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JobOptions {
    pub max_attempts: i32,
    pub backoff_factor: f64,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
        }
    }
}

/// Producer side of the scoring queue
pub struct ScoringQueue {
    queue: String,
    options: JobOptions,
    job_repo: Arc<dyn JobRepository>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl ScoringQueue {
    pub fn new(
        queue: impl Into<String>,
        options: JobOptions,
        job_repo: Arc<dyn JobRepository>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            queue: queue.into(),
            options,
            job_repo,
            id_provider,
            time_provider,
        }
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Enqueue a scoring job; returns once it is durably accepted
    pub async fn enqueue(&self, job: &ScoringJob) -> Result<JobId> {
        let req = EnqueueRequest {
            job_type: JobType::SCORE.to_string(),
            queue: self.queue.clone(),
            payload: serde_json::to_value(job)?,
            max_attempts: self.options.max_attempts,
            backoff_factor: self.options.backoff_factor,
        };

        enqueue::execute(
            self.job_repo.as_ref(),
            self.id_provider.as_ref(),
            self.time_provider.as_ref(),
            req,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{JobState, PropertyId};
    use crate::error::AppError;
    use crate::port::id_provider::mocks::SequentialIdProvider;
    use crate::port::job_repository::mocks::InMemoryJobRepository;
    use crate::port::time_provider::mocks::ManualClock;
    use serde_json::json;

    fn scoring_job() -> ScoringJob {
        ScoringJob {
            property_id: PropertyId::new(json!("p1")).unwrap(),
            filter: serde_json::from_value(json!({"budget": 500000})).unwrap(),
            property: serde_json::from_value(json!({"id": "p1", "price": 480000})).unwrap(),
        }
    }

    fn setup() -> (Arc<InMemoryJobRepository>, ScoringQueue) {
        let clock = Arc::new(ManualClock::new(1_000));
        let repo = Arc::new(InMemoryJobRepository::new(clock.clone()));
        let queue = ScoringQueue::new(
            DEFAULT_QUEUE,
            JobOptions::default(),
            repo.clone(),
            Arc::new(SequentialIdProvider::default()),
            clock,
        );
        (repo, queue)
    }

    #[tokio::test]
    async fn test_enqueue_persists_camel_case_payload() {
        let (repo, queue) = setup();

        let id = queue.enqueue(&scoring_job()).await.unwrap();
        assert_eq!(id, "job-1");

        let job = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(job.state, JobState::Queued);
        assert_eq!(job.job_type.as_str(), "score");
        assert_eq!(job.max_attempts, 3);
        assert_eq!(job.payload.as_value()["propertyId"], json!("p1"));
        assert_eq!(job.payload.as_value()["filter"]["budget"], json!(500000));
    }

    #[tokio::test]
    async fn test_enqueue_failure_is_queue_delivery_error() {
        let (repo, queue) = setup();
        repo.set_reject_inserts(true);

        let err = queue.enqueue(&scoring_job()).await.unwrap_err();
        assert!(matches!(err, AppError::QueueDelivery(_)));
    }
}
