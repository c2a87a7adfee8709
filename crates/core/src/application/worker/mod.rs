// Worker - Job execution loop

pub mod constants;
mod shutdown;

use constants::*;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::application::retry::RetryPolicy;
use crate::domain::Job;
use crate::error::Result;
use crate::port::{JobFailure, JobHandler, JobRepository, TimeProvider};
use std::any::Any;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Worker processes jobs from a queue
///
/// Several workers may share one repository; `pop_next` guarantees a job is
/// claimed by at most one of them.
pub struct Worker {
    queue: String,
    job_repo: Arc<dyn JobRepository>,
    handler: Arc<dyn JobHandler>,
    retry_policy: Arc<RetryPolicy>,
    time_provider: Arc<dyn TimeProvider>,
}

impl Worker {
    pub fn new(
        queue: impl Into<String>,
        job_repo: Arc<dyn JobRepository>,
        handler: Arc<dyn JobHandler>,
        retry_policy: Arc<RetryPolicy>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            queue: queue.into(),
            job_repo,
            handler,
            retry_policy,
            time_provider,
        }
    }

    /// Run worker loop with graceful shutdown support
    pub async fn run(&self, mut shutdown: ShutdownToken) -> Result<()> {
        info!(queue = %self.queue, "Worker started");
        loop {
            if shutdown.is_shutdown() {
                break;
            }
            match self.process_next_job().await {
                Ok(true) => {}
                Ok(false) => {
                    tokio::select! {
                        _ = sleep(IDLE_SLEEP_DURATION) => {},
                        _ = shutdown.wait() => break,
                    }
                }
                Err(e) => {
                    error!(queue = %self.queue, error = %e, "Worker error");
                    tokio::select! {
                        _ = sleep(ERROR_RECOVERY_SLEEP_DURATION) => {},
                        _ = shutdown.wait() => break,
                    }
                }
            }
        }
        info!(queue = %self.queue, "Worker stopped");
        Ok(())
    }

    /// Start `size` workers sharing this configuration
    pub fn spawn_pool(
        self: Arc<Self>,
        size: usize,
        shutdown: ShutdownToken,
    ) -> Vec<JoinHandle<Result<()>>> {
        (0..size.max(1))
            .map(|_| {
                let worker = Arc::clone(&self);
                let token = shutdown.clone();
                tokio::spawn(async move { worker.run(token).await })
            })
            .collect()
    }

    /// Process next job from queue (returns true if job was processed)
    pub async fn process_next_job(&self) -> Result<bool> {
        // Already RUNNING in storage when returned
        let mut job = match self.job_repo.pop_next(&self.queue).await? {
            Some(j) => j,
            None => return Ok(false),
        };

        info!(job_id = %job.id, job_type = %job.job_type.as_str(), attempt = %(job.attempts + 1), "Processing job");
        let claimed_at = job.started_at;

        // Handler runs in its own task so a panic cannot take the worker down
        let handler = Arc::clone(&self.handler);
        let claimed = job.clone();
        let outcome = tokio::spawn(async move { handler.handle(&claimed).await }).await;

        match outcome {
            Ok(Ok(())) => {
                job.complete(self.time_provider.now_millis())?;
                if self.write_back(&job, claimed_at).await? {
                    info!(job_id = %job.id, "Job completed");
                }
            }
            Ok(Err(JobFailure::Retryable(msg))) => {
                let requeued = self.retry_policy.handle_failure(&mut job, &msg);
                if self.write_back(&job, claimed_at).await? && !requeued {
                    error!(job_id = %job.id, error = %msg, "Job failed after max attempts");
                }
            }
            Ok(Err(JobFailure::Permanent(msg))) => {
                self.retry_policy.give_up(&mut job, &msg);
                if self.write_back(&job, claimed_at).await? {
                    error!(job_id = %job.id, error = %msg, "Job failed permanently");
                }
            }
            Err(join_err) => {
                let reason = if join_err.is_panic() {
                    format!("Job panicked: {}", panic_message(join_err.into_panic()))
                } else {
                    "Job cancelled".to_string()
                };
                error!(job_id = %job.id, reason = %reason, "Job aborted");
                self.retry_policy.give_up(&mut job, &reason);
                if self.write_back(&job, claimed_at).await? {
                    if let Err(e) = self.handler.abandon(&job, &reason).await {
                        warn!(job_id = %job.id, error = %e, "Failed to record aborted job");
                    }
                }
            }
        }
        Ok(true)
    }

    /// Persist the outcome unless the lease was lost while the handler ran
    async fn write_back(&self, job: &Job, claimed_at: Option<i64>) -> Result<bool> {
        let written = self.job_repo.update_claimed(job, claimed_at).await?;
        if !written {
            warn!(job_id = %job.id, "Lease lost before completion, outcome discarded");
        }
        Ok(written)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Job, JobPayload, JobState, JobType};
    use crate::port::id_provider::mocks::SequentialIdProvider;
    use crate::port::job_handler::mocks::ScriptedJobHandler;
    use crate::port::job_repository::mocks::InMemoryJobRepository;
    use crate::port::time_provider::mocks::ManualClock;
    use crate::port::IdProvider;
    use async_trait::async_trait;
    use serde_json::json;
    use crate::application::recovery::{RecoveryService, LEASE_EXPIRED};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const QUEUE: &str = "property-scoring";

    struct Fixture {
        clock: Arc<ManualClock>,
        repo: Arc<InMemoryJobRepository>,
        ids: SequentialIdProvider,
    }

    impl Fixture {
        fn new() -> Self {
            let clock = Arc::new(ManualClock::new(10_000));
            let repo = Arc::new(InMemoryJobRepository::new(clock.clone()));
            Self {
                clock,
                repo,
                ids: SequentialIdProvider::default(),
            }
        }

        async fn push(&self) -> String {
            let job = Job::new(
                self.ids.generate_id(),
                self.clock.now_millis(),
                QUEUE,
                JobType::score(),
                JobPayload::new(json!({"propertyId": "p1"})),
            );
            self.repo.insert(&job).await.unwrap();
            job.id
        }

        fn worker(&self, handler: Arc<dyn JobHandler>) -> Worker {
            Worker::new(
                QUEUE,
                self.repo.clone(),
                handler,
                Arc::new(RetryPolicy::new(self.clock.clone(), DEFAULT_RETRY_BASE_DELAY_MS)),
                self.clock.clone(),
            )
        }

        async fn job(&self, id: &str) -> Job {
            self.repo.find_by_id(&id.to_string()).await.unwrap().unwrap()
        }
    }

    struct PanickingHandler {
        abandoned: AtomicUsize,
    }

    #[async_trait]
    impl JobHandler for PanickingHandler {
        async fn handle(&self, _job: &Job) -> std::result::Result<(), JobFailure> {
            panic!("scoring blew up");
        }

        async fn abandon(&self, _job: &Job, reason: &str) -> Result<()> {
            assert!(reason.contains("scoring blew up"));
            self.abandoned.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Finishes only after its lease has been recovered
    struct LeaseLosingHandler {
        clock: Arc<ManualClock>,
        recovery: Mutex<Option<RecoveryService>>,
    }

    #[async_trait]
    impl JobHandler for LeaseLosingHandler {
        async fn handle(&self, _job: &Job) -> std::result::Result<(), JobFailure> {
            self.clock.advance(DEFAULT_LEASE_MS + 1);
            let recovery = self.recovery.lock().unwrap().take().unwrap();
            assert_eq!(recovery.recover_expired_leases().await.unwrap(), 1);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_empty_queue() {
        let f = Fixture::new();
        let worker = f.worker(Arc::new(ScriptedJobHandler::default()));
        assert!(!worker.process_next_job().await.unwrap());
    }

    #[tokio::test]
    async fn test_success_marks_done() {
        let f = Fixture::new();
        let id = f.push().await;
        let handler = Arc::new(ScriptedJobHandler::default());
        let worker = f.worker(handler.clone());

        assert!(worker.process_next_job().await.unwrap());

        let job = f.job(&id).await;
        assert_eq!(job.state, JobState::Done);
        assert_eq!(job.attempts, 0);
        assert_eq!(handler.handled(), vec![id]);
    }

    #[tokio::test]
    async fn test_retry_backoff_then_failed() {
        let f = Fixture::new();
        let id = f.push().await;
        let handler = Arc::new(ScriptedJobHandler::new(vec![
            Err(JobFailure::Retryable("upstream down".into())),
            Err(JobFailure::Retryable("upstream down".into())),
            Err(JobFailure::Retryable("upstream down".into())),
        ]));
        let worker = f.worker(handler.clone());

        // Attempt 1 fails; claimable again after 1s
        assert!(worker.process_next_job().await.unwrap());
        let job = f.job(&id).await;
        assert_eq!(job.state, JobState::Queued);
        assert_eq!(job.run_at, 11_000);
        assert!(!worker.process_next_job().await.unwrap());

        // Attempt 2 fails; next backoff is 2s
        f.clock.advance(1_000);
        assert!(worker.process_next_job().await.unwrap());
        assert_eq!(f.job(&id).await.run_at, 13_000);
        f.clock.advance(1_999);
        assert!(!worker.process_next_job().await.unwrap());

        // Attempt 3 fails for good
        f.clock.advance(1);
        assert!(worker.process_next_job().await.unwrap());
        let job = f.job(&id).await;
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.attempts, 3);
        assert_eq!(job.last_error.as_deref(), Some("upstream down"));
        assert_eq!(handler.handled().len(), 3);

        f.clock.advance(60_000);
        assert!(!worker.process_next_job().await.unwrap());
    }

    #[tokio::test]
    async fn test_retry_then_success() {
        let f = Fixture::new();
        let id = f.push().await;
        let handler = Arc::new(ScriptedJobHandler::new(vec![Err(JobFailure::Retryable(
            "timeout".into(),
        ))]));
        let worker = f.worker(handler);

        worker.process_next_job().await.unwrap();
        f.clock.advance(1_000);
        worker.process_next_job().await.unwrap();

        let job = f.job(&id).await;
        assert_eq!(job.state, JobState::Done);
        assert_eq!(job.attempts, 1);
    }

    #[tokio::test]
    async fn test_permanent_failure_skips_retries() {
        let f = Fixture::new();
        let id = f.push().await;
        let handler = Arc::new(ScriptedJobHandler::new(vec![Err(JobFailure::Permanent(
            "Unknown job type: reindex".into(),
        ))]));
        let worker = f.worker(handler);

        worker.process_next_job().await.unwrap();

        let job = f.job(&id).await;
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.attempts, 1);
    }

    #[tokio::test]
    async fn test_panic_is_isolated() {
        let f = Fixture::new();
        let id = f.push().await;
        let handler = Arc::new(PanickingHandler {
            abandoned: AtomicUsize::new(0),
        });
        let worker = f.worker(handler.clone());

        assert!(worker.process_next_job().await.unwrap());

        let job = f.job(&id).await;
        assert_eq!(job.state, JobState::Failed);
        assert!(job.last_error.unwrap().contains("scoring blew up"));
        assert_eq!(handler.abandoned.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_late_outcome_after_lost_lease_is_discarded() {
        let f = Fixture::new();
        let id = f.push().await;
        let handler = Arc::new(LeaseLosingHandler {
            clock: f.clock.clone(),
            recovery: Mutex::new(None),
        });
        let recovery = RecoveryService::new(
            f.repo.clone(),
            Arc::new(ScriptedJobHandler::default()),
            Arc::new(RetryPolicy::new(f.clock.clone(), DEFAULT_RETRY_BASE_DELAY_MS)),
            f.clock.clone(),
            DEFAULT_LEASE_MS,
        );
        *handler.recovery.lock().unwrap() = Some(recovery);
        let worker = f.worker(handler);

        assert!(worker.process_next_job().await.unwrap());

        // Still the requeued state written by recovery, not DONE
        let job = f.job(&id).await;
        assert_eq!(job.state, JobState::Queued);
        assert_eq!(job.attempts, 1);
        assert_eq!(job.last_error.as_deref(), Some(LEASE_EXPIRED));
    }

    #[tokio::test]
    async fn test_fifo_claim_order() {
        let f = Fixture::new();
        let first = f.push().await;
        f.clock.advance(5);
        let second = f.push().await;
        let handler = Arc::new(ScriptedJobHandler::default());
        let worker = f.worker(handler.clone());

        worker.process_next_job().await.unwrap();
        worker.process_next_job().await.unwrap();
        assert_eq!(handler.handled(), vec![first, second]);
    }

    #[tokio::test]
    async fn test_pool_stops_on_shutdown() {
        let f = Fixture::new();
        let worker = Arc::new(f.worker(Arc::new(ScriptedJobHandler::default())));
        let (tx, token) = shutdown_channel();

        let handles = worker.spawn_pool(3, token);
        assert_eq!(handles.len(), 3);

        tx.shutdown();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
    }
}
