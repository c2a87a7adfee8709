// Job Repository Port (Interface)

use crate::domain::{Job, JobId, JobState};
use crate::error::Result;
use async_trait::async_trait;

/// Repository interface for Job persistence
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Insert a new job (durable once this returns)
    async fn insert(&self, job: &Job) -> Result<()>;

    /// Find job by ID
    async fn find_by_id(&self, id: &JobId) -> Result<Option<Job>>;

    /// Update job
    async fn update(&self, job: &Job) -> Result<()>;

    /// Write back a job claimed at `claimed_at`, only while that claim holds
    ///
    /// Returns false if the job is no longer RUNNING under the same claim
    /// (its lease was recovered, possibly followed by a new claim).
    async fn update_claimed(&self, job: &Job, claimed_at: Option<i64>) -> Result<bool>;

    /// Atomically claim the next eligible job (QUEUED, `run_at <= now`, FIFO)
    ///
    /// The returned job is already RUNNING with `started_at = now`.
    async fn pop_next(&self, queue: &str) -> Result<Option<Job>>;

    /// Count jobs by state
    async fn count_by_state(&self, queue: &str, state: JobState) -> Result<i64>;

    /// Find all jobs by state (for lease recovery)
    async fn find_by_state(&self, state: JobState) -> Result<Vec<Job>>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use crate::port::TimeProvider;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    /// In-memory queue with the same claim semantics as the SQLite adapter
    pub struct InMemoryJobRepository {
        jobs: Mutex<Vec<Job>>,
        time_provider: Arc<dyn TimeProvider>,
        reject_inserts: AtomicBool,
    }

    impl InMemoryJobRepository {
        pub fn new(time_provider: Arc<dyn TimeProvider>) -> Self {
            Self {
                jobs: Mutex::new(Vec::new()),
                time_provider,
                reject_inserts: AtomicBool::new(false),
            }
        }

        /// Simulate an unreachable queue backend
        pub fn set_reject_inserts(&self, reject: bool) {
            self.reject_inserts.store(reject, Ordering::SeqCst);
        }

        pub fn all(&self) -> Vec<Job> {
            self.jobs.lock().unwrap().clone()
        }

        pub fn len(&self) -> usize {
            self.jobs.lock().unwrap().len()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    #[async_trait]
    impl JobRepository for InMemoryJobRepository {
        async fn insert(&self, job: &Job) -> Result<()> {
            if self.reject_inserts.load(Ordering::SeqCst) {
                return Err(AppError::Database("connection refused".to_string()));
            }
            self.jobs.lock().unwrap().push(job.clone());
            Ok(())
        }

        async fn find_by_id(&self, id: &JobId) -> Result<Option<Job>> {
            Ok(self.jobs.lock().unwrap().iter().find(|j| &j.id == id).cloned())
        }

        async fn update(&self, job: &Job) -> Result<()> {
            let mut jobs = self.jobs.lock().unwrap();
            match jobs.iter_mut().find(|j| j.id == job.id) {
                Some(slot) => {
                    *slot = job.clone();
                    Ok(())
                }
                None => Err(AppError::NotFound(format!("Job {} not found", job.id))),
            }
        }

        async fn update_claimed(&self, job: &Job, claimed_at: Option<i64>) -> Result<bool> {
            let mut jobs = self.jobs.lock().unwrap();
            match jobs.iter_mut().find(|j| j.id == job.id) {
                Some(slot) if slot.state == JobState::Running && slot.started_at == claimed_at => {
                    *slot = job.clone();
                    Ok(true)
                }
                Some(_) => Ok(false),
                None => Err(AppError::NotFound(format!("Job {} not found", job.id))),
            }
        }

        async fn pop_next(&self, queue: &str) -> Result<Option<Job>> {
            let now = self.time_provider.now_millis();
            let mut jobs = self.jobs.lock().unwrap();
            let next = jobs
                .iter_mut()
                .filter(|j| j.queue == queue && j.state == JobState::Queued && j.run_at <= now)
                .min_by(|a, b| {
                    (a.run_at, a.created_at, &a.id).cmp(&(b.run_at, b.created_at, &b.id))
                });

            match next {
                Some(job) => {
                    job.start(now)?;
                    Ok(Some(job.clone()))
                }
                None => Ok(None),
            }
        }

        async fn count_by_state(&self, queue: &str, state: JobState) -> Result<i64> {
            let jobs = self.jobs.lock().unwrap();
            Ok(jobs
                .iter()
                .filter(|j| j.queue == queue && j.state == state)
                .count() as i64)
        }

        async fn find_by_state(&self, state: JobState) -> Result<Vec<Job>> {
            let jobs = self.jobs.lock().unwrap();
            Ok(jobs.iter().filter(|j| j.state == state).cloned().collect())
        }
    }
}
