// Retry logic (exponential backoff, bounded attempts)
use crate::domain::Job;
use crate::port::TimeProvider;
use std::sync::Arc;
use tracing::{info, warn};

/// Retry decision result
#[derive(Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the job (with backoff delay in ms)
    Retry(i64),
    /// Do not retry, job has failed permanently
    Failed,
}

/// Retry policy
///
/// Determines if a failed job gets another attempt based on:
/// - Failed attempts so far (`job.attempts`, not counting the current one)
/// - Maximum attempts allowed
/// - Backoff factor for exponential delay
pub struct RetryPolicy {
    time_provider: Arc<dyn TimeProvider>,
    base_delay_ms: i64,
}

impl RetryPolicy {
    /// Create a new retry policy
    ///
    /// # Arguments
    /// * `time_provider` - Time provider for current time
    /// * `base_delay_ms` - Delay before the first retry (default: 1000)
    pub fn new(time_provider: Arc<dyn TimeProvider>, base_delay_ms: i64) -> Self {
        Self {
            time_provider,
            base_delay_ms,
        }
    }

    /// Decide what happens after the current attempt failed
    ///
    /// Backoff formula:
    /// delay = base_delay * (backoff_factor ^ failed_attempts_before_this_one)
    ///
    /// With the defaults (3 attempts, 1000ms, factor 2) a job runs at t=0,
    /// retries after 1s, retries again after 2s, then fails for good.
    pub fn should_retry(&self, job: &Job) -> RetryDecision {
        if job.attempts + 1 >= job.max_attempts {
            warn!(
                job_id = %job.id,
                attempts = %(job.attempts + 1),
                max_attempts = %job.max_attempts,
                "Max retry attempts reached"
            );
            return RetryDecision::Failed;
        }

        let delay_ms = (self.base_delay_ms as f64 * job.backoff_factor.powi(job.attempts)) as i64;

        info!(
            job_id = %job.id,
            attempt = %(job.attempts + 1),
            max_attempts = %job.max_attempts,
            delay_ms = %delay_ms,
            "Scheduling retry"
        );

        RetryDecision::Retry(delay_ms)
    }

    /// Requeue a job after a failed attempt, claimable once the delay passes
    pub fn prepare_for_retry(&self, job: &mut Job, delay_ms: i64, error: &str) {
        let now = self.time_provider.now_millis();
        job.attempts += 1;
        job.last_error = Some(error.to_string());
        job.requeue(now + delay_ms);

        info!(
            job_id = %job.id,
            attempt = %job.attempts,
            run_at = %job.run_at,
            "Job prepared for retry"
        );
    }

    /// Mark a job permanently failed after its last attempt
    pub fn give_up(&self, job: &mut Job, error: &str) {
        let now = self.time_provider.now_millis();
        job.attempts += 1;
        job.fail(now, error);
    }

    /// Apply the decision for a failed attempt; true if the job was requeued
    pub fn handle_failure(&self, job: &mut Job, error: &str) -> bool {
        match self.should_retry(job) {
            RetryDecision::Retry(delay_ms) => {
                self.prepare_for_retry(job, delay_ms, error);
                true
            }
            RetryDecision::Failed => {
                self.give_up(job, error);
                false
            }
        }
    }
}
