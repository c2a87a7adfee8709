// Lease recovery: redeliver jobs whose worker vanished mid-processing
use crate::application::retry::RetryPolicy;
use crate::application::worker::ShutdownToken;
use crate::domain::{Job, JobState};
use crate::error::Result;
use crate::port::{JobHandler, JobRepository, TimeProvider};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

pub const LEASE_EXPIRED: &str = "Lease expired";

/// Lease recovery service
///
/// A RUNNING job whose `started_at` is older than the lease is treated as a
/// failed attempt: it goes back to the queue under the normal retry policy,
/// or fails for good when its attempts are used up. In that last case the
/// handler is told so it can leave a terminal result for pollers.
pub struct RecoveryService {
    job_repo: Arc<dyn JobRepository>,
    handler: Arc<dyn JobHandler>,
    retry_policy: Arc<RetryPolicy>,
    time_provider: Arc<dyn TimeProvider>,
    lease_ms: i64,
}

impl RecoveryService {
    pub fn new(
        job_repo: Arc<dyn JobRepository>,
        handler: Arc<dyn JobHandler>,
        retry_policy: Arc<RetryPolicy>,
        time_provider: Arc<dyn TimeProvider>,
        lease_ms: i64,
    ) -> Self {
        Self {
            job_repo,
            handler,
            retry_policy,
            time_provider,
            lease_ms,
        }
    }

    /// One sweep over RUNNING jobs; returns how many were recovered
    pub async fn recover_expired_leases(&self) -> Result<usize> {
        let cutoff = self.time_provider.now_millis() - self.lease_ms;
        let running_jobs = self.job_repo.find_by_state(JobState::Running).await?;
        let mut recovered_count = 0;

        for mut job in running_jobs {
            let claimed_at = job.started_at;
            let requeued = match claimed_at {
                Some(started_at) if started_at >= cutoff => continue,
                Some(started_at) => {
                    info!(job_id = %job.id, started_at = %started_at, cutoff = %cutoff, "Recovering job with expired lease");
                    self.retry_policy.handle_failure(&mut job, LEASE_EXPIRED)
                }
                None => {
                    warn!(job_id = %job.id, "RUNNING job without started_at, marking as FAILED");
                    self.retry_policy.give_up(&mut job, LEASE_EXPIRED);
                    false
                }
            };

            // The worker may have reported back since the scan
            if !self.job_repo.update_claimed(&job, claimed_at).await? {
                continue;
            }
            if !requeued {
                self.abandon(&job).await;
            }
            recovered_count += 1;
        }

        if recovered_count > 0 {
            info!(recovered_count = %recovered_count, "Lease recovery complete");
        }
        Ok(recovered_count)
    }

    async fn abandon(&self, job: &Job) {
        if let Err(e) = self.handler.abandon(job, LEASE_EXPIRED).await {
            error!(job_id = %job.id, error = %e, "Failed to record abandoned job");
        }
    }

    /// Sweep every `interval` until shutdown
    pub async fn run(&self, interval: Duration, mut shutdown: ShutdownToken) {
        loop {
            if let Err(e) = self.recover_expired_leases().await {
                error!(error = %e, "Lease recovery sweep failed");
            }
            tokio::select! {
                _ = sleep(interval) => {},
                _ = shutdown.wait() => break,
            }
        }
    }
}
