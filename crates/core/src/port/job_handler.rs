// Job Handler Port
// What a worker runs for each claimed job

use crate::domain::Job;
use crate::error::Result;
use async_trait::async_trait;
use thiserror::Error;

/// How a handler failure feeds the retry policy
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobFailure {
    /// Eligible for another attempt (subject to the attempt budget)
    #[error("{0}")]
    Retryable(String),

    /// Retrying cannot help (malformed payload, unknown job type)
    #[error("{0}")]
    Permanent(String),
}

impl JobFailure {
    pub fn message(&self) -> &str {
        match self {
            JobFailure::Retryable(msg) | JobFailure::Permanent(msg) => msg,
        }
    }
}

/// Job handler trait
///
/// Implementations:
/// - ScoringJobHandler: scores a property and writes the outcome to the cache
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Process one claimed job
    async fn handle(&self, job: &Job) -> std::result::Result<(), JobFailure>;

    /// Called when a job is given up on outside `handle` (lease expired on
    /// the last attempt), so the handler can record a terminal outcome.
    async fn abandon(&self, _job: &Job, _reason: &str) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Handler that replays scripted outcomes, then succeeds
    #[derive(Default)]
    pub struct ScriptedJobHandler {
        outcomes: Mutex<VecDeque<std::result::Result<(), JobFailure>>>,
        handled: Mutex<Vec<String>>,
        abandoned: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedJobHandler {
        pub fn new(outcomes: Vec<std::result::Result<(), JobFailure>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                ..Default::default()
            }
        }

        pub fn handled(&self) -> Vec<String> {
            self.handled.lock().unwrap().clone()
        }

        pub fn abandoned(&self) -> Vec<(String, String)> {
            self.abandoned.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl JobHandler for ScriptedJobHandler {
        async fn handle(&self, job: &Job) -> std::result::Result<(), JobFailure> {
            self.handled.lock().unwrap().push(job.id.clone());
            self.outcomes.lock().unwrap().pop_front().unwrap_or(Ok(()))
        }

        async fn abandon(&self, job: &Job, reason: &str) -> Result<()> {
            self.abandoned
                .lock()
                .unwrap()
                .push((job.id.clone(), reason.to_string()));
            Ok(())
        }
    }
}
