//! RPC Request/Response Types
//!
//! Scoring methods take and return the domain types directly.

use serde::{Deserialize, Serialize};

pub use propscore_core::domain::{AsyncScore, ScoringRequest, ScoringResult};

/// score.sync.v1 / score.async.v1 params: `{filter, property}`
pub type ScoreRequest = ScoringRequest;

/// admin.stats.v1 - Get queue and cache statistics
#[derive(Debug, Default, Deserialize)]
pub struct StatsRequest {
    // No parameters needed
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsResponse {
    pub queue: String,
    pub queued_jobs: i64,
    pub running_jobs: i64,
    pub done_jobs: i64,
    pub failed_jobs: i64,
    pub cached_entries: i64,
    pub uptime_seconds: i64,
}
