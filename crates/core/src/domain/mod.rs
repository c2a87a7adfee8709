// Domain Layer - Pure business logic and entities

pub mod cache_key;
pub mod error;
pub mod job;
pub mod scoring;

// Re-exports
pub use cache_key::{canonical_json, CacheKey};
pub use error::DomainError;
pub use job::{Job, JobId, JobPayload, JobState, JobType, QueueId};
pub use scoring::{
    AsyncScore, CachedPayload, JsonMap, PropertyId, ScoreBreakdown, ScoringJob, ScoringRequest,
    ScoringResult,
};
