// Port Layer - Interfaces for external dependencies

pub mod id_provider; // For deterministic testing
pub mod job_handler;
pub mod job_repository;
pub mod score_cache;
pub mod text_generator;
pub mod time_provider;

// Re-exports
pub use id_provider::IdProvider;
pub use job_handler::{JobFailure, JobHandler};
pub use job_repository::JobRepository;
pub use score_cache::{CacheEntry, ScoreCache};
pub use text_generator::{Completion, CompletionRequest, TextGenerator, UpstreamError};
pub use time_provider::TimeProvider;
