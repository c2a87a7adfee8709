// Application Layer - Use Cases and Business Logic

pub mod orchestrator;
pub mod queue;
pub mod recovery;
pub mod retry;
pub mod scoring;
pub mod worker;

// Re-exports
pub use orchestrator::{ScoringOrchestrator, DEFAULT_CACHE_TTL};
pub use queue::{JobOptions, ScoringQueue, DEFAULT_QUEUE};
pub use recovery::RecoveryService;
pub use retry::RetryPolicy;
pub use scoring::{ScoringEngine, ScoringError, ScoringJobHandler};
pub use worker::{shutdown_channel, ShutdownSender, ShutdownToken, Worker};
