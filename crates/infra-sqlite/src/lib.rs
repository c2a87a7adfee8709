// Propscore Infrastructure - SQLite Adapter
// Implements: JobRepository (durable queue), ScoreCache (cached_responses)

mod connection;
mod error;
mod job_repository;
mod migration;
mod score_cache;

pub use connection::create_pool;
pub use job_repository::SqliteJobRepository;
pub use migration::run_migrations;
pub use score_cache::SqliteScoreCache;

// Note: sqlx::Error conversion goes through error::map_sqlx_error
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
