// Property scoring: prompt, LLM call, response parsing, worker-side handler

pub mod engine;
pub mod job_handler;
pub mod parse;
pub mod prompt;

pub use engine::ScoringEngine;
pub use job_handler::ScoringJobHandler;
pub use parse::parse_scoring_result;

use crate::port::UpstreamError;
use thiserror::Error;

/// Scoring failures; the message is what ends up in cached `{error}` payloads
#[derive(Error, Debug)]
pub enum ScoringError {
    /// Response carried no usable scoring object
    #[error("{0}")]
    Parse(String),

    /// The generation call itself failed
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}
