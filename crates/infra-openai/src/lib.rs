// Propscore Infrastructure - OpenAI Adapter
// Implements: TextGenerator over OpenAI-compatible /chat/completions

mod client;
mod config;

pub use client::{build_request_body, completion_from_response, OpenAiTextGenerator};
pub use config::{OpenAiConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
