// Text Generation Port
// Abstraction over the external LLM used by the scoring engine

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// One system + user exchange
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
}

/// Message body returned by the generator
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// Free text, possibly with a JSON object embedded in prose
    Text(String),
    /// Provider already returned structured content
    Structured(Value),
}

/// Failures of the generation call itself
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("Text generation request failed: {0}")]
    Transport(String),

    #[error("Text generation request timed out")]
    Timeout,

    #[error("Text generation service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response from text generation service: {0}")]
    InvalidResponse(String),

    #[error("Text generation client misconfigured: {0}")]
    Config(String),
}

/// Text generator trait
///
/// Implementations:
/// - OpenAiTextGenerator (infra-openai): OpenAI-compatible chat completions
/// - MockTextGenerator: canned replies for tests
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Run one completion
    ///
    /// # Errors
    /// - UpstreamError::Transport / Timeout on network failure
    /// - UpstreamError::Status on non-2xx responses (auth, quota, ...)
    /// - UpstreamError::InvalidResponse if the body carries no message content
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, UpstreamError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Mock generator behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Reply with this completion
        Reply(Completion),
        /// Fail with an upstream transport error
        Fail(String),
        /// Panic with message (for panic isolation testing)
        Panic(String),
    }

    /// Mock Text Generator for testing
    ///
    /// Scripted behaviors are consumed in order; once exhausted the default
    /// behavior repeats.
    pub struct MockTextGenerator {
        default: MockBehavior,
        script: Mutex<VecDeque<MockBehavior>>,
        requests: Arc<Mutex<Vec<CompletionRequest>>>,
    }

    impl MockTextGenerator {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                default: behavior,
                script: Mutex::new(VecDeque::new()),
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn new_text(text: impl Into<String>) -> Self {
            Self::new(MockBehavior::Reply(Completion::Text(text.into())))
        }

        pub fn new_structured(value: Value) -> Self {
            Self::new(MockBehavior::Reply(Completion::Structured(value)))
        }

        pub fn new_fail(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Fail(message.into()))
        }

        pub fn new_panic_inducing(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Panic(message.into()))
        }

        /// Queue behaviors to use before falling back to the default
        pub fn with_script(self, script: Vec<MockBehavior>) -> Self {
            *self.script.lock().unwrap() = script.into();
            self
        }

        pub fn call_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn last_request(&self) -> Option<CompletionRequest> {
            self.requests.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl TextGenerator for MockTextGenerator {
        async fn complete(&self, request: &CompletionRequest) -> Result<Completion, UpstreamError> {
            self.requests.lock().unwrap().push(request.clone());

            let behavior = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.default.clone());

            match behavior {
                MockBehavior::Reply(completion) => Ok(completion),
                MockBehavior::Fail(msg) => Err(UpstreamError::Transport(msg)),
                MockBehavior::Panic(msg) => {
                    panic!("{}", msg); // Actually panic for panic isolation testing
                }
            }
        }
    }
}
