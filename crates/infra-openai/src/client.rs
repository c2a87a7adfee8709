// OpenAI-compatible TextGenerator

use crate::config::OpenAiConfig;
use async_trait::async_trait;
use propscore_core::port::{Completion, CompletionRequest, TextGenerator, UpstreamError};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

/// Upper bound on error bodies copied into UpstreamError::Status
const MAX_ERROR_BODY: usize = 512;

pub struct OpenAiTextGenerator {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiTextGenerator {
    /// A missing API key is reported per call, so cached scores stay servable
    pub fn new(config: OpenAiConfig) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.timeout())
            .build()
            .map_err(|e| UpstreamError::Config(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

/// Chat completions body: system + user message
pub fn build_request_body(model: &str, request: &CompletionRequest) -> Value {
    json!({
        "model": model,
        "messages": [
            {"role": "system", "content": request.system_prompt},
            {"role": "user", "content": request.user_prompt},
        ],
        "temperature": request.temperature,
    })
}

/// Pull the first choice's message content out of a response body
pub fn completion_from_response(body: &Value) -> Result<Completion, UpstreamError> {
    let message = &body["choices"][0]["message"];

    // Structured-output responses carry the object in `parsed`
    if let Some(parsed @ Value::Object(_)) = message.get("parsed") {
        return Ok(Completion::Structured(parsed.clone()));
    }

    match message.get("content") {
        Some(Value::String(text)) if !text.is_empty() => Ok(Completion::Text(text.clone())),
        Some(structured @ (Value::Object(_) | Value::Array(_))) => {
            Ok(Completion::Structured(structured.clone()))
        }
        _ => Err(UpstreamError::InvalidResponse(
            "missing message content".into(),
        )),
    }
}

#[async_trait]
impl TextGenerator for OpenAiTextGenerator {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, UpstreamError> {
        if self.config.api_key.is_empty() {
            return Err(UpstreamError::Config("OPENAI_API_KEY is not set".into()));
        }

        let body = build_request_body(&self.config.model, request);
        debug!(model = %self.config.model, "Requesting chat completion");

        let response = self
            .client
            .post(self.config.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    UpstreamError::Timeout
                } else {
                    UpstreamError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let mut text = response.text().await.unwrap_or_default();
            text.truncate(
                text.char_indices()
                    .nth(MAX_ERROR_BODY)
                    .map(|(i, _)| i)
                    .unwrap_or(text.len()),
            );
            warn!(status = %status.as_u16(), "Chat completion rejected");
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| UpstreamError::InvalidResponse(e.to_string()))?;

        completion_from_response(&json)
    }
}
