// Scoring Engine

use super::parse::parse_scoring_result;
use super::prompt::{build_user_prompt, SYSTEM_PROMPT};
use super::ScoringError;
use crate::domain::{JsonMap, ScoringResult};
use crate::port::{CompletionRequest, TextGenerator};
use std::sync::Arc;
use tracing::{debug, warn};

/// Deterministic sampling; the rubric is meant to be applied, not improvised
const SCORING_TEMPERATURE: f32 = 0.0;

/// Scores one property against one buyer filter through the text generator
#[derive(Clone)]
pub struct ScoringEngine {
    generator: Arc<dyn TextGenerator>,
}

impl ScoringEngine {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// One generation call, no caching and no retries
    ///
    /// # Errors
    /// - ScoringError::Upstream if the generation call fails
    /// - ScoringError::Parse if the reply holds no valid scoring object
    pub async fn score(
        &self,
        filter: &JsonMap,
        property: &JsonMap,
    ) -> Result<ScoringResult, ScoringError> {
        let request = CompletionRequest {
            system_prompt: SYSTEM_PROMPT.to_string(),
            user_prompt: build_user_prompt(filter, property),
            temperature: SCORING_TEMPERATURE,
        };

        let completion = self.generator.complete(&request).await.map_err(|e| {
            warn!(error = %e, "Text generation failed");
            ScoringError::from(e)
        })?;

        let result = parse_scoring_result(completion).map_err(|e| {
            warn!(error = %e, "Unparseable scoring response");
            e
        })?;

        debug!(total_score = %result.total_score, tier = %result.tier, "Property scored");
        Ok(result)
    }
}
