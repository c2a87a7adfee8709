// LLM response parsing

use super::ScoringError;
use crate::domain::ScoringResult;
use crate::port::Completion;
use serde_json::Value;

pub const NO_JSON_FOUND: &str = "No JSON found in LLM response";
pub const UNEXPECTED_FORMAT: &str = "Unexpected LLM response format";

/// Slice from the first `{` to the last `}`, if any
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Turn a completion into a validated scoring result
pub fn parse_scoring_result(completion: Completion) -> Result<ScoringResult, ScoringError> {
    let value = match completion {
        Completion::Text(text) => {
            let json = extract_json_object(&text)
                .ok_or_else(|| ScoringError::Parse(NO_JSON_FOUND.to_string()))?;
            serde_json::from_str::<Value>(json).map_err(|e| {
                ScoringError::Parse(format!("Failed to parse LLM response: {}", e))
            })?
        }
        Completion::Structured(value @ Value::Object(_)) => value,
        Completion::Structured(_) => return Err(ScoringError::Parse(UNEXPECTED_FORMAT.to_string())),
    };

    let result: ScoringResult = serde_json::from_value(value)
        .map_err(|e| ScoringError::Parse(format!("Invalid scoring result: {}", e)))?;

    let total = result.total();
    if !(0.0..=100.0).contains(&total) {
        return Err(ScoringError::Parse(format!(
            "total_score out of range: {}",
            result.total_score
        )));
    }

    Ok(result)
}
