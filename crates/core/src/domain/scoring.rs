// Scoring Domain Model

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Opaque JSON object (buyer filters, property records)
pub type JsonMap = serde_json::Map<String, Value>;

/// Property identifier as supplied by the caller (string or number)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyId(Value);

impl PropertyId {
    pub fn new(value: Value) -> Result<Self> {
        match value {
            Value::String(ref s) if s.is_empty() => Err(DomainError::MissingPropertyId),
            Value::String(_) | Value::Number(_) => Ok(Self(value)),
            Value::Null => Err(DomainError::MissingPropertyId),
            other => Err(DomainError::InvalidPropertyId(other.to_string())),
        }
    }

    /// Resolve from a property record: `id` wins over `propertyId`
    pub fn from_property(property: &JsonMap) -> Result<Self> {
        let present = |field: &str| {
            property
                .get(field)
                .filter(|v| !v.is_null() && v.as_str() != Some(""))
        };

        match present("id").or_else(|| present("propertyId")) {
            Some(value) => Self::new(value.clone()),
            None => Err(DomainError::MissingPropertyId),
        }
    }

    /// Text used inside cache keys (strings unquoted)
    pub fn as_key_segment(&self) -> String {
        match &self.0 {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl std::fmt::Display for PropertyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_key_segment())
    }
}

/// Scoring request (transient; never persisted as-is)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringRequest {
    #[serde(default)]
    pub filter: JsonMap,
    pub property: JsonMap,
}

impl ScoringRequest {
    pub fn new(filter: JsonMap, property: JsonMap) -> Self {
        Self { filter, property }
    }

    pub fn property_id(&self) -> Result<PropertyId> {
        PropertyId::from_property(&self.property)
    }
}

/// Queue payload for a scoring job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringJob {
    pub property_id: PropertyId,
    pub filter: JsonMap,
    pub property: JsonMap,
}

/// Per-category points
///
/// Numbers are kept as `serde_json::Number` so integer scores survive a
/// cache round trip without turning into floats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub price: Number,
    pub location: Number,
    pub specs: Number,
    pub lifestyle: Number,
    pub timing: Number,
    pub sentiment: Number,
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// Structured score produced by the scoring engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringResult {
    pub total_score: Number,
    pub breakdown: ScoreBreakdown,
    pub tier: String,
    pub explanation: String,
    /// Fields the generator added beyond the rubric format
    #[serde(flatten)]
    pub extra: JsonMap,
}

impl ScoringResult {
    pub fn total(&self) -> f64 {
        self.total_score.as_f64().unwrap_or(f64::NAN)
    }
}

/// What the worker writes into the score cache
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CachedPayload {
    Scored(ScoringResult),
    Failed { error: String },
}

impl CachedPayload {
    pub fn failed(error: impl Into<String>) -> Self {
        CachedPayload::Failed {
            error: error.into(),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            CachedPayload::Scored(result) => {
                serde_json::to_value(result).unwrap_or_else(|_| Value::Object(JsonMap::new()))
            }
            CachedPayload::Failed { error } => serde_json::json!({ "error": error }),
        }
    }
}

/// Polling response of the asynchronous scoring path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AsyncScore {
    Scored { result: Value },
    Error { result: Value },
    Pending,
}

impl AsyncScore {
    /// Build the response for a cache hit, stitching the property identity in
    pub fn from_cached(payload: Value, property_id: &PropertyId) -> Self {
        let is_error = payload
            .get("error")
            .map(|e| !e.is_null() && e != &Value::Bool(false) && e.as_str() != Some(""))
            .unwrap_or(false);

        let result = match payload {
            Value::Object(mut map) => {
                map.insert("id".to_string(), property_id.as_value().clone());
                Value::Object(map)
            }
            other => other,
        };

        if is_error {
            AsyncScore::Error { result }
        } else {
            AsyncScore::Scored { result }
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            AsyncScore::Scored { .. } => "scored",
            AsyncScore::Error { .. } => "error",
            AsyncScore::Pending => "pending",
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, AsyncScore::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> JsonMap {
        match value {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_property_id_prefers_id() {
        let property = map(json!({"id": "p-1", "propertyId": "p-2"}));
        let id = PropertyId::from_property(&property).unwrap();
        assert_eq!(id.as_key_segment(), "p-1");
    }

    #[test]
    fn test_property_id_falls_back_to_property_id() {
        let property = map(json!({"id": null, "propertyId": 42}));
        let id = PropertyId::from_property(&property).unwrap();
        assert_eq!(id.as_key_segment(), "42");
        assert_eq!(id.as_value(), &json!(42));
    }

    #[test]
    fn test_property_id_missing() {
        let property = map(json!({"price": 480000}));
        assert!(matches!(
            PropertyId::from_property(&property),
            Err(DomainError::MissingPropertyId)
        ));
    }

    #[test]
    fn test_property_id_rejects_objects() {
        let property = map(json!({"id": {"nested": true}}));
        assert!(matches!(
            PropertyId::from_property(&property),
            Err(DomainError::InvalidPropertyId(_))
        ));
    }

    #[test]
    fn test_scoring_result_keeps_integers_and_extras() {
        let raw = json!({
            "total_score": 95,
            "breakdown": {"price": 20, "location": 20, "specs": 20, "lifestyle": 20, "timing": 10, "sentiment": 5},
            "tier": "Top Match",
            "explanation": "Great fit for the buyer.",
            "confidence": "high"
        });
        let result: ScoringResult = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(result.total(), 95.0);
        assert_eq!(serde_json::to_value(&result).unwrap(), raw);
    }

    #[test]
    fn test_from_cached_injects_and_overwrites_id() {
        let id = PropertyId::new(json!("p-9")).unwrap();
        let scored = AsyncScore::from_cached(json!({"total_score": 80, "id": "stale"}), &id);
        assert_eq!(
            scored,
            AsyncScore::Scored {
                result: json!({"total_score": 80, "id": "p-9"})
            }
        );

        let failed = AsyncScore::from_cached(json!({"error": "boom"}), &id);
        assert_eq!(failed.status(), "error");
    }

    #[test]
    fn test_async_score_wire_shape() {
        assert_eq!(
            serde_json::to_value(AsyncScore::Pending).unwrap(),
            json!({"status": "pending"})
        );
        assert_eq!(
            serde_json::to_value(AsyncScore::Error {
                result: json!({"id": "p", "error": "x"})
            })
            .unwrap(),
            json!({"status": "error", "result": {"id": "p", "error": "x"}})
        );
    }
}
