// Scoring prompts

use crate::domain::JsonMap;
use serde_json::Value;

/// Fixed rubric sent as the system message
pub const SYSTEM_PROMPT: &str = r#"You are a real estate scoring assistant. Your job is to evaluate how well a property matches a buyer's preferences. Use the strict rules below to assign a numeric score per category and return a structured JSON response.

### SCORING RULES
1. Price Match (0–20)
- 20 if under budget
- 18 if within 1.5% over budget
- 15 if within 5% over
- 10 if within 10% over
- 0 if more than 10% over

2. Location Match (0–20)
- 20 if ZIP/neighborhood preferred
- 15 if secondary area
- 10 if acceptable commute
- 5 if within general area
- 0 if far

3. Specs Match (0–20)
- Bedrooms: 10 pts (meets or exceeds = full)
- Bathrooms: 5 pts (same logic)
- Square Feet: 5 pts (meets or exceeds)
- +2 bonus if garage/basement required and present

4. Lifestyle Match (0–20)
- Tags: pool, HOA, charm, modern, fenced yard, open kitchen, home office, walkable, golf, etc.
- ≥80% = 20 pts
- 60–79% = 15 pts
- 40–59% = 10 pts
- 20–39% = 5 pts
- <20% = 0 pts

5. Timing Fit (0–10)
- High urgency + Active/Vacant = 10
- Medium + Yellow = 6
- Low urgency or delayed = 4
- No fit = 0

6. Seller Sentiment (0–10)
- Green = 10
- Yellow = 6
- Unknown = 3
- Red = 0

Return in this format:
{
  "total_score": [number 0–100],
  "breakdown": {
    "price": [0–20],
    "location": [0–20],
    "specs": [0–20],
    "lifestyle": [0–20],
    "timing": [0–10],
    "sentiment": [0–10]
  },
  "tier": "Top Match | Great Fit | Possible Option | Mismatch",
  "explanation": "short reasoning"
}
"#;

/// User message embedding both records as pretty-printed JSON
pub fn build_user_prompt(filter: &JsonMap, property: &JsonMap) -> String {
    format!(
        "Evaluate the following property against the buyer's preferences (filter).\n\n### Buyer Filter\n{:#}\n\n### Property\n{:#}\n",
        Value::Object(filter.clone()),
        Value::Object(property.clone()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_prompt_layout() {
        let filter: JsonMap = serde_json::from_value(json!({"budget": 500000})).unwrap();
        let property: JsonMap = serde_json::from_value(json!({"id": "p1"})).unwrap();

        let prompt = build_user_prompt(&filter, &property);
        assert_eq!(
            prompt,
            "Evaluate the following property against the buyer's preferences (filter).\n\n\
             ### Buyer Filter\n{\n  \"budget\": 500000\n}\n\n\
             ### Property\n{\n  \"id\": \"p1\"\n}\n"
        );
    }

    #[test]
    fn test_system_prompt_has_price_thresholds() {
        assert!(SYSTEM_PROMPT.contains("18 if within 1.5% over budget"));
        assert!(SYSTEM_PROMPT.contains("Top Match | Great Fit | Possible Option | Mismatch"));
    }
}
