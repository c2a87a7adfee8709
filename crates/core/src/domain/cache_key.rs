// Cache Key (fingerprint) derivation
//
// Orchestrator and worker both derive keys through `CacheKey::for_request`;
// a job's result is only visible to pollers if the two agree byte-for-byte.

use crate::domain::scoring::{JsonMap, PropertyId};
use serde_json::{Number, Value};

/// Namespace prefix for scoring entries in the shared cache table
pub const CACHE_KEY_PREFIX: &str = "score";

/// Deterministic fingerprint of (property identifier, buyer filter)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// `score:<propertyId>:<canonical filter JSON>`
    pub fn for_request(property_id: &PropertyId, filter: &JsonMap) -> Self {
        let mut key = String::with_capacity(64);
        key.push_str(CACHE_KEY_PREFIX);
        key.push(':');
        key.push_str(&property_id.as_key_segment());
        key.push(':');
        write_canonical_object(filter, &mut key);
        Self(key)
    }

    /// Wrap an already-built key (entries written by other producers)
    pub fn from_raw(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compact JSON with object keys sorted at every depth.
///
/// Does not rely on `serde_json::Map` ordering: enabling `preserve_order`
/// anywhere in the dependency graph would silently change that.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => write_canonical_object(map, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Number(n) => write_number(n, out),
        // Remaining scalars: Display on Value is compact JSON
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Integral floats print as integers so `500000.0` and `500000` share a key
fn write_number(n: &Number, out: &mut String) {
    // Beyond 2^53 a float no longer names a single integer
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;

    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() <= MAX_EXACT => {
            out.push_str(&(f as i64).to_string())
        }
        _ => out.push_str(&n.to_string()),
    }
}

fn write_canonical_object(map: &JsonMap, out: &mut String) {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

    out.push('{');
    for (i, (key, value)) in entries.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&Value::String(key.clone()).to_string());
        out.push(':');
        write_canonical(value, out);
    }
    out.push('}');
}
