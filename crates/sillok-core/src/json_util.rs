//! Tolerant JSON extraction from free-form LLM output (§4.6, §4.8).
//!
//! LLM responses are not guaranteed to contain *only* JSON; these helpers
//! locate the first balanced-looking object or array span and parse that,
//! falling back to an empty value on any failure rather than propagating
//! an error, matching the reference contract's "never block the loop on a
//! malformed response" behavior.

use serde_json::Value;

/// Extracts the first `{...}` span from `text` and parses it as a JSON
/// object. Returns an empty object if none is found or parsing fails, or
/// if the parsed value is not itself an object.
#[must_use]
pub fn parse_json_object(text: &str) -> Value {
    let Some(start) = text.find('{') else {
        return Value::Object(serde_json::Map::new());
    };
    let Some(end) = text.rfind('}') else {
        return Value::Object(serde_json::Map::new());
    };
    if end <= start {
        return Value::Object(serde_json::Map::new());
    }
    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(v @ Value::Object(_)) => v,
        _ => Value::Object(serde_json::Map::new()),
    }
}

/// Coerces a JSON value to a doc-id the way Python's `int(x)` would:
/// numbers truncate toward zero, numeric strings parse, everything else
/// (and negative or non-finite values) is rejected.
fn coerce_u32(v: &Value) -> Option<u32> {
    match v {
        Value::Number(n) => n
            .as_u64()
            .map(|n| n as u32)
            .or_else(|| n.as_f64().and_then(float_to_u32)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .map(|n| n as u32)
                .or_else(|| s.parse::<f64>().ok().and_then(float_to_u32))
        }
        _ => None,
    }
}

fn float_to_u32(f: f64) -> Option<u32> {
    if f.is_finite() && f >= 0.0 && f.trunc() <= f64::from(u32::MAX) {
        Some(f.trunc() as u32)
    } else {
        None
    }
}

/// Extracts the first `[...]` span from `text` and parses it as a JSON
/// array of doc-ids, coercing numbers and numeric strings the way
/// Python's `int(x)` would and discarding any element that isn't
/// numeric. Returns an empty vec if none is found or parsing fails.
#[must_use]
pub fn parse_json_id_list(text: &str) -> Vec<u32> {
    let Some(start) = text.find('[') else {
        return Vec::new();
    };
    let Some(end) = text.rfind(']') else {
        return Vec::new();
    };
    if end <= start {
        return Vec::new();
    }
    let Ok(Value::Array(items)) = serde_json::from_str::<Value>(&text[start..=end]) else {
        return Vec::new();
    };
    items.iter().filter_map(coerce_u32).collect()
}
