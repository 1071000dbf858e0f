//! Credential scrubbing for structured log fields.

use serde_json::{Map, Value};
use std::collections::HashMap;

/// Replacement written in place of sensitive values.
pub const REDACTED: &str = "[REDACTED]";

/// Substrings that mark a field name as carrying a credential.
const DENYLIST_KEYS: &[&str] = &[
    "token",
    "password",
    "authorization",
    "refresh",
    "access",
    "secret",
    "cookie",
];

/// Redact every sensitive entry of a field map.
pub fn redact_fields(fields: &HashMap<String, Value>) -> HashMap<String, Value> {
    fields
        .iter()
        .map(|(key, value)| (key.clone(), redact_value(key, value)))
        .collect()
}

fn redact_value(key: &str, value: &Value) -> Value {
    if is_sensitive_key(key) {
        return Value::String(REDACTED.to_string());
    }

    match value {
        Value::String(s) => redact_string(s),
        Value::Object(map) => {
            let mut out = Map::new();
            for (k, v) in map {
                out.insert(k.clone(), redact_value(k, v));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(|item| redact_value(key, item)).collect()),
        _ => value.clone(),
    }
}

/// Scrub a free-form string (also applied to log messages).
pub(crate) fn redact_string(raw: &str) -> Value {
    if looks_like_credential(raw) {
        return Value::String(REDACTED.to_string());
    }
    Value::String(raw.to_string())
}

fn looks_like_credential(raw: &str) -> bool {
    let trimmed = raw.trim();
    if trimmed.to_ascii_lowercase().starts_with("bearer ") {
        return true;
    }
    // header.payload.signature
    trimmed.matches('.').count() == 2
        && trimmed.len() > 40
        && !trimmed.contains(char::is_whitespace)
}

fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    DENYLIST_KEYS.iter().any(|entry| lower.contains(entry))
}
