//! Structured payload extraction from free-form service text.
//!
//! Accepted shapes, in order: a ```` ```json ```` fenced block, an unlabeled
//! ```` ``` ```` fence whose body is JSON, or a body that is JSON on its own.
//! Anything else is [`ExtractError::NoStructuredBlock`].

use serde_json::Value;

use crate::error::ExtractError;

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// Parse the first structured block out of `text`.
pub fn parse_structured_block(text: &str) -> Result<Value, ExtractError> {
    let block = find_block(text).ok_or(ExtractError::NoStructuredBlock)?;
    serde_json::from_str(block).map_err(|e| ExtractError::InvalidJson(e.to_string()))
}

fn find_block(text: &str) -> Option<&str> {
    let lower = text.to_ascii_lowercase();
    if let Some(start) = lower.find(JSON_FENCE) {
        return fenced_body(text, start + JSON_FENCE.len());
    }
    if let Some(start) = text.find(FENCE) {
        let body = fenced_body(text, start + FENCE.len())?;
        return looks_like_json(body).then_some(body);
    }
    let trimmed = text.trim();
    looks_like_json(trimmed).then_some(trimmed)
}

/// Body between `from` and the next closing fence.
fn fenced_body(text: &str, from: usize) -> Option<&str> {
    let rest = &text[from..];
    let end = rest.find(FENCE)?;
    Some(rest[..end].trim())
}

fn looks_like_json(s: &str) -> bool {
    s.starts_with('{') || s.starts_with('[')
}

/// Split a payload into per-record objects.
///
/// Arrays yield their elements. An object with exactly one array-valued key
/// (`{"users": [...]}`) yields that array. Any other object is one record.
pub fn record_objects(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(map) => {
            if map.len() == 1 && map.values().all(Value::is_array) {
                match map.into_iter().next() {
                    Some((_, Value::Array(items))) => items,
                    _ => Vec::new(),
                }
            } else {
                vec![Value::Object(map)]
            }
        }
        other => vec![other],
    }
}
