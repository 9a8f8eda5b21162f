//! Response parser: pulls the extraction fragment out of raw model output.
//!
//! Models wrap their JSON in prose ("Sure! Here you go: {...} Hope that
//! helps."), so the parser takes the greedy span from the first `{` to the
//! last `}` and tries to decode that. Known limitation, kept deliberately:
//! multiple or nested unrelated JSON blocks in one response are not
//! disambiguated — the outermost greedy span is the only candidate. The
//! heuristic lives behind this function so a stricter grammar-aware extractor
//! could replace it without touching the merge engine.

use serde_json::{Map, Value};

/// Extract the first JSON object from raw model output.
///
/// Returns `None` ("no extraction") when no object-shaped span exists or the
/// span fails to decode as a JSON object. Both cases are logged and
/// non-fatal: a single bad model response must not abort the conversation.
pub fn extract_fragment(raw: &str) -> Option<Map<String, Value>> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        tracing::warn!("No JSON object span in extraction response");
        return None;
    }

    match serde_json::from_str::<Value>(&raw[start..=end]) {
        Ok(Value::Object(fragment)) => Some(fragment),
        Ok(other) => {
            tracing::warn!(
                "Extraction span decoded to a non-object JSON value: {}",
                kind_of(&other)
            );
            None
        }
        Err(e) => {
            tracing::warn!("Failed to decode extraction span as JSON: {}", e);
            None
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
