//! Response parser — recovers an `AnalysisRecord` from the scoring pass's free text.
//!
//! Two stages: decode (fences, double-encoded strings, surrounding prose) then
//! validate (typed decode + range checks). Nothing from the model is trusted
//! before both stages pass.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::analysis::record::{AnalysisRecord, SchemaWarning};
use crate::errors::AnalysisError;

/// How many JSON-string layers are unwrapped before giving up.
const MAX_STRING_UNWRAPS: u8 = 2;

const ENVELOPE_KEY: &str = "resume_analysis";

/// A validated record and the soft inconsistencies found while validating it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedAnalysis {
    pub record: AnalysisRecord,
    pub warnings: Vec<SchemaWarning>,
}

/// Parses the raw scoring response.
///
/// Accepts a bare JSON object, a fenced ```json block, or a JSON string that
/// itself contains either of those. The object may be the `resume_analysis`
/// envelope or the analysis itself.
pub fn parse(raw: &str) -> Result<ParsedAnalysis, AnalysisError> {
    let object = decode_object(raw, 0)?;
    let analysis = unwrap_envelope(object);

    let mut record: AnalysisRecord = serde_json::from_value(Value::Object(analysis))
        .map_err(|e| AnalysisError::SchemaViolation(e.to_string()))?;

    let warnings = record.validate()?;
    for warning in &warnings {
        warn!("Analysis response inconsistency: {warning:?}");
    }

    Ok(ParsedAnalysis { record, warnings })
}

fn decode_object(raw: &str, depth: u8) -> Result<Map<String, Value>, AnalysisError> {
    let trimmed = raw.trim();

    if let Some(found) = interpret(trimmed, depth)? {
        return Ok(found);
    }

    for candidate in json_candidates(trimmed) {
        if candidate == trimmed {
            continue;
        }
        // a candidate that fails to decode just yields to the next one
        if let Ok(Some(found)) = interpret(candidate, depth) {
            return Ok(found);
        }
    }

    Err(AnalysisError::MalformedResponse(preview(trimmed)))
}

/// Parses `text` as JSON. Objects are returned, strings are decoded one level deeper,
/// anything else (including a parse failure) yields `None`.
fn interpret(text: &str, depth: u8) -> Result<Option<Map<String, Value>>, AnalysisError> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(object)) => Ok(Some(object)),
        Ok(Value::String(inner)) if depth < MAX_STRING_UNWRAPS => {
            decode_object(&inner, depth + 1).map(Some)
        }
        _ => Ok(None),
    }
}

/// Possible JSON payloads inside surrounding text, in the order they are tried:
/// the body of the first triple-backtick fence, then the span from the first `{`
/// to the last `}`. A ``` inside a JSON string value must not hide the brace span.
fn json_candidates(text: &str) -> impl Iterator<Item = &str> {
    let fenced = fenced_body(text).map(str::trim);
    let braces = brace_span(text);
    fenced.into_iter().chain(braces)
}

fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// Body of the first ``` fence, skipping an optional language tag on the opening line.
/// An unterminated fence runs to the end of the text.
fn fenced_body(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_ticks = &text[open + 3..];
    let body_start = after_ticks.find('\n').map(|i| i + 1)?;
    let body = &after_ticks[body_start..];
    Some(match body.find("```") {
        Some(close) => &body[..close],
        None => body,
    })
}

fn unwrap_envelope(mut object: Map<String, Value>) -> Map<String, Value> {
    match object.remove(ENVELOPE_KEY) {
        Some(Value::Object(inner)) => inner,
        Some(other) => {
            // keep the original shape so the schema error names the bad field
            object.insert(ENVELOPE_KEY.to_string(), other);
            object
        }
        None => object,
    }
}

fn preview(text: &str) -> String {
    const LIMIT: usize = 80;
    if text.chars().count() <= LIMIT {
        return text.to_string();
    }
    let cut: String = text.chars().take(LIMIT).collect();
    format!("{cut}…")
}
