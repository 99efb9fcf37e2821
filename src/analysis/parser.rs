//! Extraction of the JSON envelope from free-text model replies.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use super::models::{Category, Issue, ParsedResponse, Severity};

/// Summary used when a reply cannot be parsed.
pub const PARSE_ERROR_SUMMARY: &str = "Error al parsear respuesta";

static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?ims)```json[^\n]*\n(.*?)^[ \t]*```").unwrap());

/// Parses a model reply into a summary and chunk-relative issues.
///
/// Never fails: anything that is not a usable JSON object degrades to
/// [`PARSE_ERROR_SUMMARY`] with no issues and `degraded` set.
pub fn parse_response(raw: &str) -> ParsedResponse {
    // A fenced payload that does not parse still gets the brace fallback
    let value = extract_json(raw)
        .and_then(parse_object)
        .or_else(|| brace_span(raw).and_then(parse_object));

    let Some(Value::Object(obj)) = value else {
        debug!("no usable JSON object in model reply");
        return degraded();
    };

    let summary = obj
        .get("summary")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let issues = obj
        .get("issues")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(coerce_issue).collect())
        .unwrap_or_default();

    ParsedResponse {
        summary,
        issues,
        degraded: false,
    }
}

/// Locates the JSON text in a reply: a ```json fence first, otherwise the
/// span from the first `{` to the last `}`.
///
/// The closing fence must open a line, so backticks quoted inside JSON
/// strings do not end the payload.
pub fn extract_json(raw: &str) -> Option<&str> {
    if let Some(caps) = JSON_FENCE.captures(raw) {
        return caps.get(1).map(|m| m.as_str().trim());
    }
    brace_span(raw)
}

fn brace_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

fn parse_object(payload: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(payload) {
        Ok(v) if v.is_object() => Some(v),
        Ok(_) => None,
        Err(e) => {
            debug!("model reply is not valid JSON: {e}");
            None
        }
    }
}

fn degraded() -> ParsedResponse {
    ParsedResponse {
        summary: PARSE_ERROR_SUMMARY.to_string(),
        issues: Vec::new(),
        degraded: true,
    }
}

/// Normalizes one issue object. Entries without a description are dropped.
fn coerce_issue(value: &Value) -> Option<Issue> {
    let obj = value.as_object()?;

    let description = obj.get("description").and_then(Value::as_str)?.trim();
    if description.is_empty() {
        return None;
    }

    let text = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);

    Some(Issue {
        line: obj.get("line").and_then(coerce_line),
        severity: text("severity")
            .map(|s| Severity::from_label(&s))
            .unwrap_or(Severity::Medium),
        category: text("category")
            .map(|s| Category::from_label(&s))
            .unwrap_or(Category::Quality),
        description: description.to_string(),
        code_snippet: text("codeSnippet")
            .or_else(|| text("code_snippet"))
            .filter(|s| !s.is_empty()),
        suggestion: text("suggestion").unwrap_or_default(),
    })
}

/// Line numbers above this are treated as missing.
const MAX_LINE: u64 = u32::MAX as u64;

fn coerce_line(value: &Value) -> Option<usize> {
    let line = match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0 && *f <= MAX_LINE as f64)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }?;
    (line <= MAX_LINE).then_some(line as usize)
}
