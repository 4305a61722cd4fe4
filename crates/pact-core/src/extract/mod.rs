//! Recovery of structured data from free-form model output.
//!
//! Models wrap JSON in prose or markdown fences, or emit near-JSON with
//! single quotes and trailing commas. [`extract`] tries the strategies in
//! [`STRATEGIES`] from strictest to most lenient and returns the first
//! success.

pub mod literal;

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::{ExtractionError, StageError};
use crate::plan::Plan;

pub use literal::{LiteralError, parse_literal, parse_sequence};

/// One way of turning raw text into a structured value.
pub type Strategy = fn(&str) -> Result<Value, String>;

/// Extraction strategies in priority order.
pub const STRATEGIES: [(&str, Strategy); 5] = [
    ("fenced_block", fenced_block),
    ("brace_span", brace_span),
    ("trimmed_whole", trimmed_whole),
    ("lenient_literal", lenient_literal),
    ("json5", secondary_parser),
];

static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```json\s*(\{.*?\})\s*```").expect("fenced block pattern is valid")
});

/// A structured value and the strategy that recovered it.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub value: Value,
    pub strategy: &'static str,
}

/// Run every strategy in order until one parses.
pub fn extract(raw: &str) -> Result<Extracted, ExtractionError> {
    let mut failures = Vec::with_capacity(STRATEGIES.len());
    for (name, strategy) in STRATEGIES {
        match strategy(raw) {
            Ok(value) => {
                tracing::debug!(strategy = name, "extracted structured value");
                return Ok(Extracted {
                    value,
                    strategy: name,
                });
            }
            Err(reason) => failures.push((name, reason)),
        }
    }
    tracing::warn!(raw_chars = raw.chars().count(), "no extraction strategy succeeded");
    Err(ExtractionError { failures })
}

/// Extract, convert and validate a plan in one step.
pub fn extract_plan(raw: &str) -> Result<Plan, StageError> {
    let extracted = extract(raw)?;
    let plan = Plan::from_value(extracted.value)?;
    plan.validate()?;
    Ok(plan)
}

/// Extract a flat list of steps from list-literal output such as
/// `["步骤1", "步骤2"]`.
///
/// Tries the whole trimmed text first, then the span between the first `[`
/// and the last `]`. Strings are trimmed, numbers and booleans stringified;
/// nulls, nested lists and mappings are dropped.
pub fn extract_steps(raw: &str) -> Result<Vec<String>, StageError> {
    let trimmed = strip_fence(raw);
    let items = parse_sequence(trimmed).or_else(|first_err| {
        match (trimmed.find('['), trimmed.rfind(']')) {
            (Some(start), Some(end)) if end > start => parse_sequence(&trimmed[start..=end]),
            _ => Err(first_err),
        }
    });

    let items = match items {
        Ok(items) => items,
        Err(e) => {
            return Err(ExtractionError {
                failures: vec![("sequence_literal", e.to_string())],
            }
            .into());
        }
    };

    let steps: Vec<String> = items.into_iter().filter_map(step_text).collect();
    if steps.is_empty() {
        return Err(StageError::EmptyList);
    }
    Ok(steps)
}

fn step_text(item: Value) -> Option<String> {
    match item {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Strip surrounding whitespace and backticks.
fn trim_ticks(raw: &str) -> &str {
    raw.trim_matches(|c: char| c == '`' || c.is_whitespace())
}

/// Like [`trim_ticks`], but also drops a fence language tag such as
/// `python` on the opening line.
fn strip_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let body = match rest.find('\n') {
            Some(nl) if rest[..nl].chars().all(|c| c.is_ascii_alphanumeric()) => &rest[nl + 1..],
            _ => rest,
        };
        return trim_ticks(body);
    }
    trim_ticks(trimmed)
}

fn require_structured(value: Value) -> Result<Value, String> {
    match value {
        Value::Object(_) | Value::Array(_) => Ok(value),
        _ => Err("parsed value is neither a mapping nor a sequence".into()),
    }
}

fn fenced_block(raw: &str) -> Result<Value, String> {
    let captures = FENCED_JSON
        .captures(raw)
        .ok_or_else(|| "no ```json fenced block".to_string())?;
    serde_json::from_str(&captures[1]).map_err(|e| e.to_string())
}

fn brace_span(raw: &str) -> Result<Value, String> {
    match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if end > start => {
            serde_json::from_str(&raw[start..=end]).map_err(|e| e.to_string())
        }
        _ => Err("no brace-delimited span".into()),
    }
}

fn trimmed_whole(raw: &str) -> Result<Value, String> {
    serde_json::from_str(trim_ticks(raw))
        .map_err(|e| e.to_string())
        .and_then(require_structured)
}

fn lenient_literal(raw: &str) -> Result<Value, String> {
    parse_literal(trim_ticks(raw))
        .map_err(|e| e.to_string())
        .and_then(require_structured)
}

fn secondary_parser(raw: &str) -> Result<Value, String> {
    json5::from_str::<Value>(trim_ticks(raw))
        .map_err(|e| e.to_string())
        .and_then(require_structured)
}
