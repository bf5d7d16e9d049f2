//! Response parsing for LLM output.
//!
//! Model output is untrusted. The parser never fails: anything that cannot
//! be read as a JSON object degrades to a low-confidence fail claim that
//! carries an excerpt of the raw text as its reasoning.
//!
//! Only the span from the first `{` to the last `}` is decoded. Trailing
//! prose containing braces, or several JSON objects in one reply, can
//! mis-bound that span; such replies degrade rather than being repaired.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::DEFAULT_CONFIDENCE;

/// Confidence assigned to a reply that could not be parsed at all.
pub const UNPARSEABLE_CONFIDENCE: u8 = 5;

/// Maximum number of characters of raw output kept as reasoning.
pub const REASONING_EXCERPT_CHARS: usize = 400;

/// What the model claimed about one rule, before verification.
///
/// Every key is optional because the model may omit any of them or use
/// the wrong JSON type. [`LlmClaim::fill_defaults`] makes all five present;
/// the typed accessors coerce values without failing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LlmClaim {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Value>,
}

impl LlmClaim {
    /// Read the five known keys out of a decoded JSON object.
    ///
    /// `null` is treated the same as an absent key. Unknown keys are ignored.
    pub fn from_object(object: &Map<String, Value>) -> Self {
        let field = |key: &str| object.get(key).filter(|v| !v.is_null()).cloned();
        Self {
            rule: field("rule"),
            status: field("status"),
            evidence: field("evidence"),
            reasoning: field("reasoning"),
            confidence: field("confidence"),
        }
    }

    /// Build a claim from any JSON value; non-objects yield an empty claim.
    pub fn from_value(value: &Value) -> Self {
        value.as_object().map(Self::from_object).unwrap_or_default()
    }

    /// The fixed record returned for output that is not a JSON object.
    pub fn unparseable(rule: &str, raw: &str) -> Self {
        let excerpt: String = raw.chars().take(REASONING_EXCERPT_CHARS).collect();
        Self {
            rule: Some(Value::String(rule.to_string())),
            status: Some(Value::String("fail".to_string())),
            evidence: Some(Value::String(String::new())),
            reasoning: Some(Value::String(excerpt)),
            confidence: Some(Value::from(UNPARSEABLE_CONFIDENCE)),
        }
    }

    /// Fill every absent key with its default.
    ///
    /// Present keys are left untouched, whatever their type.
    pub fn fill_defaults(&mut self, rule: &str) {
        self.rule
            .get_or_insert_with(|| Value::String(rule.to_string()));
        self.status
            .get_or_insert_with(|| Value::String("fail".to_string()));
        self.evidence.get_or_insert_with(|| Value::String(String::new()));
        self.reasoning
            .get_or_insert_with(|| Value::String(String::new()));
        self.confidence
            .get_or_insert_with(|| Value::from(DEFAULT_CONFIDENCE));
    }

    /// Whether all five keys are present.
    pub fn is_complete(&self) -> bool {
        self.rule.is_some()
            && self.status.is_some()
            && self.evidence.is_some()
            && self.reasoning.is_some()
            && self.confidence.is_some()
    }

    /// Rule text, or `fallback` when the model gave nothing usable.
    pub fn rule_text(&self, fallback: &str) -> String {
        match self.rule.as_ref().map(value_to_text) {
            Some(rule) if !rule.is_empty() => rule,
            _ => fallback.to_string(),
        }
    }

    /// Status label, `fail` when absent.
    pub fn status_text(&self) -> String {
        self.status
            .as_ref()
            .map(value_to_text)
            .unwrap_or_else(|| "fail".to_string())
    }

    /// Evidence as text (empty when absent or unusable).
    pub fn evidence_text(&self) -> String {
        self.evidence.as_ref().map(value_to_text).unwrap_or_default()
    }

    /// Reasoning as text (empty when absent or unusable).
    pub fn reasoning_text(&self) -> String {
        self.reasoning.as_ref().map(value_to_text).unwrap_or_default()
    }

    /// Confidence coerced to an integer, not yet bounded.
    ///
    /// Scoring runs on this value; only its outcome is clamped.
    pub fn raw_confidence(&self) -> i64 {
        self.confidence
            .as_ref()
            .and_then(coerce_confidence)
            .unwrap_or(i64::from(DEFAULT_CONFIDENCE))
    }

    /// Confidence coerced to an integer in `[0, 100]`.
    pub fn confidence(&self) -> u8 {
        clamp_confidence(self.raw_confidence())
    }
}

/// Parse raw model output into a claim for `rule`.
///
/// Total over all inputs: never panics and never returns an error.
pub fn parse_response(raw: &str, rule: &str) -> LlmClaim {
    let text = raw.trim();

    match extract_json_object(text) {
        Some(object) => {
            let mut claim = LlmClaim::from_object(&object);
            claim.fill_defaults(rule);
            claim
        }
        None => {
            tracing::warn!(
                rule = %rule,
                response_len = text.len(),
                "LLM response is not a JSON object, degrading to low-confidence fail"
            );
            LlmClaim::unparseable(rule, text)
        }
    }
}

/// Decode the span between the first `{` and the last `}` as an object.
fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }

    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(Value::Object(object)) => Some(object),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(error = %e, "Candidate JSON span failed to decode");
            None
        }
    }
}

/// Render a JSON value as text.
///
/// Arrays keep their string and scalar items, one per line; objects carry
/// no usable text.
pub(crate) fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Object(_) => String::new(),
        Value::Array(items) => items
            .iter()
            .filter(|item| !matches!(item, Value::Array(_) | Value::Object(_)))
            .map(value_to_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Coerce a JSON confidence value, `None` when it is not numeric.
fn coerce_confidence(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|_| i64::MAX))
            .or_else(|| n.as_f64().and_then(truncate_float)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(truncate_float))
        }
        _ => None,
    }
}

/// Float to integer, truncating toward zero; saturates at the `i64` range.
fn truncate_float(f: f64) -> Option<i64> {
    f.is_finite().then(|| f.trunc() as i64)
}

pub(crate) fn clamp_confidence(value: i64) -> u8 {
    value.clamp(0, 100) as u8
}
