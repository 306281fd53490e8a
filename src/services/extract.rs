// src/services/extract.rs

//! Extraction of the classifier's JSON verdict from a free-form reply.
//!
//! The model is asked for a bare object shaped like
//! `{"relevance_score": 0-100, "structured_data": {...}}` but routinely wraps
//! it in prose or code fences, so the object is located rather than parsed
//! directly. Missing keys fall back to defaults.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::AppError;
use crate::utils::http::snippet;

/// System instruction used when `llm.system_prompt` is not set.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a real-estate and mortgage analyst reading posts from a Taiwanese home-buying forum. For each post:

1. Rate how closely it relates to mortgages (房貸) from 0 to 100.
   0 means unrelated; 100 means the post is mainly about a mortgage.
2. Extract any of the following that the post mentions:
   loan_amount, interest_rate, loan_term, loan_to_value, monthly_payment, banks (a list).
   Keep the values as written in the post.

Reply with JSON only, no explanation, for example:
{
    "relevance_score": 85,
    "structured_data": {
        "loan_amount": "500萬",
        "interest_rate": "1.31%",
        "loan_term": "30年",
        "loan_to_value": "8成",
        "monthly_payment": "21000",
        "banks": ["台銀", "土銀"]
    }
}"#;

pub const SCORE_KEY: &str = "relevance_score";
pub const FIELDS_KEY: &str = "structured_data";

/// Parsed classifier verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub relevance_score: i64,
    pub structured_fields: Map<String, Value>,
    /// Keys that were absent or unusable and were filled with defaults
    pub gaps: Vec<&'static str>,
}

/// The reply contained no JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no JSON object in classifier reply: {excerpt:?}")]
pub struct ParseFailure {
    pub excerpt: String,
}

impl From<ParseFailure> for AppError {
    fn from(failure: ParseFailure) -> Self {
        AppError::Parse(failure.to_string())
    }
}

/// Build the user message sent alongside the system instruction.
pub fn build_user_text(title: &str, content: &str) -> String {
    format!("Title: {title}\n\nContent: {content}")
}

/// Extract the verdict from a free-form reply.
pub fn parse_reply(reply: &str) -> Result<Extraction, ParseFailure> {
    let object = locate_object(reply).ok_or_else(|| ParseFailure {
        excerpt: snippet(reply.trim(), 80).to_string(),
    })?;

    let mut gaps = Vec::new();

    let relevance_score = match object.get(SCORE_KEY).and_then(score_value) {
        Some(score) => score,
        None => {
            gaps.push(SCORE_KEY);
            0
        }
    };

    let structured_fields = match object.get(FIELDS_KEY) {
        Some(Value::Object(fields)) => fields.clone(),
        _ => {
            gaps.push(FIELDS_KEY);
            Map::new()
        }
    };

    Ok(Extraction {
        relevance_score,
        structured_fields,
        gaps,
    })
}

/// Find the JSON object in the reply.
///
/// Tries the widest span first (first `{` through last `}`), then each
/// balanced object in order of appearance.
fn locate_object(reply: &str) -> Option<Map<String, Value>> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end > start {
        if let Ok(Value::Object(map)) = serde_json::from_str(&reply[start..=end]) {
            return Some(map);
        }
    }

    reply
        .match_indices('{')
        .filter_map(|(open, _)| {
            let close = balanced_end(reply, open)?;
            match serde_json::from_str(&reply[open..=close]) {
                Ok(Value::Object(map)) => Some(map),
                _ => None,
            }
        })
        .next()
}

/// Byte index of the `}` closing the object opened at `open`, skipping braces in strings.
fn balanced_end(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[open..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Accept integers, floats and numeric strings; anything else is a gap.
fn score_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.round() as i64))
        }
        _ => None,
    }
}
