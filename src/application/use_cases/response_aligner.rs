/*
Response Aligner

Maps the classifier's reply back onto the posts that were sent. The output always has exactly one
result per original item, whatever the classifier returned: entries may be missing, reordered,
duplicated, malformed, or the whole payload may be unreadable.

Resolution for position i (starting at 1):
  1. the entry whose tweetIndex equals i
  2. otherwise the entry at list position i
  3. otherwise a "No result returned" default
*/

use serde_json::Value;

use crate::application::ports::output::classifier_port::RawResponse;
use crate::application::use_cases::batch_request_builder::BatchItem;
use crate::domain::entities::classification::{ClassificationResult, Confidence, Method};

/// One verdict as read from the classifier payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub declared_index: Option<usize>,
    pub should_filter: bool,
    pub matched_filter: Option<String>,
    pub confidence: Option<f64>,
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedPayload {
    /// Entries in list order; `None` marks a list slot that was not a readable verdict.
    Parsed(Vec<Option<Verdict>>),
    Unparseable(String),
}

impl ParsedPayload {
    pub fn parse(text: &str) -> Self {
        let Some(value) = extract_json(text) else {
            return ParsedPayload::Unparseable(text.to_string());
        };

        let entries = match &value {
            Value::Object(map) => match map.get("results") {
                Some(Value::Array(entries)) => entries,
                _ => return ParsedPayload::Unparseable(text.to_string()),
            },
            Value::Array(entries) => entries,
            _ => return ParsedPayload::Unparseable(text.to_string()),
        };

        ParsedPayload::Parsed(entries.iter().map(read_verdict).collect())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseAligner;

impl ResponseAligner {
    pub fn new() -> Self {
        ResponseAligner
    }

    pub fn align(&self, raw: &RawResponse, original: &[BatchItem]) -> Vec<ClassificationResult> {
        match ParsedPayload::parse(&raw.text) {
            ParsedPayload::Parsed(entries) => original
                .iter()
                .enumerate()
                .map(|(position, _)| {
                    let index = position + 1;
                    resolve(&entries, index)
                        .map(|verdict| to_result(verdict, &raw.model, original.len()))
                        .unwrap_or_else(|| ClassificationResult::missing(&raw.model))
                })
                .collect(),
            ParsedPayload::Unparseable(text) => {
                log::warn!(
                    "Classifier payload from {} could not be parsed; marking {} post(s) as parse errors",
                    raw.model,
                    original.len()
                );
                original
                    .iter()
                    .map(|_| ClassificationResult::parse_error(&raw.model, &text))
                    .collect()
            }
        }
    }
}

fn resolve(entries: &[Option<Verdict>], index: usize) -> Option<&Verdict> {
    entries
        .iter()
        .flatten()
        .find(|verdict| verdict.declared_index == Some(index))
        .or_else(|| entries.get(index - 1).and_then(Option::as_ref))
}

fn to_result(verdict: &Verdict, model: &str, batch_size: usize) -> ClassificationResult {
    let matched_rule = if verdict.should_filter {
        verdict.matched_filter.clone()
    } else {
        None
    };
    let reason = verdict
        .reasoning
        .clone()
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| {
            if verdict.should_filter {
                "Matched a filter rule".to_string()
            } else {
                "No filter rule matched".to_string()
            }
        });

    ClassificationResult {
        should_filter: verdict.should_filter,
        matched_rule,
        confidence: Confidence::clamped(verdict.confidence.unwrap_or(Confidence::MIN as f64)),
        method: Method::BatchApi { model: model.to_string() },
        reason,
        details: format!("Batch analysis of {} post(s)", batch_size),
    }
}

/// Locate the JSON document in a reply that may be wrapped in code fences or prose.
fn extract_json(text: &str) -> Option<Value> {
    let trimmed = strip_code_fence(text.trim());
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    let start = trimmed.find(|c: char| c == '{' || c == '[')?;
    let end = trimmed.rfind(|c: char| c == '}' || c == ']')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&trimmed[start..=end]).ok()
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn read_verdict(entry: &Value) -> Option<Verdict> {
    let map = entry.as_object()?;

    let declared_index = map.get("tweetIndex").and_then(read_index);
    let should_filter = map.get("shouldFilter").map(read_bool).unwrap_or(false);
    let matched_filter = map
        .get("matchedFilter")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"))
        .map(str::to_string);
    let confidence = map.get("confidence").and_then(Confidence::parse_value);
    let reasoning = map
        .get("reasoning")
        .and_then(Value::as_str)
        .map(str::to_string);

    Some(Verdict {
        declared_index,
        should_filter,
        matched_filter,
        confidence,
        reasoning,
    })
}

fn read_index(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))
            .map(|n| n as usize),
        Value::String(s) => s.trim().parse::<usize>().ok(),
        _ => None,
    }
}

fn read_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        _ => false,
    }
}
