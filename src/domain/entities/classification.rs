use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Confidence percentage carried on every classification result.
///
/// Results produced from classifier output are always within [1, 100]; the synthetic
/// defaults produced when no verdict exists use zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "String")]
pub struct Confidence(u8);

impl Confidence {
    pub const ZERO: Confidence = Confidence(0);
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 100;

    /// Clamp a classifier-reported value into [1, 100].
    pub fn clamped(value: f64) -> Self {
        if value.is_nan() {
            return Confidence(Self::MIN);
        }
        Confidence(value.round().clamp(Self::MIN as f64, Self::MAX as f64) as u8)
    }

    /// `matched / total` as a rounded percentage.
    pub fn from_fraction(matched: usize, total: usize) -> Self {
        if total == 0 {
            return Confidence::ZERO;
        }
        let percent = (matched as f64 / total as f64 * 100.0).round();
        Confidence(percent.clamp(0.0, Self::MAX as f64) as u8)
    }

    /// Read a number or a numeric string such as `"85%"`.
    pub fn parse_value(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn percent(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl From<Confidence> for String {
    fn from(confidence: Confidence) -> Self {
        confidence.to_string()
    }
}

impl TryFrom<Value> for Confidence {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let parsed = Confidence::parse_value(&value)
            .ok_or_else(|| format!("invalid confidence value: {}", value))?;
        Ok(Confidence(parsed.round().clamp(0.0, Self::MAX as f64) as u8))
    }
}

/// Where a classification result came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Method {
    /// Local keyword/synonym heuristic.
    Keywords,
    /// Aligned verdict from the batch classifier.
    BatchApi { model: String },
    /// Classifier replied but the payload could not be read.
    ParseError { model: String },
    /// The batch call itself failed.
    BatchError,
    NoFiltersActive,
    Other(String),
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Keywords => f.write_str("Keywords"),
            Method::BatchApi { model } => write!(f, "{} Batch API", model),
            Method::ParseError { model } => write!(f, "{} Parse Error", model),
            Method::BatchError => f.write_str("Batch Error"),
            Method::NoFiltersActive => f.write_str("No Filters Active"),
            Method::Other(tag) => f.write_str(tag),
        }
    }
}

impl From<Method> for String {
    fn from(method: Method) -> Self {
        method.to_string()
    }
}

impl From<String> for Method {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "Keywords" => Method::Keywords,
            "Batch Error" => Method::BatchError,
            "No Filters Active" => Method::NoFiltersActive,
            _ => {
                if let Some(model) = tag.strip_suffix(" Batch API") {
                    Method::BatchApi { model: model.to_string() }
                } else if let Some(model) = tag.strip_suffix(" Parse Error") {
                    Method::ParseError { model: model.to_string() }
                } else {
                    Method::Other(tag)
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub should_filter: bool,
    pub matched_rule: Option<String>,
    pub confidence: Confidence,
    pub method: Method,
    pub reason: String,
    pub details: String,
}

impl ClassificationResult {
    pub fn no_filters_active() -> Self {
        Self {
            should_filter: false,
            matched_rule: None,
            confidence: Confidence::ZERO,
            method: Method::NoFiltersActive,
            reason: "No filters active".to_string(),
            details: "Add a filter rule to start hiding posts".to_string(),
        }
    }

    pub fn batch_error(error: &str) -> Self {
        Self {
            should_filter: false,
            matched_rule: None,
            confidence: Confidence::ZERO,
            method: Method::BatchError,
            reason: format!("Batch classification failed: {}", error),
            details: "Post left visible".to_string(),
        }
    }

    pub fn parse_error(model: &str, raw: &str) -> Self {
        let preview: String = raw.chars().take(120).collect();
        Self {
            should_filter: false,
            matched_rule: None,
            confidence: Confidence::ZERO,
            method: Method::ParseError { model: model.to_string() },
            reason: "Could not parse classifier response".to_string(),
            details: format!("Response started with: {}", preview),
        }
    }

    pub fn missing(model: &str) -> Self {
        Self {
            should_filter: false,
            matched_rule: None,
            confidence: Confidence::ZERO,
            method: Method::BatchApi { model: model.to_string() },
            reason: "No result returned".to_string(),
            details: "Classifier response had no entry for this post".to_string(),
        }
    }
}

/// Result of a single availability probe. Never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierAvailability {
    pub available: bool,
    pub model: Option<String>,
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl ClassifierAvailability {
    pub fn available(model: impl Into<String>) -> Self {
        Self {
            available: true,
            model: Some(model.into()),
            error: None,
            checked_at: Utc::now(),
        }
    }

    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            available: false,
            model: None,
            error: Some(error.into()),
            checked_at: Utc::now(),
        }
    }

    pub fn not_configured() -> Self {
        Self::unavailable("API key not configured")
    }
}
