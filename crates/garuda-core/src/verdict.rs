//! Verdicts and recovering them from raw model output.
//!
//! Model replies are expected to be a JSON object, but often arrive wrapped
//! in markdown fences. Extraction strategies are tried in a fixed order; the
//! first candidate that deserializes into a [`Verdict`] wins.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// Categorical judgment on an assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictKind {
    True,
    False,
    PartiallyTrue,
    InsufficientData,
    /// The model call or the reply parse failed
    Error,
}

impl VerdictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictKind::True => "TRUE",
            VerdictKind::False => "FALSE",
            VerdictKind::PartiallyTrue => "PARTIALLY_TRUE",
            VerdictKind::InsufficientData => "INSUFFICIENT_DATA",
            VerdictKind::Error => "ERROR",
        }
    }
}

impl fmt::Display for VerdictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerdictKind {
    type Err = String;

    /// Case-insensitive; spaces and hyphens count as underscores.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "TRUE" => Ok(VerdictKind::True),
            "FALSE" => Ok(VerdictKind::False),
            "PARTIALLY_TRUE" => Ok(VerdictKind::PartiallyTrue),
            "INSUFFICIENT_DATA" => Ok(VerdictKind::InsufficientData),
            "ERROR" => Ok(VerdictKind::Error),
            _ => Err(format!("unknown verdict '{}'", s)),
        }
    }
}

impl<'de> Deserialize<'de> for VerdictKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// The model's structured judgment on one assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub verdict: VerdictKind,

    /// Confidence percentage, 0-100
    #[serde(deserialize_with = "deserialize_confidence")]
    pub confidence: u8,

    pub reasoning: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub key_findings: Vec<String>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub discrepancies: Vec<String>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub recommendations: Vec<String>,
}

impl Verdict {
    /// Sentinel verdict for a failed evaluation.
    pub fn error(reasoning: impl Into<String>) -> Self {
        Self {
            verdict: VerdictKind::Error,
            confidence: 0,
            reasoning: reasoning.into(),
            key_findings: Vec::new(),
            discrepancies: Vec::new(),
            recommendations: Vec::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.verdict == VerdictKind::Error
    }

    /// `"<VERDICT> (Confidence: <N>%)"`
    pub fn summary_line(&self) -> String {
        format!("{} (Confidence: {}%)", self.verdict, self.confidence)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

/// Accept a number or numeric string, rounded and clamped into 0..=100.
fn deserialize_confidence<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let value = match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(n) => n,
        NumberOrText::Text(text) => text
            .trim()
            .trim_end_matches('%')
            .trim()
            .parse::<f64>()
            .map_err(|_| de::Error::custom(format!("confidence '{}' is not a number", text)))?,
    };
    if !value.is_finite() {
        return Err(de::Error::custom("confidence must be a finite number"));
    }
    Ok(value.round().clamp(0.0, 100.0) as u8)
}

/// A missing key and an explicit `null` both mean an empty list.
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Errors from parsing model output.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("No valid JSON verdict in model response: {0}")]
    MalformedResponse(String),
}

/// Ways of locating the JSON payload in a model reply, in the order tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// The whole reply
    Direct,
    /// Between a "```json" fence and the next fence
    JsonFence,
    /// Between a bare fence pair; only used when no "```json" fence exists
    BareFence,
}

impl ExtractionStrategy {
    pub const ORDERED: [ExtractionStrategy; 3] = [
        ExtractionStrategy::Direct,
        ExtractionStrategy::JsonFence,
        ExtractionStrategy::BareFence,
    ];

    /// The candidate payload this strategy finds, if it applies.
    pub fn candidate(self, text: &str) -> Option<&str> {
        match self {
            ExtractionStrategy::Direct => Some(text.trim()),
            ExtractionStrategy::JsonFence => between_fences(text, JSON_FENCE),
            ExtractionStrategy::BareFence if text.contains(JSON_FENCE) => None,
            ExtractionStrategy::BareFence => between_fences(text, FENCE),
        }
    }
}

/// Text after the first `opening` marker up to the next fence.
///
/// An unclosed fence runs to the end of the text.
fn between_fences<'t>(text: &'t str, opening: &str) -> Option<&'t str> {
    let start = text.find(opening)? + opening.len();
    let rest = &text[start..];
    let end = rest.find(FENCE).unwrap_or(rest.len());
    Some(rest[..end].trim())
}

/// Recover a verdict from raw model output.
pub fn parse_verdict(text: &str) -> Result<Verdict, ParseError> {
    let mut last_error: Option<String> = None;

    for strategy in ExtractionStrategy::ORDERED {
        let Some(candidate) = strategy.candidate(text) else {
            continue;
        };

        match serde_json::from_str::<Verdict>(candidate) {
            Ok(verdict) => {
                tracing::debug!(strategy = ?strategy, verdict = %verdict.verdict, "Parsed verdict");
                return Ok(verdict);
            }
            Err(e) => last_error = Some(e.to_string()),
        }
    }

    Err(ParseError::MalformedResponse(
        last_error.unwrap_or_else(|| "empty response".to_string()),
    ))
}
