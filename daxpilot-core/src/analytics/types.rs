//! Sentiment, key phrase and entity records shared by every analyzer

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Overall sentiment of a text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    #[default]
    Neutral,
    Negative,
    Mixed,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
            Self::Mixed => "mixed",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SentimentLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Ok(Self::Positive),
            "neutral" => Ok(Self::Neutral),
            "negative" => Ok(Self::Negative),
            "mixed" => Ok(Self::Mixed),
            other => Err(format!("unknown sentiment '{}'", other)),
        }
    }
}

// Accepts "POSITIVE" as well as "positive"
impl<'de> Deserialize<'de> for SentimentLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Score per sentiment class, each in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfidenceScores {
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
}

impl ConfidenceScores {
    pub fn new(positive: f64, neutral: f64, negative: f64) -> Self {
        Self {
            positive,
            neutral,
            negative,
        }
    }

    /// Highest of the three scores
    pub fn max(&self) -> f64 {
        self.positive.max(self.neutral).max(self.negative)
    }
}

/// Sentiment label together with its score distribution
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SentimentResult {
    #[serde(rename = "sentiment")]
    pub label: SentimentLabel,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_scores: Option<ConfidenceScores>,
}

impl SentimentResult {
    pub fn new(label: SentimentLabel, scores: ConfidenceScores) -> Self {
        Self {
            label,
            confidence_scores: Some(scores),
        }
    }
}

/// A recognized named entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    pub confidence_score: f64,
}

/// Everything an analyzer extracted from one text
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NlpResult {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub sentiment: SentimentResult,
    #[serde(default)]
    pub key_phrases: Vec<String>,
    #[serde(default)]
    pub entities: Vec<Entity>,
}
