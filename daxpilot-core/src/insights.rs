//! Canned insights derived from text analytics results

use crate::analytics::{Entity, NlpResult, SentimentLabel, SentimentResult};
use crate::error::{ServiceError, ServiceResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{error, info};

/// Confidence reported when no score distribution is available
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

const SUMMARY_TOPICS: usize = 3;

/// One generated insight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub timestamp: DateTime<Utc>,
    pub sentiment: SentimentResult,
    pub key_topics: Vec<String>,
    pub entities: Vec<Entity>,
    pub summary: String,
    pub recommendations: Vec<String>,
    pub confidence: f64,
}

/// Builds insights and keeps every one of them for the session
#[derive(Debug, Default)]
pub struct InsightsGenerator {
    history: Vec<Insight>,
}

impl InsightsGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive an insight and append it to the history
    pub fn generate(&mut self, nlp: &NlpResult) -> Insight {
        let insight = Insight {
            timestamp: Utc::now(),
            sentiment: nlp.sentiment.clone(),
            key_topics: nlp.key_phrases.clone(),
            entities: nlp.entities.clone(),
            summary: summarize(nlp.sentiment.label, &nlp.key_phrases),
            recommendations: recommendations(nlp.sentiment.label),
            confidence: confidence(&nlp.sentiment),
        };

        self.history.push(insight.clone());
        info!("Generated new insight ({} in history)", self.history.len());
        insight
    }

    pub fn history(&self) -> &[Insight] {
        &self.history
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// Write the whole history to `path` as a pretty JSON array
    pub fn export(&self, path: impl AsRef<Path>) -> ServiceResult<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.history)?;
        fs::write(path, json).map_err(|e| {
            error!("Failed to export insights to {}: {}", path.display(), e);
            io_error(path, e)
        })?;
        info!("Insights exported to {}", path.display());
        Ok(())
    }

    /// Replace the history with one previously written by [`Self::export`]
    pub fn load(&mut self, path: impl AsRef<Path>) -> ServiceResult<()> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| io_error(path, e))?;
        self.history = serde_json::from_str(&content)?;
        info!(
            "Loaded {} insights from {}",
            self.history.len(),
            path.display()
        );
        Ok(())
    }
}

fn io_error(path: &Path, source: std::io::Error) -> ServiceError {
    ServiceError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// `Overall sentiment is <label>. Key topics: <first three>.`
pub fn summarize(label: SentimentLabel, key_phrases: &[String]) -> String {
    if key_phrases.is_empty() {
        return format!("Overall sentiment is {}.", label);
    }
    let topics: Vec<&str> = key_phrases
        .iter()
        .take(SUMMARY_TOPICS)
        .map(String::as_str)
        .collect();
    format!(
        "Overall sentiment is {}. Key topics: {}.",
        label,
        topics.join(", ")
    )
}

pub fn recommendations(label: SentimentLabel) -> Vec<String> {
    let lines: &[&str] = match label {
        SentimentLabel::Negative => &[
            "Consider addressing negative feedback promptly",
            "Investigate root causes of dissatisfaction",
        ],
        SentimentLabel::Positive => &[
            "Maintain current positive practices",
            "Share success stories with team",
        ],
        SentimentLabel::Neutral | SentimentLabel::Mixed => {
            &["Monitor for changes in sentiment trends"]
        }
    };
    lines.iter().map(|line| line.to_string()).collect()
}

/// Highest class score rounded to three decimals
pub fn confidence(sentiment: &SentimentResult) -> f64 {
    match sentiment.confidence_scores {
        Some(scores) => (scores.max() * 1000.0).round() / 1000.0,
        None => DEFAULT_CONFIDENCE,
    }
}
