//! Keyword-counting stand-in for the text analytics service

use super::types::{ConfidenceScores, Entity, SentimentLabel, SentimentResult};
use super::TextAnalyzer;
use crate::error::ServiceResult;
use async_trait::async_trait;

pub const POSITIVE_KEYWORDS: &[&str] = &[
    "excellent",
    "great",
    "good",
    "love",
    "amazing",
    "wonderful",
    "positive",
    "happy",
    "exceeded",
    "fantastic",
];

pub const NEGATIVE_KEYWORDS: &[&str] = &[
    "bad",
    "terrible",
    "poor",
    "disappointed",
    "awful",
    "hate",
    "negative",
    "unhappy",
    "declined",
    "unhelpful",
];

const MAX_KEY_PHRASES: usize = 3;

/// Offline analyzer: majority of keyword hits decides the sentiment
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordAnalyzer;

impl KeywordAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Sentiment without going through the async trait
    pub fn sentiment(&self, text: &str) -> SentimentResult {
        let lower = text.to_lowercase();
        let hits = |keywords: &[&str]| keywords.iter().filter(|k| lower.contains(*k)).count();
        let positive = hits(POSITIVE_KEYWORDS);
        let negative = hits(NEGATIVE_KEYWORDS);

        if positive > negative {
            SentimentResult::new(
                SentimentLabel::Positive,
                ConfidenceScores::new(0.75, 0.15, 0.10),
            )
        } else if negative > positive {
            SentimentResult::new(
                SentimentLabel::Negative,
                ConfidenceScores::new(0.10, 0.15, 0.75),
            )
        } else {
            SentimentResult::new(
                SentimentLabel::Neutral,
                ConfidenceScores::new(0.25, 0.5, 0.25),
            )
        }
    }

    /// Up to three leading word bigrams
    pub fn key_phrases(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        words
            .windows(2)
            .take(MAX_KEY_PHRASES)
            .map(|pair| format!("{} {}", pair[0], pair[1]))
            .collect()
    }
}

#[async_trait]
impl TextAnalyzer for KeywordAnalyzer {
    async fn analyze_sentiment(&self, text: &str) -> ServiceResult<SentimentResult> {
        Ok(self.sentiment(text))
    }

    async fn extract_key_phrases(&self, text: &str) -> ServiceResult<Vec<String>> {
        Ok(self.key_phrases(text))
    }

    async fn recognize_entities(&self, _text: &str) -> ServiceResult<Vec<Entity>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("The service was excellent and the staff were great", SentimentLabel::Positive ; "positive")]
    #[test_case("Terrible support, I am disappointed", SentimentLabel::Negative ; "negative")]
    #[test_case("The invoice arrived on Tuesday", SentimentLabel::Neutral ; "no keywords")]
    #[test_case("Good food but awful parking", SentimentLabel::Neutral ; "tie")]
    fn test_sentiment(text: &str, expected: SentimentLabel) {
        assert_eq!(KeywordAnalyzer.sentiment(text).label, expected);
    }

    #[test]
    fn test_scores() {
        let positive = KeywordAnalyzer.sentiment("I love it");
        assert_eq!(positive.confidence_scores.unwrap().positive, 0.75);

        let neutral = KeywordAnalyzer.sentiment("It is a chair");
        let scores = neutral.confidence_scores.unwrap();
        assert_eq!(scores.neutral, 0.5);
        assert_eq!(scores.positive, 0.25);
    }

    #[test]
    fn test_key_phrases() {
        assert_eq!(
            KeywordAnalyzer.key_phrases("sales grew fast this quarter"),
            vec!["sales grew", "grew fast", "fast this"]
        );
        assert_eq!(KeywordAnalyzer.key_phrases("two words"), vec!["two words"]);
        assert!(KeywordAnalyzer.key_phrases("single").is_empty());
    }

    #[tokio::test]
    async fn test_analyze_combines_everything() {
        let result = KeywordAnalyzer.analyze("Amazing product overall").await.unwrap();
        assert_eq!(result.query, "Amazing product overall");
        assert_eq!(result.sentiment.label, SentimentLabel::Positive);
        assert_eq!(result.key_phrases.len(), 2);
        assert!(result.entities.is_empty());
    }
}
