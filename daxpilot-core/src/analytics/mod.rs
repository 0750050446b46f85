//! Text analytics: sentiment, key phrases and named entities
//!
//! [`AzureTextAnalytics`] calls the cognitive services endpoint;
//! [`KeywordAnalyzer`] is the offline mock. Both produce the same records.

pub mod azure;
pub mod keyword;
pub mod types;

use crate::error::ServiceResult;
use async_trait::async_trait;

pub use azure::AzureTextAnalytics;
pub use keyword::KeywordAnalyzer;
pub use types::{ConfidenceScores, Entity, NlpResult, SentimentLabel, SentimentResult};

/// Source of sentiment, key phrases and entities for a text
#[async_trait]
pub trait TextAnalyzer: Send + Sync {
    async fn analyze_sentiment(&self, text: &str) -> ServiceResult<SentimentResult>;

    async fn extract_key_phrases(&self, text: &str) -> ServiceResult<Vec<String>>;

    async fn recognize_entities(&self, text: &str) -> ServiceResult<Vec<Entity>>;

    /// Run all three analyses on one text
    async fn analyze(&self, text: &str) -> ServiceResult<NlpResult> {
        Ok(NlpResult {
            query: text.to_string(),
            sentiment: self.analyze_sentiment(text).await?,
            key_phrases: self.extract_key_phrases(text).await?,
            entities: self.recognize_entities(text).await?,
        })
    }
}
