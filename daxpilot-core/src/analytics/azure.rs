//! Azure Text Analytics REST client (API v3.1)

use super::types::{ConfidenceScores, Entity, SentimentLabel, SentimentResult};
use super::TextAnalyzer;
use crate::config::{AnalyticsConfig, SecretString};
use crate::error::{ServiceError, ServiceResult};
use crate::http::{CallKind, HttpClient, RequestOptions};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

const API_PATH: &str = "text/analytics/v3.1";
const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

#[derive(Debug, Serialize)]
struct DocumentBatch<'a> {
    documents: [InputDocument<'a>; 1],
}

#[derive(Debug, Serialize)]
struct InputDocument<'a> {
    id: &'a str,
    language: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct BatchResponse<T> {
    #[serde(default = "Vec::new")]
    documents: Vec<T>,
    #[serde(default)]
    errors: Vec<DocumentError>,
}

#[derive(Debug, Deserialize)]
struct DocumentError {
    #[serde(default)]
    error: ErrorDetail,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SentimentDocument {
    sentiment: String,
    confidence_scores: ConfidenceScores,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyPhraseDocument {
    #[serde(default)]
    key_phrases: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EntityDocument {
    #[serde(default)]
    entities: Vec<RawEntity>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntity {
    text: String,
    category: String,
    #[serde(default)]
    subcategory: Option<String>,
    #[serde(default)]
    confidence_score: f64,
}

/// Client for the cognitive services text analytics endpoint
pub struct AzureTextAnalytics {
    http: HttpClient,
    endpoint: String,
    key: SecretString,
    language: String,
}

impl AzureTextAnalytics {
    pub fn new(http: HttpClient, endpoint: impl Into<String>, key: SecretString) -> Self {
        Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            key,
            language: "en".to_string(),
        }
    }

    /// Build from configuration; `None` when endpoint or key is missing
    pub fn from_config(http: HttpClient, config: &AnalyticsConfig) -> Option<Self> {
        if !config.is_configured() {
            return None;
        }
        let endpoint = config.endpoint.clone()?;
        let key = config.key.clone()?;
        Some(Self::new(http, endpoint, key))
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Send one document to `operation` and return the first result
    async fn call<T: DeserializeOwned>(&self, operation: &str, text: &str) -> ServiceResult<T> {
        let url = format!("{}/{}/{}", self.endpoint, API_PATH, operation);
        debug!("POST {}", url);

        let batch = DocumentBatch {
            documents: [InputDocument {
                id: "1",
                language: &self.language,
                text,
            }],
        };
        let options = RequestOptions::new(CallKind::TextAnalytics);
        let builder = self
            .http
            .post(&url)
            .header(SUBSCRIPTION_KEY_HEADER, self.key.expose_secret())
            .json(&batch);

        let response: BatchResponse<T> = self.http.execute_json(builder, &options).await?;
        match response.documents.into_iter().next() {
            Some(document) => Ok(document),
            None => {
                let detail = response
                    .errors
                    .first()
                    .map(|e| format!("{}: {}", e.error.code, e.error.message))
                    .unwrap_or_else(|| "no documents in response".to_string());
                error!("Text analytics {} failed: {}", operation, detail);
                Err(ServiceError::MalformedResponse(detail))
            }
        }
    }
}

#[async_trait]
impl TextAnalyzer for AzureTextAnalytics {
    async fn analyze_sentiment(&self, text: &str) -> ServiceResult<SentimentResult> {
        let document: SentimentDocument = self.call("sentiment", text).await?;
        let label: SentimentLabel = document
            .sentiment
            .parse()
            .map_err(ServiceError::MalformedResponse)?;
        info!("Sentiment analysis completed: {}", label);
        Ok(SentimentResult::new(label, document.confidence_scores))
    }

    async fn extract_key_phrases(&self, text: &str) -> ServiceResult<Vec<String>> {
        let document: KeyPhraseDocument = self.call("keyPhrases", text).await?;
        info!("Extracted {} key phrases", document.key_phrases.len());
        Ok(document.key_phrases)
    }

    async fn recognize_entities(&self, text: &str) -> ServiceResult<Vec<Entity>> {
        let document: EntityDocument = self.call("entities/recognition/general", text).await?;
        let entities: Vec<Entity> = document
            .entities
            .into_iter()
            .map(|raw| Entity {
                text: raw.text,
                category: raw.category,
                subcategory: raw.subcategory,
                confidence_score: raw.confidence_score,
            })
            .collect();
        info!("Recognized {} entities", entities.len());
        Ok(entities)
    }
}
