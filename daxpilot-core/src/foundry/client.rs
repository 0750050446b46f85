//! Foundry Local client implementation

use super::ChatCompletion;
use crate::cache::TtlCache;
use crate::config::FoundryConfig;
use crate::error::ServiceResult;
use crate::http::{CallKind, HttpClient, RequestOptions};
use crate::protocol::{ChatRequest, ChatResponse, ModelList};
use crate::routing::ModelRouter;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Models offered when the listing cannot be fetched
pub const FALLBACK_MODELS: &[&str] = &[
    "qwen2.5-14b-instruct",
    "qwen2.5-7b-instruct",
    "phi-3.5-mini-instruct",
    "phi-3-small-instruct",
];

/// Timeout of the availability probe
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for the local OpenAI-compatible model server
pub struct FoundryClient {
    http: HttpClient,
    config: FoundryConfig,
    models: TtlCache<Vec<String>>,
}

impl FoundryClient {
    /// Create a client with its own connection pool
    pub fn new(config: FoundryConfig) -> ServiceResult<Self> {
        Ok(Self::with_http(HttpClient::new()?, config))
    }

    /// Create a client sharing an existing connection pool
    pub fn with_http(http: HttpClient, config: FoundryConfig) -> Self {
        Self {
            http,
            config,
            models: TtlCache::default(),
        }
    }

    /// Override the model-list cache TTL
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.models = TtlCache::new(ttl);
        self
    }

    /// Settings this client was built with
    pub fn config(&self) -> &FoundryConfig {
        &self.config
    }

    /// Fetch the model ids from the server, sorted, without caching
    pub async fn fetch_models(&self) -> ServiceResult<Vec<String>> {
        let url = self.config.models_endpoint();
        debug!("Fetching model list from {}", url);

        let options = RequestOptions::new(CallKind::Models);
        let listing: ModelList = self.http.execute_json(self.http.get(&url), &options).await?;
        Ok(listing.sorted_ids())
    }

    /// Model ids, served from cache when fresh.
    ///
    /// Falls back to [`FALLBACK_MODELS`] when the server is unreachable or
    /// lists nothing; the fallback is not cached.
    pub async fn list_models(&mut self, force_refresh: bool) -> Vec<String> {
        if !force_refresh {
            if let Some(models) = self.models.get() {
                debug!("Using cached model list ({} models)", models.len());
                return models.clone();
            }
        }

        match self.fetch_models().await {
            Ok(models) if !models.is_empty() => {
                info!("Foundry lists {} models", models.len());
                self.models.insert(models.clone());
                models
            }
            Ok(_) => {
                warn!("Foundry returned an empty model list, using fallback models");
                fallback_models()
            }
            Err(e) => {
                warn!("Could not list Foundry models, using fallback models: {}", e);
                fallback_models()
            }
        }
    }

    /// Router built from the current model listing
    pub async fn router(&mut self) -> ModelRouter {
        let models = self.list_models(false).await;
        ModelRouter::from_models(&models)
    }

    /// Router using the configured model ids, without touching the network
    pub fn configured_router(&self) -> ModelRouter {
        let non_empty = |id: &str| Some(id.to_string()).filter(|s| !s.is_empty());
        ModelRouter::new(
            non_empty(&self.config.fast_model),
            non_empty(&self.config.powerful_model),
        )
    }

    /// Whether the server answers the model listing within a short timeout
    pub async fn is_available(&self) -> bool {
        let options = RequestOptions::new(CallKind::Models).with_timeout(PROBE_TIMEOUT);
        let builder = self.http.get(&self.config.models_endpoint());
        match self.http.send(builder, &options).await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Foundry probe failed: {}", e);
                false
            }
        }
    }
}

fn fallback_models() -> Vec<String> {
    FALLBACK_MODELS.iter().map(|m| m.to_string()).collect()
}

#[async_trait]
impl ChatCompletion for FoundryClient {
    async fn complete(&self, request: ChatRequest) -> ServiceResult<ChatResponse> {
        let url = self.config.chat_endpoint();
        debug!(
            "Sending {} messages to {} at {}",
            request.messages.len(),
            request.model,
            url
        );

        let options = RequestOptions::new(CallKind::Chat).with_timeout(self.config.timeout());
        let builder = self.http.post(&url).json(&request);
        let response: ChatResponse = self.http.execute_json(builder, &options).await?;

        info!(
            "Chat completion from {} finished [request_id: {}]",
            request.model, options.request_id
        );
        Ok(response)
    }
}
