//! HTTP client implementation using reqwest

use crate::error::{ServiceError, ServiceResult};
use crate::http::error::{map_http_error, map_transport_error};
use crate::http::RequestOptions;
use reqwest::{Client, ClientBuilder, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Maximum response size (10MB)
const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024;

/// Default user agent
const USER_AGENT: &str = concat!("daxpilot/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client with connection pooling
#[derive(Clone)]
pub struct HttpClient {
    /// The underlying reqwest client
    client: Arc<Client>,

    /// Maximum response size to prevent OOM
    max_response_size: usize,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> ServiceResult<Self> {
        Self::with_config(Duration::from_secs(10), 10)
    }

    /// Create a new HTTP client with custom pool settings.
    ///
    /// Request timeouts are applied per call from [`RequestOptions`].
    pub fn with_config(connect_timeout: Duration, max_idle_per_host: usize) -> ServiceResult<Self> {
        let client = ClientBuilder::new()
            .pool_max_idle_per_host(max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(connect_timeout)
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()
            .map_err(|e| ServiceError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
            max_response_size: MAX_RESPONSE_SIZE,
        })
    }

    /// Start a GET request
    pub fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url)
    }

    /// Start a POST request
    pub fn post(&self, url: &str) -> RequestBuilder {
        self.client.post(url)
    }

    /// Send a request and return the raw response, whatever its status.
    ///
    /// Only transport failures are turned into errors here.
    pub async fn send(&self, builder: RequestBuilder, options: &RequestOptions) -> ServiceResult<Response> {
        let request_id = options.request_id;
        let kind = options.call_kind.label();

        let response = builder
            .timeout(options.timeout)
            .header("X-Request-ID", request_id.to_string())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    warn!("{} request timed out [request_id: {}]", kind, request_id);
                } else {
                    error!("{} request failed [request_id: {}]: {}", kind, request_id, e);
                }
                map_transport_error(e, options.timeout, request_id)
            })?;

        debug!(
            "{} response status: {} [request_id: {}]",
            kind,
            response.status(),
            request_id
        );
        Ok(response)
    }

    /// Send a request, require a success status and parse the JSON body
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        options: &RequestOptions,
    ) -> ServiceResult<T> {
        let response = self.send(builder, options).await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.ok();
            warn!(
                "{} request failed with status {} [request_id: {}]",
                options.call_kind.label(),
                status,
                options.request_id
            );
            return Err(map_http_error(status, body, options.request_id));
        }

        self.read_json(response, options).await
    }

    /// Read and parse a JSON body, enforcing the response size limit
    pub async fn read_json<T: DeserializeOwned>(
        &self,
        response: Response,
        options: &RequestOptions,
    ) -> ServiceResult<T> {
        let request_id = options.request_id;
        self.check_content_length(&response)?;

        let text = response
            .text()
            .await
            .map_err(|e| map_transport_error(e, options.timeout, request_id))?;

        if text.len() > self.max_response_size {
            return Err(ServiceError::MalformedResponse(format!(
                "Response size {} exceeds maximum {} [request_id: {}]",
                text.len(),
                self.max_response_size,
                request_id
            )));
        }

        serde_json::from_str(&text).map_err(|e| {
            error!(
                "Failed to parse {} response [request_id: {}]: {}",
                options.call_kind.label(),
                request_id,
                e
            );
            ServiceError::MalformedResponse(format!(
                "Invalid response format: {} [request_id: {}]",
                e, request_id
            ))
        })
    }

    /// Check response size to prevent OOM
    fn check_content_length(&self, response: &Response) -> ServiceResult<()> {
        if let Some(content_length) = response.content_length() {
            if content_length as usize > self.max_response_size {
                return Err(ServiceError::MalformedResponse(format!(
                    "Response size {} exceeds maximum {}",
                    content_length, self.max_response_size
                )));
            }
        }

        Ok(())
    }
}
