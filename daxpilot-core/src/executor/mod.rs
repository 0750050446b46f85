//! DAX execution through the Power BI executeQueries API

pub mod result;

use crate::auth::TokenManager;
use crate::config::PowerBiConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::http::error::map_http_error;
use crate::http::{CallKind, HttpClient, RequestOptions};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

pub use result::{QueryResult, ResultColumn, ResultSummary};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteQueriesRequest<'a> {
    queries: [DaxQuery<'a>; 1],
    serializer_settings: SerializerSettings,
}

#[derive(Debug, Serialize)]
struct DaxQuery<'a> {
    query: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SerializerSettings {
    include_nulls: bool,
}

impl<'a> ExecuteQueriesRequest<'a> {
    fn new(query: &'a str) -> Self {
        Self {
            queries: [DaxQuery { query }],
            serializer_settings: SerializerSettings {
                include_nulls: true,
            },
        }
    }
}

/// Runs DAX against a semantic model
pub struct QueryExecutor {
    http: HttpClient,
    api_base_url: String,
}

impl QueryExecutor {
    pub fn new(http: HttpClient, config: &PowerBiConfig) -> Self {
        Self {
            http,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Execute one query and parse the first table of the first result.
    ///
    /// A 400 answer carries the service's error payload in
    /// [`ServiceError::DaxSyntax`].
    pub async fn execute(
        &self,
        tokens: &TokenManager,
        workspace_id: &str,
        dataset_id: &str,
        query: &str,
    ) -> ServiceResult<QueryResult> {
        let token = tokens.bearer().inspect_err(|_| {
            warn!("No valid token available, authenticate first");
        })?;

        let url = format!(
            "{}/groups/{}/datasets/{}/executeQueries",
            self.api_base_url, workspace_id, dataset_id
        );
        debug!("Executing DAX against {}", url);

        let options = RequestOptions::new(CallKind::ExecuteQueries);
        let builder = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&ExecuteQueriesRequest::new(query));
        let response = self.http.send(builder, &options).await?;
        let status = response.status();

        if status == StatusCode::BAD_REQUEST {
            let body = response.text().await.unwrap_or_default();
            let details = serde_json::from_str::<Value>(&body).unwrap_or(Value::String(body));
            error!("DAX syntax error: {}", details);
            return Err(ServiceError::DaxSyntax { details });
        }

        if !status.is_success() {
            let body = response.text().await.ok();
            let err = map_http_error(status, body, options.request_id);
            warn!("Query execution failed: {}", err);
            return Err(err);
        }

        let body: Value = self.http.read_json(response, &options).await?;
        let result = QueryResult::from_response(&body)?;
        info!(
            "Query returned {} rows in {} columns",
            result.rows.len(),
            result.columns.len()
        );
        Ok(result)
    }
}
