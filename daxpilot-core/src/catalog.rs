//! Workspace and dataset discovery in Power BI / Fabric

use crate::auth::TokenManager;
use crate::cache::TtlCache;
use crate::config::PowerBiConfig;
use crate::error::ServiceResult;
use crate::http::{CallKind, HttpClient, RequestOptions};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A Power BI workspace (group)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub name: String,
}

/// A semantic model inside a workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: String,
    pub name: String,
}

/// A table of a semantic model; columns and measures are passed through
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub measures: Vec<Value>,
}

/// The `{ "value": [...] }` envelope of Power BI list endpoints
#[derive(Debug, Deserialize)]
struct ValueList<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
}

/// Lists workspaces, datasets and tables; the workspace list is cached
pub struct WorkspaceManager {
    http: HttpClient,
    api_base_url: String,
    workspaces: TtlCache<Vec<Workspace>>,
}

impl WorkspaceManager {
    pub fn new(http: HttpClient, config: &PowerBiConfig, cache_ttl: Duration) -> Self {
        Self {
            http,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            workspaces: TtlCache::new(cache_ttl),
        }
    }

    /// Workspaces visible to the token holder.
    ///
    /// A fresh, non-empty cached list is returned without network I/O unless
    /// `force_refresh` is set. A failed fetch leaves the cache as it was.
    pub async fn fetch_workspaces(
        &mut self,
        tokens: &TokenManager,
        force_refresh: bool,
    ) -> ServiceResult<Vec<Workspace>> {
        if !force_refresh {
            if let Some(cached) = self.workspaces.get().filter(|list| !list.is_empty()) {
                debug!("Using cached workspace list ({} entries)", cached.len());
                return Ok(cached.clone());
            }
        }

        let url = format!("{}/groups", self.api_base_url);
        let workspaces: Vec<Workspace> = self.get_list(tokens, &url).await?;

        info!("Fetched {} workspaces", workspaces.len());
        self.workspaces.insert(workspaces.clone());
        Ok(workspaces)
    }

    /// Datasets of a workspace (not cached)
    pub async fn fetch_datasets(
        &self,
        tokens: &TokenManager,
        workspace_id: &str,
    ) -> ServiceResult<Vec<Dataset>> {
        let url = format!("{}/groups/{}/datasets", self.api_base_url, workspace_id);
        let datasets: Vec<Dataset> = self.get_list(tokens, &url).await?;
        info!("Fetched {} datasets in workspace {}", datasets.len(), workspace_id);
        Ok(datasets)
    }

    /// Whether the dataset can be read with the current token
    pub async fn validate_dataset_access(
        &self,
        tokens: &TokenManager,
        workspace_id: &str,
        dataset_id: &str,
    ) -> bool {
        let Some(token) = tokens.token() else {
            warn!("Cannot validate dataset access without a valid token");
            return false;
        };

        let url = format!(
            "{}/groups/{}/datasets/{}",
            self.api_base_url, workspace_id, dataset_id
        );
        let options = RequestOptions::new(CallKind::Catalog);
        let builder = self.http.get(&url).bearer_auth(token);

        match self.http.send(builder, &options).await {
            Ok(response) => {
                let ok = response.status().is_success();
                if !ok {
                    warn!(
                        "Dataset {} in workspace {} is not accessible: {}",
                        dataset_id,
                        workspace_id,
                        response.status()
                    );
                }
                ok
            }
            Err(e) => {
                warn!("Error validating dataset access: {}", e);
                false
            }
        }
    }

    /// Tables of a dataset
    pub async fn dataset_tables(
        &self,
        tokens: &TokenManager,
        workspace_id: &str,
        dataset_id: &str,
    ) -> ServiceResult<Vec<TableInfo>> {
        let url = format!(
            "{}/groups/{}/datasets/{}/tables",
            self.api_base_url, workspace_id, dataset_id
        );
        self.get_list(tokens, &url).await
    }

    /// Forget the cached workspace list
    pub fn clear_cache(&mut self) {
        self.workspaces.clear();
    }

    async fn get_list<T: DeserializeOwned>(
        &self,
        tokens: &TokenManager,
        url: &str,
    ) -> ServiceResult<Vec<T>> {
        let token = tokens.bearer().inspect_err(|_| {
            warn!("No valid token available, authenticate first");
        })?;

        debug!("GET {}", url);
        let options = RequestOptions::new(CallKind::Catalog);
        let builder = self.http.get(url).bearer_auth(token);
        let list: ValueList<T> = self.http.execute_json(builder, &options).await?;
        Ok(list.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_table_info_passthrough() {
        let table: TableInfo = serde_json::from_value(json!({
            "name": "Sales",
            "columns": [{"name": "Amount", "dataType": "Double"}]
        }))
        .unwrap();
        assert_eq!(table.name, "Sales");
        assert_eq!(table.columns.len(), 1);
        assert!(table.measures.is_empty());
    }

    #[test]
    fn test_value_list_defaults_to_empty() {
        let list: ValueList<Workspace> = serde_json::from_value(json!({})).unwrap();
        assert!(list.value.is_empty());
    }
}
