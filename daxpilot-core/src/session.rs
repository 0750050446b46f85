//! Per-session state for the Fabric query flow
//!
//! A [`SessionContext`] owns the token, the catalog cache, the current
//! workspace/dataset selection, the last query and its result, and the
//! insight history. Everything lives for one session and is torn down by
//! [`SessionContext::end`].

use crate::auth::TokenManager;
use crate::catalog::{Dataset, TableInfo, Workspace, WorkspaceManager};
use crate::config::AppConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::executor::{QueryExecutor, QueryResult};
use crate::http::HttpClient;
use crate::insights::InsightsGenerator;
use tracing::{info, warn};

pub struct SessionContext {
    config: AppConfig,
    tokens: TokenManager,
    workspaces: WorkspaceManager,
    executor: QueryExecutor,
    workspace_id: Option<String>,
    dataset_id: Option<String>,
    last_query: Option<String>,
    last_result: Option<QueryResult>,
    insights: InsightsGenerator,
}

impl SessionContext {
    /// Start a session with its own connection pool
    pub fn new(config: AppConfig) -> ServiceResult<Self> {
        Ok(Self::with_http(config, HttpClient::new()?))
    }

    /// Start a session; an existing insight history file is loaded
    pub fn with_http(config: AppConfig, http: HttpClient) -> Self {
        let tokens = TokenManager::new(http.clone(), config.azure.clone(), &config.power_bi);
        let workspaces = WorkspaceManager::new(http.clone(), &config.power_bi, config.cache.ttl());
        let executor = QueryExecutor::new(http, &config.power_bi);

        let mut insights = InsightsGenerator::new();
        if let Some(path) = config.history_path.as_deref().filter(|p| p.exists()) {
            if let Err(e) = insights.load(path) {
                warn!("Ignoring unreadable insight history: {}", e);
            }
        }

        Self {
            workspace_id: config.power_bi.workspace_id.clone(),
            dataset_id: config.power_bi.dataset_id.clone(),
            config,
            tokens,
            workspaces,
            executor,
            last_query: None,
            last_result: None,
            insights,
        }
    }

    /// Replace the token manager, e.g. with one seeded by `with_token`
    pub fn with_tokens(mut self, tokens: TokenManager) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    pub fn tokens_mut(&mut self) -> &mut TokenManager {
        &mut self.tokens
    }

    pub fn insights(&self) -> &InsightsGenerator {
        &self.insights
    }

    pub fn insights_mut(&mut self) -> &mut InsightsGenerator {
        &mut self.insights
    }

    /// Acquire a token using whatever credentials are configured
    pub async fn authenticate(&mut self) -> ServiceResult<()> {
        self.tokens.acquire().await
    }

    pub async fn workspaces(&mut self, force_refresh: bool) -> ServiceResult<Vec<Workspace>> {
        self.workspaces
            .fetch_workspaces(&self.tokens, force_refresh)
            .await
    }

    pub async fn datasets(&self, workspace_id: &str) -> ServiceResult<Vec<Dataset>> {
        self.workspaces.fetch_datasets(&self.tokens, workspace_id).await
    }

    /// Tables of the selected dataset
    pub async fn tables(&self) -> ServiceResult<Vec<TableInfo>> {
        let (workspace_id, dataset_id) = self.selection()?;
        self.workspaces
            .dataset_tables(&self.tokens, workspace_id, dataset_id)
            .await
    }

    /// Whether the selected dataset can be read
    pub async fn validate_selection(&self) -> bool {
        match self.selection() {
            Ok((workspace_id, dataset_id)) => {
                self.workspaces
                    .validate_dataset_access(&self.tokens, workspace_id, dataset_id)
                    .await
            }
            Err(_) => false,
        }
    }

    /// Select a workspace; the dataset selection is dropped
    pub fn select_workspace(&mut self, workspace_id: impl Into<String>) {
        self.workspace_id = Some(workspace_id.into());
        self.dataset_id = None;
    }

    pub fn select_dataset(&mut self, dataset_id: impl Into<String>) {
        self.dataset_id = Some(dataset_id.into());
    }

    pub fn workspace_id(&self) -> Option<&str> {
        self.workspace_id.as_deref()
    }

    pub fn dataset_id(&self) -> Option<&str> {
        self.dataset_id.as_deref()
    }

    fn selection(&self) -> ServiceResult<(&str, &str)> {
        match (self.workspace_id.as_deref(), self.dataset_id.as_deref()) {
            (Some(workspace), Some(dataset)) => Ok((workspace, dataset)),
            (None, _) => Err(ServiceError::Configuration(
                "no workspace selected".to_string(),
            )),
            (_, None) => Err(ServiceError::Configuration(
                "no dataset selected".to_string(),
            )),
        }
    }

    /// Run a query against the selected dataset and keep query and result
    pub async fn execute(&mut self, query: &str) -> ServiceResult<&QueryResult> {
        self.last_query = Some(query.to_string());
        self.last_result = None;

        let (workspace_id, dataset_id) = self.selection()?;
        let result = self
            .executor
            .execute(&self.tokens, workspace_id, dataset_id, query)
            .await?;

        Ok(self.last_result.insert(result))
    }

    pub fn last_query(&self) -> Option<&str> {
        self.last_query.as_deref()
    }

    pub fn last_result(&self) -> Option<&QueryResult> {
        self.last_result.as_ref()
    }

    /// Sign out, drop cached listings and persist the insight history
    pub fn end(mut self) -> ServiceResult<()> {
        self.tokens.sign_out();
        self.workspaces.clear_cache();
        self.last_result = None;

        if let Some(path) = self.config.history_path.as_deref() {
            self.insights.export(path)?;
        }
        info!("Session ended");
        Ok(())
    }
}
