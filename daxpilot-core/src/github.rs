//! Repository statistics from the GitHub REST API

use crate::cache::TtlCache;
use crate::config::GitHubConfig;
use crate::error::ServiceResult;
use crate::http::{CallKind, HttpClient, RequestOptions};
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

/// Star, fork, watcher and issue counts of one repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoStats {
    pub full_name: String,
    pub stars: u64,
    pub forks: u64,
    pub watchers: u64,
    pub open_issues: u64,
    pub html_url: String,
}

/// The fields read from `GET /repos/{owner}/{repo}`
#[derive(Debug, Deserialize)]
struct RepoResponse {
    #[serde(default)]
    full_name: String,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    forks_count: u64,
    #[serde(default)]
    watchers_count: u64,
    #[serde(default)]
    open_issues_count: u64,
    #[serde(default)]
    html_url: String,
}

impl From<RepoResponse> for RepoStats {
    fn from(raw: RepoResponse) -> Self {
        Self {
            full_name: raw.full_name,
            stars: raw.stargazers_count,
            forks: raw.forks_count,
            watchers: raw.watchers_count,
            open_issues: raw.open_issues_count,
            html_url: raw.html_url,
        }
    }
}

/// Fetches [`RepoStats`], caching the last repository asked for
pub struct GitHubStats {
    http: HttpClient,
    api_base_url: String,
    cache: TtlCache<RepoStats>,
}

impl GitHubStats {
    pub fn new(http: HttpClient, config: &GitHubConfig, ttl: Duration) -> Self {
        Self {
            http,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            cache: TtlCache::new(ttl),
        }
    }

    /// Stats for `owner/repo`
    pub async fn repo_stats(
        &mut self,
        repository: &str,
        force_refresh: bool,
    ) -> ServiceResult<RepoStats> {
        let repository = repository.trim_matches('/');
        if !force_refresh {
            if let Some(stats) = self
                .cache
                .get()
                .filter(|s| s.full_name.eq_ignore_ascii_case(repository))
            {
                debug!("Using cached stats for {}", repository);
                return Ok(stats.clone());
            }
        }

        let url = format!("{}/repos/{}", self.api_base_url, repository);
        let options = RequestOptions::new(CallKind::GitHub);
        let builder = self.http.get(&url).header(ACCEPT, GITHUB_ACCEPT);
        let raw: RepoResponse = self.http.execute_json(builder, &options).await?;
        let mut stats = RepoStats::from(raw);
        if stats.full_name.is_empty() {
            stats.full_name = repository.to_string();
        }

        info!(
            "{}: {} stars, {} forks, {} open issues",
            stats.full_name, stats.stars, stats.forks, stats.open_issues
        );
        self.cache.insert(stats.clone());
        Ok(stats)
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}
