//! Workspace catalog tests against a mocked Power BI API

use chrono::{Duration as ChronoDuration, Utc};
use daxpilot_core::auth::TokenManager;
use daxpilot_core::catalog::WorkspaceManager;
use daxpilot_core::config::{AzureConfig, PowerBiConfig};
use daxpilot_core::http::HttpClient;
use daxpilot_core::ServiceError;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WORKSPACE: &str = "7c8e1f2a-0000-4000-8000-000000000001";
const DATASET: &str = "a1b2c3d4-0000-4000-8000-000000000002";

fn power_bi(server: &MockServer) -> PowerBiConfig {
    PowerBiConfig {
        api_base_url: server.uri(),
        ..Default::default()
    }
}

fn signed_in(config: &PowerBiConfig) -> TokenManager {
    TokenManager::new(HttpClient::new().unwrap(), AzureConfig::default(), config)
        .with_token("test-token", Utc::now() + ChronoDuration::hours(1))
}

fn manager(config: &PowerBiConfig, ttl: Duration) -> WorkspaceManager {
    WorkspaceManager::new(HttpClient::new().unwrap(), config, ttl)
}

fn workspaces_body() -> serde_json::Value {
    json!({
        "@odata.context": "https://api.powerbi.com/v1.0/myorg/$metadata#groups",
        "value": [
            {"id": WORKSPACE, "name": "Sales Analytics", "isReadOnly": false},
            {"id": "b0000000-0000-4000-8000-000000000003", "name": "Finance"}
        ]
    })
}

#[tokio::test]
async fn test_workspace_list_is_cached_within_ttl() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/groups"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(workspaces_body()))
        .expect(1)
        .mount(&server)
        .await;

    let config = power_bi(&server);
    let tokens = signed_in(&config);
    let mut catalog = manager(&config, Duration::from_secs(300));

    let first = catalog.fetch_workspaces(&tokens, false).await.unwrap();
    let second = catalog.fetch_workspaces(&tokens, false).await.unwrap();

    assert_eq!(first.len(), 2);
    assert_eq!(first[0].name, "Sales Analytics");
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_force_refresh_bypasses_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/groups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(workspaces_body()))
        .expect(2)
        .mount(&server)
        .await;

    let config = power_bi(&server);
    let tokens = signed_in(&config);
    let mut catalog = manager(&config, Duration::from_secs(300));

    catalog.fetch_workspaces(&tokens, false).await.unwrap();
    catalog.fetch_workspaces(&tokens, true).await.unwrap();
}

#[tokio::test]
async fn test_expired_entry_is_refetched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/groups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(workspaces_body()))
        .expect(2)
        .mount(&server)
        .await;

    let config = power_bi(&server);
    let tokens = signed_in(&config);
    let mut catalog = manager(&config, Duration::ZERO);

    catalog.fetch_workspaces(&tokens, false).await.unwrap();
    catalog.fetch_workspaces(&tokens, false).await.unwrap();
}

#[tokio::test]
async fn test_empty_list_counts_as_miss() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/groups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
        .expect(2)
        .mount(&server)
        .await;

    let config = power_bi(&server);
    let tokens = signed_in(&config);
    let mut catalog = manager(&config, Duration::from_secs(300));

    assert!(catalog.fetch_workspaces(&tokens, false).await.unwrap().is_empty());
    assert!(catalog.fetch_workspaces(&tokens, false).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/groups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(workspaces_body()))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/groups"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&server)
        .await;

    let config = power_bi(&server);
    let tokens = signed_in(&config);
    let mut catalog = manager(&config, Duration::from_secs(300));

    catalog.fetch_workspaces(&tokens, false).await.unwrap();

    let err = catalog.fetch_workspaces(&tokens, true).await.unwrap_err();
    assert!(matches!(err, ServiceError::Http { status: 503, .. }));

    // the earlier list is still served without touching the network
    let cached = catalog.fetch_workspaces(&tokens, false).await.unwrap();
    assert_eq!(cached.len(), 2);
}

#[tokio::test]
async fn test_not_authenticated_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(workspaces_body()))
        .expect(0)
        .mount(&server)
        .await;

    let config = power_bi(&server);
    let tokens = TokenManager::new(HttpClient::new().unwrap(), AzureConfig::default(), &config);
    let mut catalog = manager(&config, Duration::from_secs(300));

    let err = catalog.fetch_workspaces(&tokens, false).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotAuthenticated));

    let err = catalog.fetch_datasets(&tokens, WORKSPACE).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotAuthenticated));
    assert!(!catalog.validate_dataset_access(&tokens, WORKSPACE, DATASET).await);
}

#[tokio::test]
async fn test_nearly_expired_token_is_not_used() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(workspaces_body()))
        .expect(0)
        .mount(&server)
        .await;

    let config = power_bi(&server);
    let tokens = TokenManager::new(HttpClient::new().unwrap(), AzureConfig::default(), &config)
        .with_token("stale", Utc::now() + ChronoDuration::minutes(4));
    let mut catalog = manager(&config, Duration::from_secs(300));

    assert!(matches!(
        catalog.fetch_workspaces(&tokens, false).await,
        Err(ServiceError::NotAuthenticated)
    ));
}

#[tokio::test]
async fn test_datasets_and_tables() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/groups/{}/datasets", WORKSPACE)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"id": DATASET, "name": "Retail Model", "configuredBy": "someone"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/groups/{}/datasets/{}/tables", WORKSPACE, DATASET)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                {"name": "Sales", "columns": [{"name": "Amount", "dataType": "Double"}]},
                {"name": "DimDate"}
            ]
        })))
        .mount(&server)
        .await;

    let config = power_bi(&server);
    let tokens = signed_in(&config);
    let catalog = manager(&config, Duration::from_secs(300));

    let datasets = catalog.fetch_datasets(&tokens, WORKSPACE).await.unwrap();
    assert_eq!(datasets.len(), 1);
    assert_eq!(datasets[0].name, "Retail Model");

    let tables = catalog.dataset_tables(&tokens, WORKSPACE, DATASET).await.unwrap();
    assert_eq!(tables.len(), 2);
    assert_eq!(tables[0].columns.len(), 1);
    assert!(tables[1].columns.is_empty());
}

#[tokio::test]
async fn test_validate_dataset_access() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/groups/{}/datasets/{}", WORKSPACE, DATASET)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": DATASET})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/groups/{}/datasets/missing", WORKSPACE)))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = power_bi(&server);
    let tokens = signed_in(&config);
    let catalog = manager(&config, Duration::from_secs(300));

    assert!(catalog.validate_dataset_access(&tokens, WORKSPACE, DATASET).await);
    assert!(!catalog.validate_dataset_access(&tokens, WORKSPACE, "missing").await);
}

#[tokio::test]
async fn test_permission_denied() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/groups/{}/datasets", WORKSPACE)))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let config = power_bi(&server);
    let tokens = signed_in(&config);
    let catalog = manager(&config, Duration::from_secs(300));

    assert!(matches!(
        catalog.fetch_datasets(&tokens, WORKSPACE).await,
        Err(ServiceError::PermissionDenied)
    ));
}

#[tokio::test]
async fn test_clear_cache_forces_refetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/groups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(workspaces_body()))
        .expect(2)
        .mount(&server)
        .await;

    let config = power_bi(&server);
    let tokens = signed_in(&config);
    let mut catalog = manager(&config, Duration::from_secs(300));

    catalog.fetch_workspaces(&tokens, false).await.unwrap();
    catalog.clear_cache();
    catalog.fetch_workspaces(&tokens, false).await.unwrap();
}
