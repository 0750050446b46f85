//! Integration tests for configuration loading and validation

use daxpilot_core::config::{
    from_lookup, load_from_json, load_from_path, load_from_yaml, AppConfig, ConfigError,
    ConfigValidator, SafeLogging, ValidationErrorKind, DEFAULT_POWER_BI_API,
};
use daxpilot_core::session::SessionContext;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

/// Helper to create a test config file
fn create_test_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_load_valid_yaml_config() {
    use std::env;
    env::set_var("DAXPILOT_TEST_YAML_SECRET", "yaml-secret");

    let yaml = r#"
foundry:
  base_url: http://localhost:5272/v1
  fast_model: phi-3.5-mini-instruct
  powerful_model: qwen2.5-14b-instruct
  timeout_secs: 120
power_bi:
  workspace_id: ws-123
  dataset_id: ds-456
azure:
  tenant_id: contoso
  client_id: app-id
  client_secret: ${DAXPILOT_TEST_YAML_SECRET}
cache:
  ttl_minutes: 10
log_level: debug
"#;

    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "daxpilot.yaml", yaml);

    let config = load_from_yaml(path).unwrap();
    assert_eq!(config.foundry.base_url, "http://localhost:5272/v1");
    assert_eq!(config.foundry.timeout_secs, 120);
    assert_eq!(config.power_bi.workspace_id.as_deref(), Some("ws-123"));
    assert_eq!(config.power_bi.api_base_url, DEFAULT_POWER_BI_API);
    assert_eq!(
        config.azure.client_secret.as_ref().map(|s| s.expose_secret()),
        Some("yaml-secret")
    );
    assert_eq!(config.cache.ttl_minutes, 10);
    assert_eq!(config.log_level(), "debug");
    assert!(config.is_fabric_configured());

    env::remove_var("DAXPILOT_TEST_YAML_SECRET");
}

#[test]
fn test_load_valid_json_config() {
    let json = r#"{
        "foundry": {"fast_model": "phi-4-mini", "powerful_model": "qwen2.5-7b-instruct"},
        "analytics": {"endpoint": "https://contoso.cognitiveservices.azure.com", "key": "cog-key"},
        "github": {"repository": "contoso/daxpilot"}
    }"#;

    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "daxpilot.json", json);

    let config = load_from_json(&path).unwrap();
    assert_eq!(config.foundry.fast_model, "phi-4-mini");
    assert!(config.analytics.is_configured());
    assert_eq!(config.github.repository.as_deref(), Some("contoso/daxpilot"));

    // extension picks the parser
    let again = load_from_path(&path).unwrap();
    assert_eq!(again.foundry.powerful_model, "qwen2.5-7b-instruct");
}

#[test]
fn test_missing_env_var_in_file() {
    let yaml = "azure:\n  client_secret: ${DAXPILOT_TEST_DEFINITELY_UNSET}\n";
    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "config.yaml", yaml);

    match load_from_yaml(path) {
        Err(ConfigError::EnvVarNotFound { var }) => {
            assert_eq!(var, "DAXPILOT_TEST_DEFINITELY_UNSET")
        }
        other => panic!("Expected EnvVarNotFound error, got {other:?}"),
    }
}

#[test]
fn test_unknown_field_is_parse_error() {
    let yaml = "foundry:\n  base_uri: http://localhost/v1\n";
    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "config.yaml", yaml);

    match load_from_yaml(path) {
        Err(ConfigError::ParseError { message, .. }) => assert!(message.contains("base_uri")),
        other => panic!("Expected ParseError, got {other:?}"),
    }
}

#[test]
fn test_invalid_json_reports_position() {
    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "config.json", "{\n  \"foundry\": {\n}");

    match load_from_json(path) {
        Err(ConfigError::ParseError { line, .. }) => assert!(line.is_some()),
        other => panic!("Expected ParseError, got {other:?}"),
    }
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let result = load_from_yaml(dir.path().join("absent.yaml"));
    assert!(matches!(result, Err(ConfigError::IoError { .. })));
}

#[test]
fn test_file_with_bad_url_fails_validation() {
    let yaml = "power_bi:\n  api_base_url: ftp://api.powerbi.com/v1.0/myorg\n";
    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "config.yaml", yaml);

    match load_from_yaml(path) {
        Err(ConfigError::ValidationError(err)) => {
            assert_eq!(err.field_path, "power_bi.api_base_url");
            assert!(matches!(err.kind, ValidationErrorKind::InvalidUrl { .. }));
        }
        other => panic!("Expected ValidationError, got {other:?}"),
    }
}

#[test]
fn test_half_configured_credentials() {
    let yaml = "azure:\n  client_id: app-id\n";
    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "config.yaml", yaml);

    match load_from_yaml(path) {
        Err(ConfigError::ValidationError(err)) => {
            assert_eq!(err.field_path, "azure.client_secret");
            assert!(matches!(err.kind, ValidationErrorKind::Incompatible { .. }));
        }
        other => panic!("Expected ValidationError, got {other:?}"),
    }
}

#[test]
fn test_environment_lookup_builds_config() {
    let vars = [
        ("FOUNDRY_BASE", "http://127.0.0.1:6000/v1"),
        ("FOUNDRY_MODEL_PHI", "phi-3.5-mini-instruct"),
        ("POWER_BI_WORKSPACE_ID", "ws"),
        ("AZURE_TENANT_ID", "contoso"),
        ("CACHE_TTL_MINUTES", "15"),
    ];
    let config = from_lookup(|name| {
        vars.iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.to_string())
    })
    .unwrap();

    assert_eq!(config.foundry.base_url, "http://127.0.0.1:6000/v1");
    assert_eq!(config.power_bi.workspace_id.as_deref(), Some("ws"));
    assert_eq!(config.cache.ttl_minutes, 15);
    assert!(ConfigValidator::new().unwrap().validate(&config).is_ok());
}

#[test]
fn test_env_with_warning_log_level_and_huge_ttl() {
    let vars = [
        ("LOG_LEVEL", "WARNING"),
        ("CACHE_TTL_MINUTES", "400000000000000000"),
    ];
    let config = from_lookup(|name| {
        vars.iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.to_string())
    })
    .unwrap();

    assert!(ConfigValidator::new().unwrap().validate(&config).is_ok());
    assert_eq!(config.log_level(), "warn");
    assert_eq!(config.cache.ttl(), Duration::from_secs(u64::MAX));
    assert!(SessionContext::new(config).is_ok());
}

#[test]
fn test_logged_config_hides_secrets() {
    let yaml = r#"
azure:
  client_id: app-id
  client_secret: plain-text-secret
analytics:
  endpoint: https://contoso.cognitiveservices.azure.com
  key: plain-text-key
"#;
    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "config.yaml", yaml);
    let config: AppConfig = load_from_yaml(path).unwrap();

    let logged = config.safe_for_logging();
    assert!(logged.contains("app-id"));
    assert!(!logged.contains("plain-text-secret"));
    assert!(!logged.contains("plain-text-key"));
}
