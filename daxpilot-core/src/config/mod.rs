//! Configuration module for daxpilot
//!
//! Settings come either from the environment (`from_env`) or from a YAML or
//! JSON file with `${VAR}` placeholders. Both paths end in the same
//! validation.

mod env;
mod error;
mod schema;
mod secrets;
mod validator;

pub use env::{from_lookup, interpolate_env_vars, interpolate_with};
pub use error::{ConfigError, ConfigResult, ValidationError, ValidationErrorKind};
pub use schema::{
    AnalyticsConfig, AppConfig, AzureConfig, CacheConfig, FoundryConfig, GitHubConfig,
    PowerBiConfig, DEFAULT_AUTHORITY, DEFAULT_CACHE_TTL_MINUTES, DEFAULT_FAST_MODEL,
    DEFAULT_FOUNDRY_BASE, DEFAULT_GITHUB_API, DEFAULT_POWERFUL_MODEL, DEFAULT_POWER_BI_API,
    DEFAULT_POWER_BI_RESOURCE,
};
pub use secrets::{
    is_sensitive_field, redact_by_field_name, redact_json, RedactionPolicy, SafeLogging,
    SecretString,
};
pub use validator::ConfigValidator;

use std::fs;
use std::path::Path;

/// Load and validate a configuration from the process environment
pub fn from_env() -> ConfigResult<AppConfig> {
    let config = env::from_env()?;
    ConfigValidator::new()?.validate(&config)?;
    Ok(config)
}

/// Load a configuration from a YAML file
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> ConfigResult<AppConfig> {
    let path = path.as_ref();
    let interpolated = read_interpolated(path)?;

    let config: AppConfig =
        serde_yaml::from_str(&interpolated).map_err(|e| ConfigError::ParseError {
            path: path.to_string_lossy().to_string(),
            line: e.location().map(|l| l.line()),
            column: e.location().map(|l| l.column()),
            message: e.to_string(),
        })?;

    ConfigValidator::new()?.validate(&config)?;
    Ok(config)
}

/// Load a configuration from a JSON file
pub fn load_from_json<P: AsRef<Path>>(path: P) -> ConfigResult<AppConfig> {
    let path = path.as_ref();
    let interpolated = read_interpolated(path)?;

    let config: AppConfig =
        serde_json::from_str(&interpolated).map_err(|e| ConfigError::ParseError {
            path: path.to_string_lossy().to_string(),
            line: Some(e.line()),
            column: Some(e.column()),
            message: e.to_string(),
        })?;

    ConfigValidator::new()?.validate(&config)?;
    Ok(config)
}

/// Load a file, picking the format from its extension (`.json` or YAML)
pub fn load_from_path<P: AsRef<Path>>(path: P) -> ConfigResult<AppConfig> {
    let path = path.as_ref();
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => load_from_json(path),
        _ => load_from_yaml(path),
    }
}

fn read_interpolated(path: &Path) -> ConfigResult<String> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;

    // Interpolate environment variables before parsing
    env::interpolate_env_vars(&content)
}

impl AppConfig {
    /// Same as [`from_env`]
    pub fn from_env() -> ConfigResult<Self> {
        from_env()
    }
}

impl SafeLogging for AppConfig {
    fn safe_for_logging(&self) -> String {
        match serde_json::to_value(self) {
            Ok(mut value) => {
                redact_json(&mut value, RedactionPolicy::Full);
                value.to_string()
            }
            Err(e) => format!("<unserializable config: {}>", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_for_logging_hides_secrets() {
        let mut config = AppConfig::default();
        config.azure.client_id = Some("app-id".to_string());
        config.azure.client_secret = Some(SecretString::new("very-secret-value"));

        let logged = config.safe_for_logging();
        assert!(logged.contains("app-id"));
        assert!(logged.contains("[REDACTED]"));
        assert!(!logged.contains("very-secret-value"));
    }
}
