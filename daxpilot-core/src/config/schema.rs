//! Configuration schema structures with serde support

use super::error::ValidationError;
use super::secrets::SecretString;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_FOUNDRY_BASE: &str = "http://127.0.0.1:51970/v1";
pub const DEFAULT_FAST_MODEL: &str = "phi-3-mini";
pub const DEFAULT_POWERFUL_MODEL: &str = "qwen-32b";
pub const DEFAULT_FOUNDRY_TIMEOUT_SECS: u64 = 180;
pub const DEFAULT_POWER_BI_API: &str = "https://api.powerbi.com/v1.0/myorg";
pub const DEFAULT_POWER_BI_RESOURCE: &str = "https://analysis.windows.net/powerbi/api";
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";
pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";
pub const DEFAULT_CACHE_TTL_MINUTES: u64 = 5;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Root configuration structure for daxpilot
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Local model server
    pub foundry: FoundryConfig,

    /// Power BI / Fabric REST API
    pub power_bi: PowerBiConfig,

    /// Azure AD credentials
    pub azure: AzureConfig,

    /// Azure Text Analytics
    pub analytics: AnalyticsConfig,

    /// GitHub repository stats
    pub github: GitHubConfig,

    /// Cache settings
    pub cache: CacheConfig,

    /// Where the insight history is persisted, if anywhere
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_path: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

/// Foundry Local (OpenAI-compatible) settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FoundryConfig {
    /// Base URL including the `/v1` suffix
    pub base_url: String,

    /// Small, fast model (Phi family)
    pub fast_model: String,

    /// Large, powerful model (Qwen family)
    pub powerful_model: String,

    /// Chat completion timeout in seconds
    pub timeout_secs: u64,
}

impl Default for FoundryConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_FOUNDRY_BASE.to_string(),
            fast_model: DEFAULT_FAST_MODEL.to_string(),
            powerful_model: DEFAULT_POWERFUL_MODEL.to_string(),
            timeout_secs: DEFAULT_FOUNDRY_TIMEOUT_SECS,
        }
    }
}

impl FoundryConfig {
    /// Chat completion endpoint
    pub fn chat_endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// Model listing endpoint
    pub fn models_endpoint(&self) -> String {
        format!("{}/models", self.base_url.trim_end_matches('/'))
    }

    /// Chat completion timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Power BI REST API settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PowerBiConfig {
    /// REST API root, e.g. `https://api.powerbi.com/v1.0/myorg`
    pub api_base_url: String,

    /// Resource the bearer token is requested for
    pub resource: String,

    /// Preselected workspace
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,

    /// Preselected dataset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_id: Option<String>,
}

impl Default for PowerBiConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_POWER_BI_API.to_string(),
            resource: DEFAULT_POWER_BI_RESOURCE.to_string(),
            workspace_id: None,
            dataset_id: None,
        }
    }
}

/// Azure AD settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AzureConfig {
    /// OAuth authority host
    pub authority: String,

    /// Tenant ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,

    /// App registration client ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// App registration client secret
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<SecretString>,
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            authority: DEFAULT_AUTHORITY.to_string(),
            tenant_id: None,
            client_id: None,
            client_secret: None,
        }
    }
}

impl AzureConfig {
    /// Tenant to authenticate against, `common` when unset
    pub fn tenant_or_common(&self) -> &str {
        self.tenant_id
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or("common")
    }

    /// Client ID and secret when both are set
    pub fn client_credentials(&self) -> Option<(&str, &SecretString)> {
        match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Some((id.as_str(), secret))
            }
            _ => None,
        }
    }
}

/// Azure Text Analytics settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyticsConfig {
    /// Cognitive services endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Subscription key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<SecretString>,
}

impl AnalyticsConfig {
    /// Whether the real service can be used instead of the keyword mock
    pub fn is_configured(&self) -> bool {
        self.endpoint.as_deref().is_some_and(|e| !e.is_empty())
            && self.key.as_ref().is_some_and(|k| !k.is_empty())
    }
}

/// GitHub settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GitHubConfig {
    /// REST API root
    pub api_base_url: String,

    /// `owner/repo` whose stats are shown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_GITHUB_API.to_string(),
            repository: None,
        }
    }
}

/// Cache settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Time-to-live of cached listings, in minutes
    pub ttl_minutes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: DEFAULT_CACHE_TTL_MINUTES,
        }
    }
}

impl CacheConfig {
    /// TTL as a duration
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_minutes.saturating_mul(60))
    }
}

impl AppConfig {
    /// Whether Fabric access is configured (tenant known)
    pub fn is_fabric_configured(&self) -> bool {
        self.azure.tenant_id.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Whether Foundry access is configured (base URL and both models)
    pub fn is_foundry_configured(&self) -> bool {
        !self.foundry.base_url.is_empty()
            && !self.foundry.fast_model.is_empty()
            && !self.foundry.powerful_model.is_empty()
    }

    /// Log filter, defaulting to `info`
    ///
    /// Case is ignored and the `warning`/`critical` spellings map to
    /// `warn`/`error`.
    pub fn log_level(&self) -> String {
        let level = self
            .log_level
            .as_deref()
            .unwrap_or(DEFAULT_LOG_LEVEL)
            .trim()
            .to_ascii_lowercase();
        match level.as_str() {
            "warning" => "warn".to_string(),
            "critical" | "fatal" => "error".to_string(),
            _ => level,
        }
    }

    /// Validate the built-in constraints of the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.foundry.base_url.is_empty() {
            return Err(ValidationError::required("foundry.base_url"));
        }
        if self.foundry.timeout_secs == 0 {
            return Err(ValidationError::out_of_range(
                "foundry.timeout_secs",
                "timeout must be greater than 0",
            ));
        }
        if self.cache.ttl_minutes == 0 {
            return Err(ValidationError::out_of_range(
                "cache.ttl_minutes",
                "TTL must be greater than 0",
            ));
        }
        if self.power_bi.api_base_url.is_empty() {
            return Err(ValidationError::required("power_bi.api_base_url"));
        }
        if self.power_bi.resource.is_empty() {
            return Err(ValidationError::required("power_bi.resource"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.foundry.base_url, DEFAULT_FOUNDRY_BASE);
        assert_eq!(
            config.foundry.chat_endpoint(),
            "http://127.0.0.1:51970/v1/chat/completions"
        );
        assert_eq!(config.cache.ttl(), Duration::from_secs(300));
        assert_eq!(config.azure.tenant_or_common(), "common");
        assert!(!config.is_fabric_configured());
        assert!(config.is_foundry_configured());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_trailing_slash_in_base_url() {
        let foundry = FoundryConfig {
            base_url: "http://localhost:5000/v1/".to_string(),
            ..Default::default()
        };
        assert_eq!(foundry.models_endpoint(), "http://localhost:5000/v1/models");
    }

    #[test]
    fn test_client_credentials_require_both() {
        let mut azure = AzureConfig {
            client_id: Some("app".to_string()),
            ..Default::default()
        };
        assert!(azure.client_credentials().is_none());

        azure.client_secret = Some(SecretString::new("s3cret"));
        let (id, secret) = azure.client_credentials().unwrap();
        assert_eq!(id, "app");
        assert_eq!(secret.expose_secret(), "s3cret");
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let mut config = AppConfig::default();
        config.cache.ttl_minutes = 0;
        let err = config.validate().unwrap_err();
        assert_eq!(err.field_path, "cache.ttl_minutes");
    }

    #[test]
    fn test_log_level_aliases() {
        let level = |value: &str| {
            AppConfig {
                log_level: Some(value.to_string()),
                ..Default::default()
            }
            .log_level()
        };
        assert_eq!(level("INFO"), "info");
        assert_eq!(level("WARNING"), "warn");
        assert_eq!(level("Critical"), "error");
        assert_eq!(AppConfig::default().log_level(), DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let cache = CacheConfig {
            ttl_minutes: 400_000_000_000_000_000,
        };
        assert_eq!(cache.ttl(), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
foundry:
  fast_model: phi-3.5-mini-instruct
cache:
  ttl_minutes: 10
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.foundry.fast_model, "phi-3.5-mini-instruct");
        assert_eq!(config.foundry.powerful_model, DEFAULT_POWERFUL_MODEL);
        assert_eq!(config.cache.ttl_minutes, 10);
    }
}
