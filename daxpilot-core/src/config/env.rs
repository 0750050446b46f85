//! Environment handling: `${VAR}` interpolation for config files and
//! the environment-only configuration source

use super::error::ConfigError;
use super::schema::AppConfig;
use super::secrets::SecretString;
use regex::Regex;
use std::path::PathBuf;
use std::str::FromStr;

const ENV_VAR_PATTERN: &str = r"\$\{([A-Z_][A-Z0-9_]*)\}";

pub(crate) fn env_var_regex() -> Result<Regex, ConfigError> {
    Regex::new(ENV_VAR_PATTERN).map_err(|e| ConfigError::Invalid {
        message: format!("bad interpolation pattern: {}", e),
    })
}

/// Interpolate environment variables in a configuration string
pub fn interpolate_env_vars(content: &str) -> Result<String, ConfigError> {
    interpolate_with(content, |name| std::env::var(name).ok())
}

/// Interpolate `${VAR}` references using an arbitrary lookup
pub fn interpolate_with<F>(content: &str, lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let pattern = env_var_regex()?;
    let mut result = content.to_string();

    for cap in pattern.captures_iter(content) {
        let full_match = &cap[0];
        let var_name = &cap[1];

        match lookup(var_name) {
            Some(value) => result = result.replace(full_match, &value),
            None => {
                return Err(ConfigError::EnvVarNotFound {
                    var: var_name.to_string(),
                })
            }
        }
    }

    Ok(result)
}

/// Build a configuration from the process environment
pub fn from_env() -> Result<AppConfig, ConfigError> {
    from_lookup(|name| std::env::var(name).ok())
}

/// Build a configuration from an arbitrary variable lookup.
///
/// Every variable is optional; unset or empty values keep the default.
pub fn from_lookup<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
    let mut config = AppConfig::default();

    if let Some(v) = get("FOUNDRY_BASE") {
        config.foundry.base_url = v;
    }
    if let Some(v) = get("FOUNDRY_MODEL_PHI") {
        config.foundry.fast_model = v;
    }
    if let Some(v) = get("FOUNDRY_MODEL_QWEN") {
        config.foundry.powerful_model = v;
    }
    if let Some(v) = get("FOUNDRY_TIMEOUT") {
        config.foundry.timeout_secs = parse_var("FOUNDRY_TIMEOUT", &v)?;
    }

    if let Some(v) = get("POWER_BI_API_BASE") {
        config.power_bi.api_base_url = v;
    }
    if let Some(v) = get("POWER_BI_RESOURCE") {
        config.power_bi.resource = v;
    }
    config.power_bi.workspace_id = get("POWER_BI_WORKSPACE_ID");
    config.power_bi.dataset_id = get("POWER_BI_DATASET_ID");

    if let Some(v) = get("AZURE_AUTHORITY") {
        config.azure.authority = v;
    }
    config.azure.tenant_id = get("AZURE_TENANT_ID");
    config.azure.client_id = get("AZURE_CLIENT_ID");
    config.azure.client_secret = get("AZURE_CLIENT_SECRET").map(SecretString::new);

    config.analytics.endpoint = get("AZURE_TEXT_ANALYTICS_ENDPOINT");
    config.analytics.key = get("AZURE_TEXT_ANALYTICS_KEY").map(SecretString::new);

    if let Some(v) = get("GITHUB_API_BASE") {
        config.github.api_base_url = v;
    }
    config.github.repository = get("GITHUB_REPOSITORY");

    if let Some(v) = get("CACHE_TTL_MINUTES") {
        config.cache.ttl_minutes = parse_var("CACHE_TTL_MINUTES", &v)?;
    }

    config.history_path = get("INSIGHTS_HISTORY_PATH").map(PathBuf::from);
    config.log_level = get("LOG_LEVEL").map(|level| level.to_lowercase());

    Ok(config)
}

fn parse_var<T>(var: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            message: e.to_string(),
        })
}
