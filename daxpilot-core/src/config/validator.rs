//! Configuration validation utilities

use super::env::env_var_regex;
use super::error::{ConfigError, ValidationError, ValidationErrorKind};
use super::schema::AppConfig;
use regex::Regex;
use url::Url;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Configuration validator with additional validation rules
pub struct ConfigValidator {
    /// Pattern for environment variable placeholders
    env_var_pattern: Regex,
}

impl ConfigValidator {
    /// Create a new validator
    pub fn new() -> Result<Self, ConfigError> {
        Ok(Self {
            env_var_pattern: env_var_regex()?,
        })
    }

    /// Validate a configuration with extended rules
    pub fn validate(&self, config: &AppConfig) -> Result<(), ValidationError> {
        // First run the built-in validation
        config.validate()?;

        self.validate_urls(config)?;
        self.validate_credentials(config)?;
        self.validate_log_level(config)?;

        Ok(())
    }

    fn validate_urls(&self, config: &AppConfig) -> Result<(), ValidationError> {
        check_url("foundry.base_url", &config.foundry.base_url)?;
        check_url("power_bi.api_base_url", &config.power_bi.api_base_url)?;
        check_url("power_bi.resource", &config.power_bi.resource)?;
        check_url("azure.authority", &config.azure.authority)?;
        check_url("github.api_base_url", &config.github.api_base_url)?;
        if let Some(endpoint) = config.analytics.endpoint.as_deref() {
            check_url("analytics.endpoint", endpoint)?;
        }
        Ok(())
    }

    /// Client ID and secret come as a pair
    fn validate_credentials(&self, config: &AppConfig) -> Result<(), ValidationError> {
        let has_id = config.azure.client_id.as_deref().is_some_and(|s| !s.is_empty());
        let has_secret = config
            .azure
            .client_secret
            .as_ref()
            .is_some_and(|s| !s.is_empty());

        if has_id != has_secret {
            let missing = if has_id {
                "azure.client_secret"
            } else {
                "azure.client_id"
            };
            return Err(ValidationError::new(
                missing,
                ValidationErrorKind::Incompatible {
                    message: "client credentials need both client_id and client_secret"
                        .to_string(),
                },
            ));
        }

        if config.analytics.endpoint.is_some() && config.analytics.key.is_none() {
            return Err(ValidationError::required("analytics.key")
                .with_context("an analytics endpoint is set without a subscription key"));
        }

        Ok(())
    }

    fn validate_log_level(&self, config: &AppConfig) -> Result<(), ValidationError> {
        let level = config.log_level();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ValidationError::invalid_value(
                "log_level",
                LOG_LEVELS.join("|"),
                level,
            ));
        }
        Ok(())
    }

    /// Extract environment variables from a string
    pub fn extract_env_vars(&self, text: &str) -> Vec<String> {
        self.env_var_pattern
            .captures_iter(text)
            .map(|cap| cap[1].to_string())
            .collect()
    }
}

fn check_url(field: &str, value: &str) -> Result<(), ValidationError> {
    let parsed = Url::parse(value).map_err(|e| {
        ValidationError::new(
            field,
            ValidationErrorKind::InvalidUrl {
                message: e.to_string(),
            },
        )
        .with_context(value.to_string())
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ValidationError::new(
            field,
            ValidationErrorKind::InvalidUrl {
                message: format!("unsupported scheme '{}'", other),
            },
        )),
    }
}
