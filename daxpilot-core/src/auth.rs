//! Azure AD bearer tokens for the Power BI REST API
//!
//! A [`TokenManager`] is either unauthenticated or holds one token with its
//! expiry. Tokens are acquired through the Azure CLI (developer login) or the
//! OAuth client-credentials grant (app registration). There is no automatic
//! refresh: once a token is within [`EXPIRY_BUFFER_MINUTES`] of expiring it is no
//! longer handed out and callers must acquire a new one.

use crate::config::{AzureConfig, PowerBiConfig, SecretString};
use crate::error::{ServiceError, ServiceResult};
use crate::http::{CallKind, HttpClient, RequestOptions};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

/// Minutes before expiry at which a token stops being handed out
pub const EXPIRY_BUFFER_MINUTES: i64 = 5;

/// Lifetime assumed for tokens issued by the Azure CLI
const CLI_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Lifetime assumed when the token endpoint omits `expires_in`
const DEFAULT_EXPIRES_IN: i64 = 3600;

const CLI_TIMEOUT: Duration = Duration::from_secs(10);

/// A bearer token and the instant it expires
#[derive(Debug, Clone)]
pub struct AccessToken {
    value: SecretString,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: SecretString::new(value),
            expires_at,
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Usable only while `now < expiry - 5 minutes`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        let buffer = ChronoDuration::minutes(EXPIRY_BUFFER_MINUTES);
        !self.value.is_empty() && now < self.expires_at - buffer
    }

    pub fn expose_secret(&self) -> &str {
        self.value.expose_secret()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
}

/// Holds at most one Power BI token for a session
pub struct TokenManager {
    http: HttpClient,
    azure: AzureConfig,
    resource: String,
    cli_program: String,
    token: Option<AccessToken>,
}

impl TokenManager {
    pub fn new(http: HttpClient, azure: AzureConfig, power_bi: &PowerBiConfig) -> Self {
        Self {
            http,
            azure,
            resource: power_bi.resource.clone(),
            cli_program: "az".to_string(),
            token: None,
        }
    }

    /// Use a different executable in place of `az`
    pub fn with_cli_program(mut self, program: impl Into<String>) -> Self {
        self.cli_program = program.into();
        self
    }

    /// Seed a token obtained elsewhere
    pub fn with_token(mut self, value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        self.token = Some(AccessToken::new(value, expires_at));
        self
    }

    /// Token endpoint of the configured tenant
    pub fn token_endpoint(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.azure.authority.trim_end_matches('/'),
            self.azure.tenant_or_common()
        )
    }

    /// Acquire a token with the client credentials from the configuration,
    /// or through the Azure CLI when none are configured
    pub async fn acquire(&mut self) -> ServiceResult<()> {
        let credentials = self
            .azure
            .client_credentials()
            .map(|(id, secret)| (id.to_string(), secret.clone()));

        match credentials {
            Some((client_id, secret)) => {
                self.acquire_with_client_credentials(&client_id, &secret).await
            }
            None => self.acquire_with_cli().await,
        }
    }

    /// Ask the Azure CLI for a token (requires a prior `az login`)
    pub async fn acquire_with_cli(&mut self) -> ServiceResult<()> {
        self.token = None;
        debug!("Requesting token from {} for {}", self.cli_program, self.resource);

        let output = Command::new(&self.cli_program)
            .args([
                "account",
                "get-access-token",
                "--resource",
                self.resource.as_str(),
                "--query",
                "accessToken",
                "-o",
                "tsv",
            ])
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(CLI_TIMEOUT, output)
            .await
            .map_err(|_| {
                error!("{} did not answer within {:?}", self.cli_program, CLI_TIMEOUT);
                ServiceError::CredentialCommand(format!(
                    "{} timed out after {} seconds",
                    self.cli_program,
                    CLI_TIMEOUT.as_secs()
                ))
            })?
            .map_err(|e| {
                error!("Could not run {}: {}", self.cli_program, e);
                ServiceError::CredentialCommand(format!(
                    "could not run {}: {}",
                    self.cli_program, e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!("{} exited with {}: {}", self.cli_program, output.status, stderr);
            return Err(ServiceError::CredentialCommand(stderr));
        }

        let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if value.is_empty() {
            return Err(ServiceError::CredentialCommand(format!(
                "{} printed no token",
                self.cli_program
            )));
        }

        let expires_at = Utc::now() + ChronoDuration::seconds(CLI_TOKEN_LIFETIME_SECS);
        self.token = Some(AccessToken::new(value, expires_at));
        info!("Acquired Power BI token via {}", self.cli_program);
        Ok(())
    }

    /// Run the OAuth client-credentials grant against the tenant
    pub async fn acquire_with_client_credentials(
        &mut self,
        client_id: &str,
        client_secret: &SecretString,
    ) -> ServiceResult<()> {
        self.token = None;
        let url = self.token_endpoint();
        let scope = format!("{}/.default", self.resource.trim_end_matches('/'));
        debug!("Requesting client-credentials token from {}", url);

        let form = [
            ("client_id", client_id),
            ("client_secret", client_secret.expose_secret()),
            ("scope", scope.as_str()),
            ("grant_type", "client_credentials"),
        ];
        let options = RequestOptions::new(CallKind::Token);
        let response: TokenResponse = self
            .http
            .execute_json(self.http.post(&url).form(&form), &options)
            .await?;

        let value = response
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ServiceError::MalformedResponse("token response has no access_token".to_string())
            })?;
        let expires_in = response.expires_in.unwrap_or(DEFAULT_EXPIRES_IN);

        self.token = Some(AccessToken::new(
            value,
            Utc::now() + ChronoDuration::seconds(expires_in),
        ));
        info!("Acquired Power BI token for client {}", client_id);
        Ok(())
    }

    /// Whether a token is held and outside the expiry buffer
    pub fn is_token_valid(&self) -> bool {
        self.token
            .as_ref()
            .is_some_and(|token| token.is_valid_at(Utc::now()))
    }

    /// The token, if still valid
    pub fn token(&self) -> Option<&str> {
        self.token
            .as_ref()
            .filter(|token| token.is_valid_at(Utc::now()))
            .map(|token| token.expose_secret())
    }

    /// The token, or `NotAuthenticated`
    pub fn bearer(&self) -> ServiceResult<&str> {
        self.token().ok_or(ServiceError::NotAuthenticated)
    }

    /// Expiry of the held token, valid or not
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.token.as_ref().map(|token| token.expires_at())
    }

    /// Authorization and content-type headers; empty without a valid token
    pub fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(token) = self.token() {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                headers.insert(AUTHORIZATION, value);
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            }
        }
        headers
    }

    /// Forget the held token
    pub fn sign_out(&mut self) {
        if self.token.take().is_some() {
            info!("Signed out of Power BI");
        }
    }
}
