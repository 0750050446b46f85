//! Error types for calls against external services

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors that can occur when talking to Foundry, Power BI, Azure AD,
/// Text Analytics or GitHub
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Connection could not be established or was dropped
    #[error("Network error: {message}")]
    Network { message: String, connect: bool },

    /// Request exceeded its timeout
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Non-success status that has no dedicated variant
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Response body was not the expected JSON shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// No valid token is held; acquire one first
    #[error("Not authenticated: acquire a token first")]
    NotAuthenticated,

    /// Service rejected the bearer token (HTTP 401)
    #[error("Authentication failed, the token may have expired")]
    AuthenticationExpired,

    /// Caller lacks permissions on the workspace or dataset (HTTP 403)
    #[error("Access denied, check workspace and dataset permissions")]
    PermissionDenied,

    /// Execute-queries rejected the DAX (HTTP 400); payload passed through
    #[error("DAX syntax error: {details}")]
    DaxSyntax { details: Value },

    /// Delegated credential command failed
    #[error("Credential command failed: {0}")]
    CredentialCommand(String),

    /// Neither a fast nor a powerful model is available
    #[error("No viable model: neither a fast nor a powerful model is available")]
    NoViableModel,

    /// Model answered with no content
    #[error("Model returned an empty completion")]
    EmptyCompletion,

    /// Local file error
    #[error("IO error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Client could not be built
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ServiceError {
    /// Whether the remote service could not be reached at all.
    ///
    /// The chat flow offers a demo reply when this is true.
    pub fn is_connection_failure(&self) -> bool {
        matches!(
            self,
            Self::Network { connect: true, .. } | Self::Timeout(_)
        )
    }

    /// Whether re-acquiring a token could fix this error
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, Self::NotAuthenticated | Self::AuthenticationExpired)
    }

    /// HTTP status code carried by the error, if any
    pub fn status(&self) -> Option<StatusCode> {
        let code = match self {
            Self::Http { status, .. } => *status,
            Self::AuthenticationExpired => 401,
            Self::PermissionDenied => 403,
            Self::DaxSyntax { .. } => 400,
            _ => return None,
        };
        StatusCode::from_u16(code).ok()
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::MalformedResponse(err.to_string())
    }
}
