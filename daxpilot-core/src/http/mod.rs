//! HTTP layer shared by every service client
//!
//! This module implements the transport for daxpilot, handling:
//! - Connection pooling and client management
//! - Per-endpoint timeouts
//! - Error mapping from status codes and transport failures
//! - Request ID generation and correlation

pub mod client;
pub mod error;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

pub use client::HttpClient;

/// Type of API call being made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallKind {
    /// Foundry chat completion
    Chat,
    /// Foundry model listing
    Models,
    /// Azure AD token endpoint
    Token,
    /// Power BI catalog reads (workspaces, datasets, tables)
    Catalog,
    /// Power BI executeQueries
    ExecuteQueries,
    /// Azure Text Analytics
    TextAnalytics,
    /// GitHub REST API
    GitHub,
}

impl CallKind {
    /// Timeout used when the caller does not override it
    pub fn default_timeout(&self) -> Duration {
        match self {
            CallKind::Chat => Duration::from_secs(180),
            CallKind::Models => Duration::from_secs(30),
            CallKind::Token => Duration::from_secs(10),
            CallKind::Catalog => Duration::from_secs(10),
            CallKind::ExecuteQueries => Duration::from_secs(30),
            CallKind::TextAnalytics => Duration::from_secs(30),
            CallKind::GitHub => Duration::from_secs(10),
        }
    }

    /// Short name used in log lines
    pub fn label(&self) -> &'static str {
        match self {
            CallKind::Chat => "chat",
            CallKind::Models => "models",
            CallKind::Token => "token",
            CallKind::Catalog => "catalog",
            CallKind::ExecuteQueries => "execute_queries",
            CallKind::TextAnalytics => "text_analytics",
            CallKind::GitHub => "github",
        }
    }
}

/// Options for an HTTP request
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Type of API call
    pub call_kind: CallKind,

    /// Unique request ID for correlation
    pub request_id: Uuid,

    /// Request timeout
    pub timeout: Duration,
}

impl RequestOptions {
    /// Create new request options with a generated request ID and the
    /// call kind's default timeout
    pub fn new(call_kind: CallKind) -> Self {
        Self {
            call_kind,
            request_id: Uuid::new_v4(),
            timeout: call_kind.default_timeout(),
        }
    }

    /// Set the timeout for this request
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
