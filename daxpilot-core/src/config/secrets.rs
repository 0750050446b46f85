//! Secrets handling and redaction for configuration
//!
//! Client secrets, subscription keys and bearer tokens are wrapped in
//! [`SecretString`] so they never show up in Debug/Display output or logs.
//! Serialization keeps the real value so configs can be written back.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A wrapper type for sensitive strings like client secrets and tokens
#[derive(Clone, Deserialize, Serialize)]
#[serde(transparent)]
pub struct SecretString {
    value: String,
}

impl SecretString {
    /// Create a new secret string
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Get the actual value (use with caution)
    pub fn expose_secret(&self) -> &str {
        &self.value
    }

    /// Check if the secret is empty
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Get a partially redacted version for debugging
    pub fn partial_redact(&self) -> String {
        if self.value.is_empty() {
            return "[EMPTY]".to_string();
        }

        let len = self.value.chars().count();
        if len <= 8 {
            "[REDACTED]".to_string()
        } else {
            let head: String = self.value.chars().take(2).collect();
            let tail: String = self.value.chars().skip(len - 2).collect();
            format!("{}...{}", head, tail)
        }
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for SecretString {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A trait for types that can be logged safely
pub trait SafeLogging {
    /// Returns a safe version for logging
    fn safe_for_logging(&self) -> String;
}

/// Redaction policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedactionPolicy {
    /// Fully redact all sensitive fields
    #[default]
    Full,
    /// Show the first two characters
    Partial,
}

const SENSITIVE_PATTERNS: &[&str] = &[
    "secret",
    "token",
    "password",
    "credential",
    "key",
    "authorization",
];

/// Whether a field name looks like it holds a secret
pub fn is_sensitive_field(field_name: &str) -> bool {
    let field_lower = field_name.to_lowercase();
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| field_lower.contains(pattern))
}

/// Redact a string based on field name patterns
pub fn redact_by_field_name(field_name: &str, value: &str, policy: RedactionPolicy) -> String {
    if !is_sensitive_field(field_name) {
        return value.to_string();
    }

    match policy {
        RedactionPolicy::Full => "[REDACTED]".to_string(),
        RedactionPolicy::Partial => {
            if value.chars().count() <= 4 {
                "[REDACTED]".to_string()
            } else {
                format!("{}...", value.chars().take(2).collect::<String>())
            }
        }
    }
}

/// Recursively redact sensitive string fields of a JSON value in place
pub fn redact_json(value: &mut Value, policy: RedactionPolicy) {
    match value {
        Value::Object(map) => {
            for (field, child) in map.iter_mut() {
                match child {
                    Value::String(text) => *text = redact_by_field_name(field, text, policy),
                    other => redact_json(other, policy),
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                redact_json(item, policy);
            }
        }
        _ => {}
    }
}
