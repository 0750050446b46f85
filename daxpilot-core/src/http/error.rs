//! HTTP error mapping utilities

use crate::error::ServiceError;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

/// Map HTTP status code and response body to a ServiceError
pub fn map_http_error(status: StatusCode, body: Option<String>, request_id: Uuid) -> ServiceError {
    let extracted = body
        .as_deref()
        .and_then(|b| serde_json::from_str::<Value>(b).ok())
        .and_then(|v| extract_error_message(&v));
    let error_message = extracted
        .or(body)
        .unwrap_or_else(|| format!("HTTP error {}", status.as_u16()));

    match status {
        StatusCode::UNAUTHORIZED => ServiceError::AuthenticationExpired,
        StatusCode::FORBIDDEN => ServiceError::PermissionDenied,
        _ => ServiceError::Http {
            status: status.as_u16(),
            body: format!("{} [request_id: {}]", error_message, request_id),
        },
    }
}

/// Map a reqwest transport failure to a ServiceError
pub fn map_transport_error(err: reqwest::Error, timeout: Duration, request_id: Uuid) -> ServiceError {
    if err.is_timeout() {
        ServiceError::Timeout(timeout.as_secs())
    } else if err.is_connect() {
        ServiceError::Network {
            message: format!("Connection failed: {} [request_id: {}]", err, request_id),
            connect: true,
        }
    } else if err.is_decode() {
        ServiceError::MalformedResponse(format!("{} [request_id: {}]", err, request_id))
    } else {
        ServiceError::Network {
            message: format!("{} [request_id: {}]", err, request_id),
            connect: false,
        }
    }
}

/// Extract a human-readable message from common error payloads
fn extract_error_message(json: &Value) -> Option<String> {
    // Azure AD format: { "error": "invalid_client", "error_description": "..." }
    if let Some(description) = json.get("error_description").and_then(|v| v.as_str()) {
        return Some(description.to_string());
    }

    if let Some(error) = json.get("error") {
        // OpenAI / Azure format: { "error": { "message": "...", "code": "..." } }
        if let Some(message) = error.get("message").and_then(|v| v.as_str()) {
            return Some(message.to_string());
        }

        // Power BI format: { "error": { "code": "...", "pbi.error": {...} } }
        if let Some(code) = error.get("code").and_then(|v| v.as_str()) {
            return Some(code.to_string());
        }

        if let Some(text) = error.as_str() {
            return Some(text.to_string());
        }
    }

    json.get("message")
        .and_then(|v| v.as_str())
        .map(|message| message.to_string())
}
