//! Client error types.

use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Field name to validation messages, as returned by the backend on 400.
///
/// Errors that are not tied to a field are kept under `non_field_errors`
/// (or `detail` when the backend uses that key).
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Client error type.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Login rejected by the backend
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Access was rejected and could not be recovered; the caller must log in again.
    /// Carries the backend's `detail` message when one was sent.
    #[error("Not authenticated{}", .0.as_ref().map(|d| format!(": {d}")).unwrap_or_default())]
    Unauthorized(Option<String>),

    /// Request rejected with per-field messages
    #[error("Validation failed: {}", summarize_fields(.0))]
    Validation(FieldErrors),

    /// Resource does not exist
    #[error("Not found")]
    NotFound,

    /// Backend failed with a 5xx status
    #[error("Server error: HTTP {status}: {body}")]
    Server { status: u16, body: String },

    /// Any other unexpected status
    #[error("Unexpected response: HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Request could not be delivered
    #[error("Network unavailable")]
    NetworkUnavailable,

    /// Invalid state transition in the session FSM
    #[error("Invalid session state transition: {0}")]
    InvalidStateTransition(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ClientError {
    /// Classify a non-success response.
    pub fn from_response(status: u16, body: &str) -> Self {
        match status {
            400 => match parse_field_errors(body) {
                Some(fields) => ClientError::Validation(fields),
                None => ClientError::Status {
                    status,
                    body: summarize_body(body),
                },
            },
            401 => ClientError::Unauthorized(detail_field(body)),
            404 => ClientError::NotFound,
            500..=599 => ClientError::Server {
                status,
                body: summarize_body(body),
            },
            _ => ClientError::Status {
                status,
                body: summarize_body(body),
            },
        }
    }

    /// Returns true if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::NetworkUnavailable => true,
            ClientError::Server { .. } => true,
            ClientError::Http(e) => {
                if e.is_connect() || e.is_timeout() {
                    return true;
                }
                if let Some(status) = e.status() {
                    return status.is_server_error();
                }
                false
            }
            _ => false,
        }
    }

    /// Returns true if the session is gone and the user has to log in again.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, ClientError::Unauthorized(_))
    }

    /// Field messages for validation failures.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            ClientError::Validation(fields) => Some(fields),
            _ => None,
        }
    }
}

/// Result type alias using ClientError.
pub type ClientResult<T> = Result<T, ClientError>;

/// Parse a DRF-style error object into field messages.
///
/// Accepts `{"field": ["msg", ...]}`, `{"field": "msg"}` and nested objects,
/// which are flattened with dotted keys.
pub(crate) fn parse_field_errors(body: &str) -> Option<FieldErrors> {
    let value: Value = serde_json::from_str(body).ok()?;
    let object = value.as_object()?;
    if object.is_empty() {
        return None;
    }

    let mut fields = FieldErrors::new();
    for (key, value) in object {
        collect_messages(key, value, &mut fields);
    }
    Some(fields)
}

fn collect_messages(key: &str, value: &Value, fields: &mut FieldErrors) {
    match value {
        Value::String(message) => fields
            .entry(key.to_string())
            .or_default()
            .push(message.clone()),
        Value::Array(items) => {
            for item in items {
                collect_messages(key, item, fields);
            }
        }
        Value::Object(nested) => {
            for (child, value) in nested {
                collect_messages(&format!("{key}.{child}"), value, fields);
            }
        }
        Value::Null => {}
        other => fields
            .entry(key.to_string())
            .or_default()
            .push(other.to_string()),
    }
}

/// Pull a human-readable message out of an error body: `detail` if present,
/// otherwise the field messages, otherwise the raw body.
pub(crate) fn detail_message(body: &str) -> String {
    if let Some(detail) = detail_field(body) {
        return detail;
    }
    match parse_field_errors(body) {
        Some(fields) => summarize_fields(&fields),
        None => summarize_body(body),
    }
}

fn detail_field(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(Value::as_str).map(str::to_string))
}

const MAX_BODY_CHARS: usize = 200;

fn summarize_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_BODY_CHARS {
        return trimmed.to_string();
    }
    let mut summary: String = trimmed.chars().take(MAX_BODY_CHARS).collect();
    summary.push_str("...");
    summary
}

fn summarize_fields(fields: &FieldErrors) -> String {
    fields
        .iter()
        .map(|(field, messages)| format!("{field}: {}", messages.join(" ")))
        .collect::<Vec<_>>()
        .join("; ")
}
