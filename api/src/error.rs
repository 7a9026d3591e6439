//! Error types for the geotech API client
//!
//! Failures come in two tiers. [`TransportError`] is what the HTTP layer
//! saw: the status and the raw error body. [`DomainError`] is what a caller
//! shows to a user: one readable message plus the original status. The
//! resource services translate the first into the second.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Plain-text error bodies longer than this are not used as messages.
const MAX_PLAIN_MESSAGE_LEN: usize = 200;

/// Errors raised by the HTTP client adapter
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransportError {
    /// The base URL or request path did not form a valid URL
    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),

    /// The HTTP client could not be constructed
    #[error("HTTP client setup failed: {0}")]
    Setup(String),

    /// The request never produced a response
    #[error("Request failed: {0}")]
    Network(String),

    /// The server answered with a non-2xx status
    #[error("API error (status {status})")]
    Status {
        /// HTTP status code
        status: u16,
        /// Parsed JSON error body, or the raw text as a JSON string
        body: Option<Value>,
    },

    /// A 2xx response whose body could not be decoded
    #[error("Response parsing failed (status {status}): {message}")]
    Decode {
        /// HTTP status code
        status: u16,
        /// Decoder error
        message: String,
    },
}

impl TransportError {
    /// HTTP status of the response, if there was one
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } | Self::Decode { status, .. } => Some(*status),
            Self::InvalidUrl(_) | Self::Setup(_) | Self::Network(_) => None,
        }
    }

    /// Structured error body of a non-2xx response
    #[must_use]
    pub const fn body(&self) -> Option<&Value> {
        match self {
            Self::Status { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    /// Whether the server rejected the request's credentials
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401, .. })
    }
}

/// A failure ready to be shown to a user
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct DomainError {
    /// Human-readable message
    pub message: String,
    /// HTTP status of the response that caused it
    pub status: Option<u16>,
}

impl DomainError {
    /// Create an error with no HTTP status
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    /// Attach the originating HTTP status
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Normalize a transport failure
    ///
    /// Uses the message the server put in the error body when there is one,
    /// otherwise `default_message`.
    #[must_use]
    pub fn from_transport(error: &TransportError, default_message: &str) -> Self {
        let message = error
            .body()
            .and_then(extract_message)
            .unwrap_or_else(|| default_message.to_string());

        Self {
            message,
            status: error.status(),
        }
    }
}

/// Pull a readable message out of an error body
///
/// Looks at `error`, `message` and `detail` in that order, then flattens
/// field validation errors (`{"name": ["This field is required."]}`) into
/// `name: This field is required.`, joined with `; `. A short plain-text
/// body is used as-is.
#[must_use]
pub fn extract_message(body: &Value) -> Option<String> {
    match body {
        Value::String(text) => {
            let text = text.trim();
            let usable = !text.is_empty()
                && text.len() <= MAX_PLAIN_MESSAGE_LEN
                && !text.starts_with('<');
            usable.then(|| text.to_string())
        }
        Value::Object(fields) => {
            for key in ["error", "message", "detail"] {
                if let Some(Value::String(text)) = fields.get(key) {
                    if !text.trim().is_empty() {
                        return Some(text.clone());
                    }
                }
            }

            let parts: Vec<String> = fields
                .iter()
                .filter_map(|(field, value)| {
                    let messages = field_messages(value);
                    if messages.is_empty() {
                        None
                    } else if field == "non_field_errors" {
                        Some(messages.join(" "))
                    } else {
                        Some(format!("{field}: {}", messages.join(" ")))
                    }
                })
                .collect();

            (!parts.is_empty()).then(|| parts.join("; "))
        }
        _ => None,
    }
}

fn field_messages(value: &Value) -> Vec<&str> {
    match value {
        Value::String(text) => vec![text.as_str()],
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

/// Errors from durable client storage and download sinks
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem failure
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be read or written as JSON
    #[error("Stored data is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A lock guarding in-memory storage was poisoned
    #[error("Storage lock poisoned")]
    Poisoned,
}
