//! Error types for the API client
//!
//! Provides unified error handling using thiserror. Errors are `Clone` so that a
//! single outcome can be handed to every caller waiting on the same request.

use serde_json::Value;
use thiserror::Error;

// == Api Error Enum ==
/// Unified error type for the client pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// The server answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Machine-readable error code from the body, if any
        code: Option<String>,
        /// Human-readable message
        message: String,
        /// Raw response body
        body: Value,
    },

    /// The request never produced a response (connect, TLS, timeout...)
    #[error("Network error: {0}")]
    Network(String),

    /// The response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Invalid request or configuration
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The task executing a shared request went away before settling
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    // == Constructors ==
    /// Builds a status error from a response body, extracting `code` and `message`
    /// from either the top level or a nested `error` object.
    pub fn from_status(status: u16, body: Value) -> Self {
        let lookup = |field: &str| -> Option<String> {
            body.get(field)
                .or_else(|| body.get("error").and_then(|e| e.get(field)))
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        let code = lookup("code");
        let message = lookup("message")
            .or_else(|| body.get("error").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| format!("request failed with status {}", status));

        ApiError::Status {
            status,
            code,
            message,
            body,
        }
    }

    // == Accessors ==
    /// Returns the HTTP status, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the error code carried in the body, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Status { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the client.
pub type Result<T> = std::result::Result<T, ApiError>;
