//! # Core Error Types
//!
//! Typed errors shared by the chain crates. Chain code wraps them in
//! `anyhow::Error` and downcasts where the variant matters.

use thiserror::Error;

/// Configuration-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid API URL format: '{url}'")]
    InvalidApiUrl { url: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// HTTP API errors, one per way a request can go wrong
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Request timeout after {timeout_ms}ms to {endpoint}")]
    Timeout { timeout_ms: u64, endpoint: String },

    #[error("Rate limited by {endpoint}: too many requests")]
    RateLimited { endpoint: String },

    #[error("Connection refused to {endpoint}: {reason}")]
    ConnectionRefused { endpoint: String, reason: String },

    #[error("HTTP error {status_code} from {endpoint}")]
    HttpError { status_code: u16, endpoint: String },

    /// The request went through but the body was not what we expected
    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },
}

impl NetworkError {
    /// Endpoint the failing request was addressed to
    pub fn endpoint(&self) -> &str {
        match self {
            NetworkError::Timeout { endpoint, .. }
            | NetworkError::RateLimited { endpoint }
            | NetworkError::ConnectionRefused { endpoint, .. }
            | NetworkError::HttpError { endpoint, .. }
            | NetworkError::InvalidResponse { endpoint, .. } => endpoint,
        }
    }
}
