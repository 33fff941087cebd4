//! Error types for helpsite operations

use thiserror::Error;

/// Errors raised while talking to an upstream HTTP API (auth or KM).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("Request to {api} {endpoint} failed: {reason}")]
    Transport {
        api: String,
        endpoint: String,
        reason: String,
    },

    #[error("{api} {endpoint} returned status {status}: {body}")]
    Status {
        api: String,
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {api} {endpoint}: {reason}")]
    InvalidResponse {
        api: String,
        endpoint: String,
        reason: String,
    },

    #[error("Resource not found: {api} {endpoint}")]
    NotFound { api: String, endpoint: String },
}

impl UpstreamError {
    /// True when the upstream reported that the requested resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, UpstreamError::NotFound { .. })
    }
}

/// Cache backend errors.
///
/// These never reach page handlers through `get`: a failed read is a miss.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Cache backend {backend} unavailable: {reason}")]
    Unavailable { backend: String, reason: String },

    #[error("Cache backend {backend} operation failed: {reason}")]
    OperationFailed { backend: String, reason: String },

    #[error("Cache value serialization failed: {reason}")]
    Serialization { reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}
