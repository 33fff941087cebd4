//! Error Types for the Helpsite
//!
//! This module defines error handling for the page layer, including:
//! - ApiError struct carried through handlers and middleware
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation rendering the HTML error pages
//!
//! Visitors only ever see the not-found page (404) or the generic error
//! page (everything else). The message is logged, never rendered.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use helpsite_core::{ConfigError, StorageError, UpstreamError};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::views;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for page responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Requested content or category does not exist
    NotFound,

    /// Required query or body parameter is absent
    MissingParameter,

    /// Request contains invalid input data
    InvalidInput,

    /// An upstream API call failed
    UpstreamFailure,

    /// Token could not be issued or refreshed
    AuthenticationFailed,

    /// Cache backend failed on a write
    CacheError,

    /// Internal server error
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,

            ErrorCode::InvalidInput => StatusCode::BAD_REQUEST,

            // Missing parameters surface as server errors, like the
            // generic error page the visitor is shown.
            ErrorCode::MissingParameter
            | ErrorCode::UpstreamFailure
            | ErrorCode::AuthenticationFailed
            | ErrorCode::CacheError
            | ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Error raised while serving a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message, for logs
    pub message: String,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Create a MissingParameter error.
    pub fn missing_parameter(name: &str) -> Self {
        Self::new(
            ErrorCode::MissingParameter,
            format!("Required parameter '{}' is missing", name),
        )
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn upstream_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UpstreamFailure, message)
    }

    pub fn authentication_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthenticationFailed, message)
    }

    pub fn cache_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::CacheError, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Map a failed lookup of the page's own subject.
    ///
    /// Only here does an upstream 404 become the visitor's 404; every other
    /// call site goes through `From<UpstreamError>` and yields a 500.
    pub fn from_lookup(err: UpstreamError) -> Self {
        match err {
            UpstreamError::NotFound { .. } => ApiError::not_found(err.to_string()),
            other => other.into(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

/// Render the not-found page for 404s and the error page for everything else.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = %self.code, message = %self.message, "Request failed");
        } else {
            tracing::debug!(code = %self.code, message = %self.message, "Request rejected");
        }

        let page = match status {
            StatusCode::NOT_FOUND => views::not_found_page(),
            _ => views::error_page(),
        };
        (status, Html(page)).into_response()
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        ApiError::upstream_failure(err.to_string())
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::cache_error(err.to_string())
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::internal_error(err.to_string())
    }
}

/// Convert from serde_json::Error to ApiError.
impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON serialization error: {:?}", err);
        ApiError::internal_error(format!("Invalid JSON: {}", err))
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for page operations.
pub type ApiResult<T> = Result<T, ApiError>;
