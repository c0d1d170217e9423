//! Error types for document store operations.
//!
//! Every failure is classified as transient or permanent so the relay can
//! decide whether another attempt is worth making.

use std::fmt;

use thiserror::Error;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors returned by a document store client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Network-level connectivity failure.
    #[error("network connection failed: {message}")]
    NetworkError {
        /// Error message describing the network failure
        message: String,
    },

    /// Request timeout exceeded.
    #[error("request timeout after {timeout_ms}ms")]
    Timeout {
        /// Milliseconds before the request timed out
        timeout_ms: u64,
    },

    /// Store answered with a 4xx status.
    #[error("client error: HTTP {status_code}")]
    ClientError {
        /// HTTP status code (4xx)
        status_code: u16,
        /// Response body content
        body: String,
    },

    /// Store answered with a 5xx status.
    #[error("server error: HTTP {status_code}")]
    ServerError {
        /// HTTP status code (5xx)
        status_code: u16,
        /// Response body content
        body: String,
    },

    /// Store asked the client to slow down.
    #[error("rate limited: retry after {retry_after_seconds}s")]
    RateLimited {
        /// Seconds to wait before retrying
        retry_after_seconds: u64,
    },

    /// Client or key cannot form a valid request.
    #[error("invalid store configuration: {message}")]
    ConfigurationError {
        /// Configuration error message
        message: String,
    },
}

/// Whether a store error may clear up on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// Retrying may succeed.
    Transient,
    /// Retrying will fail the same way.
    Permanent,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => write!(f, "transient"),
            Self::Permanent => write!(f, "permanent"),
        }
    }
}

impl StoreError {
    /// Creates a network error from a message.
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError { message: message.into() }
    }

    /// Creates a timeout error.
    pub fn timeout(timeout_ms: u64) -> Self {
        Self::Timeout { timeout_ms }
    }

    /// Creates a client error from an HTTP response.
    pub fn client_error(status_code: u16, body: impl Into<String>) -> Self {
        Self::ClientError { status_code, body: body.into() }
    }

    /// Creates a server error from an HTTP response.
    pub fn server_error(status_code: u16, body: impl Into<String>) -> Self {
        Self::ServerError { status_code, body: body.into() }
    }

    /// Creates a rate limit error with retry guidance.
    pub fn rate_limited(retry_after_seconds: u64) -> Self {
        Self::RateLimited { retry_after_seconds }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError { message: message.into() }
    }

    /// Classifies the error.
    ///
    /// Network errors, timeouts, 5xx, 429 and 408 are transient. Other 4xx
    /// responses (including 401 and 403 for bad credentials) and
    /// configuration problems are permanent.
    pub fn kind(&self) -> StoreErrorKind {
        match self {
            Self::NetworkError { .. }
            | Self::Timeout { .. }
            | Self::ServerError { .. }
            | Self::RateLimited { .. }
            | Self::ClientError { status_code: 408, .. } => StoreErrorKind::Transient,

            Self::ClientError { .. } | Self::ConfigurationError { .. } => {
                StoreErrorKind::Permanent
            },
        }
    }

    /// Returns `true` when another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind() == StoreErrorKind::Transient
    }

    /// Returns the store-requested retry delay in seconds, if any.
    pub fn retry_after_seconds(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_seconds } => Some(*retry_after_seconds),
            _ => None,
        }
    }
}
