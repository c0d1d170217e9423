//! Error types and result handling for webhook processing.
//!
//! Defines the error taxonomy with stable codes so callers can tell the
//! terminal request errors apart from downstream persistence failures.

use thiserror::Error;

/// Result type alias using `WebhookError`.
pub type Result<T> = std::result::Result<T, WebhookError>;

/// Payload was well formed but carried no usable identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("payment notes carry no pin")]
pub struct MissingIdentifier;

/// Failure to record a status in the document store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    /// Store kept failing transiently until the retry budget ran out.
    #[error("store unavailable after {attempts} attempts: {message}")]
    Transient {
        /// Attempts made before giving up
        attempts: u32,
        /// Last error reported by the store
        message: String,
    },

    /// Store refused the write in a way retrying cannot fix.
    #[error("store rejected write: {message}")]
    Permanent {
        /// Attempts made, normally 1
        attempts: u32,
        /// Error reported by the store
        message: String,
    },
}

impl PersistenceError {
    /// Creates a transient failure after `attempts` tries.
    pub fn transient(attempts: u32, message: impl Into<String>) -> Self {
        Self::Transient { attempts, message: message.into() }
    }

    /// Creates a permanent failure.
    pub fn permanent(attempts: u32, message: impl Into<String>) -> Self {
        Self::Permanent { attempts, message: message.into() }
    }

    /// Number of store calls made before failing.
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Transient { attempts, .. } | Self::Permanent { attempts, .. } => *attempts,
        }
    }

    /// Returns whether a later redelivery might succeed.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// Webhook error types with codes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    // Request errors (E1001-E1004)
    /// Request used a method other than POST (E1001).
    #[error("[E1001] Method not allowed: {method}")]
    MethodNotAllowed {
        /// Method the request arrived with
        method: String,
    },

    /// Signature header missing or not matching the body (E1002).
    #[error("[E1002] Invalid signature: {reason}")]
    InvalidSignature {
        /// Why the signature was rejected
        reason: String,
    },

    /// Authenticated body is not a valid event envelope (E1003).
    #[error("[E1003] Malformed payload: {reason}")]
    MalformedPayload {
        /// Parser diagnostic
        reason: String,
    },

    /// Captured payment carries no pin (E1004).
    #[error("[E1004] Missing identifier: payment notes carry no pin")]
    MissingIdentifier,

    // Downstream errors (E2001)
    /// Recording the payment failed (E2001).
    #[error("[E2001] Persistence failed: {0}")]
    Persistence(#[from] PersistenceError),
}

impl WebhookError {
    /// Creates a method error.
    pub fn method_not_allowed(method: impl Into<String>) -> Self {
        Self::MethodNotAllowed { method: method.into() }
    }

    /// Creates a signature error.
    pub fn invalid_signature(reason: impl Into<String>) -> Self {
        Self::InvalidSignature { reason: reason.into() }
    }

    /// Creates a malformed payload error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedPayload { reason: reason.into() }
    }

    /// Returns the error code (E1001-E2001).
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MethodNotAllowed { .. } => "E1001",
            Self::InvalidSignature { .. } => "E1002",
            Self::MalformedPayload { .. } => "E1003",
            Self::MissingIdentifier => "E1004",
            Self::Persistence(_) => "E2001",
        }
    }

    /// Returns whether the gateway should deliver the event again later.
    ///
    /// Request errors are final: redelivering the same bytes produces the
    /// same outcome. Persistence failures are worth another delivery.
    pub const fn expects_redelivery(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}

impl From<MissingIdentifier> for WebhookError {
    fn from(_: MissingIdentifier) -> Self {
        Self::MissingIdentifier
    }
}
