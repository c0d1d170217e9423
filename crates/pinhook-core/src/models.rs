//! Core domain models and strongly-typed identifiers.
//!
//! Defines the payment identifier supplied by the paying client, the status
//! record persisted for it, and a redacting wrapper for configured secrets.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Client-supplied key that a captured payment is recorded under.
///
/// The gateway echoes whatever the paying client attached to the payment, so
/// the value is opaque. The only guarantee is that it is not empty; no
/// format checks are applied.
///
/// # Example
///
/// ```
/// use pinhook_core::models::PaymentIdentifier;
///
/// let pin = PaymentIdentifier::new("ABC123").unwrap();
/// assert_eq!(pin.as_str(), "ABC123");
/// assert!(PaymentIdentifier::new("").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentIdentifier(String);

impl PaymentIdentifier {
    /// Wraps a raw value, returning `None` when it is empty.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaymentIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PaymentIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Status written for an identifier.
///
/// `Paid` is the only state this service ever writes, which is what keeps a
/// recorded payment from being moved to any other status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Payment captured by the gateway.
    Paid,
}

impl PaymentStatus {
    /// Returns the stored string form.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Paid => "paid",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of a captured payment as written to the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    /// Key the record is stored under.
    pub identifier: PaymentIdentifier,
    /// Recorded status.
    pub status: PaymentStatus,
    /// When this service observed the capture.
    pub observed_at: DateTime<Utc>,
}

impl StatusRecord {
    /// Creates a paid record for `identifier`.
    pub fn paid(identifier: PaymentIdentifier, observed_at: DateTime<Utc>) -> Self {
        Self { identifier, status: PaymentStatus::Paid, observed_at }
    }

    /// Builds the document body written to the store.
    ///
    /// The body depends only on the status, never on `observed_at`, so every
    /// redelivery of the same capture writes byte-identical content. The
    /// `paid` flag keeps the document readable by clients that look for the
    /// boolean form.
    pub fn document(&self) -> Map<String, Value> {
        let mut document = Map::new();
        document.insert("status".to_string(), Value::from(self.status.as_str()));
        document.insert("paid".to_string(), Value::Bool(matches!(self.status, PaymentStatus::Paid)));
        document
    }
}

/// Secret value that never prints its contents.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    /// Wraps a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the underlying secret.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns whether the secret is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString(***)")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self(value)
    }
}
