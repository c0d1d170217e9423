//! Core domain models, payload classification and error taxonomy.
//!
//! Provides the types shared by the HTTP surface and the persistence relay:
//! payment identifiers, status records, gateway event classification and the
//! webhook error codes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod models;

pub use error::{MissingIdentifier, PersistenceError, Result, WebhookError};
pub use events::{
    classify, extract_identifier, Classification, PaymentEntity, PaymentEvent, PAYMENT_CAPTURED,
};
pub use models::{PaymentIdentifier, PaymentStatus, SecretString, StatusRecord};
