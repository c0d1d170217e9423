//! Gateway event envelope parsing and identifier extraction.
//!
//! Only runs on bodies whose signature has already been accepted. The raw
//! bytes are parsed here for the first time; nothing upstream of signature
//! verification looks inside them.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{error::MissingIdentifier, models::PaymentIdentifier};

/// Event type emitted when the gateway captures a payment.
pub const PAYMENT_CAPTURED: &str = "payment.captured";

/// Name of the payment note carrying the identifier.
pub const PIN_NOTE: &str = "pin";

/// Outer envelope shared by every gateway event.
#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    payload: Value,
}

/// `payload` of a captured payment event.
#[derive(Debug, Deserialize)]
struct CapturedPayload {
    payment: PaymentWrapper,
}

#[derive(Debug, Deserialize)]
struct PaymentWrapper {
    entity: Map<String, Value>,
}

/// Payment entity of a captured payment.
///
/// Fields other than `notes` are informational and read leniently: a value of
/// an unexpected type is treated as absent instead of failing the event.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentEntity {
    /// Gateway payment id (`pay_...`).
    pub id: Option<String>,
    /// Order the payment belongs to.
    pub order_id: Option<String>,
    /// Amount in the currency's smallest unit.
    pub amount: Option<u64>,
    /// ISO currency code.
    pub currency: Option<String>,
    /// Free-form notes attached by the paying client.
    pub notes: Option<Value>,
}

impl PaymentEntity {
    fn from_map(mut entity: Map<String, Value>) -> Self {
        let text = |value: Option<&Value>| value.and_then(Value::as_str).map(str::to_owned);

        Self {
            id: text(entity.get("id")),
            order_id: text(entity.get("order_id")),
            amount: entity.get("amount").and_then(Value::as_u64),
            currency: text(entity.get("currency")),
            notes: entity.remove("notes"),
        }
    }
}

/// A payment event the service acts on.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentEvent {
    /// Event type from the envelope.
    pub event_type: String,
    /// The captured payment.
    pub entity: PaymentEntity,
}

impl PaymentEvent {
    /// Returns the identifier carried in the payment notes, if any.
    pub fn identifier(&self) -> Option<PaymentIdentifier> {
        extract_identifier(&self.entity).ok()
    }
}

/// Outcome of classifying an authenticated body.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// A captured payment to record.
    Relevant(PaymentEvent),
    /// A well-formed event of a type this service does not handle.
    Ignored {
        /// The event type that was skipped
        event_type: String,
    },
    /// The body is not a valid envelope, or a captured payment lacks its
    /// `payment.entity` object.
    Malformed {
        /// Parser diagnostic
        reason: String,
    },
}

/// Parses an authenticated body and decides whether it is a captured payment.
///
/// # Example
///
/// ```
/// use pinhook_core::events::{classify, Classification};
///
/// let body = br#"{"event":"refund.created","payload":{}}"#;
/// assert!(matches!(classify(body), Classification::Ignored { .. }));
/// ```
pub fn classify(body: &[u8]) -> Classification {
    let envelope: Envelope = match serde_json::from_slice(body) {
        Ok(envelope) => envelope,
        Err(e) => return Classification::Malformed { reason: e.to_string() },
    };

    if envelope.event != PAYMENT_CAPTURED {
        return Classification::Ignored { event_type: envelope.event };
    }

    match serde_json::from_value::<CapturedPayload>(envelope.payload) {
        Ok(payload) => Classification::Relevant(PaymentEvent {
            event_type: envelope.event,
            entity: PaymentEntity::from_map(payload.payment.entity),
        }),
        Err(e) => Classification::Malformed { reason: format!("payload.payment.entity: {e}") },
    }
}

/// Reads `notes.pin` from a payment entity.
///
/// The gateway sends empty notes as `[]` rather than `{}`, so anything other
/// than an object holding a non-empty string pin counts as missing.
pub fn extract_identifier(entity: &PaymentEntity) -> Result<PaymentIdentifier, MissingIdentifier> {
    match &entity.notes {
        Some(Value::Object(notes)) => notes
            .get(PIN_NOTE)
            .and_then(Value::as_str)
            .and_then(PaymentIdentifier::new)
            .ok_or(MissingIdentifier),
        _ => Err(MissingIdentifier),
    }
}
