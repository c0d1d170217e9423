//! Payload fixtures and signing helpers.

use axum::{body::Body, http::Request};
use pinhook_api::crypto::sign_payload;
use pinhook_core::SecretString;
use serde_json::{json, Value};

/// Webhook secret used by the test harness.
pub const TEST_SECRET: &str = "s3cr3t";

/// Header the gateway puts the signature in.
pub const SIGNATURE_HEADER: &str = "x-razorpay-signature";

/// Minimal captured-payment body carrying `pin` in its notes.
///
/// For `ABC123` this is exactly
/// `{"event":"payment.captured","payload":{"payment":{"entity":{"notes":{"pin":"ABC123"}}}}}`.
pub fn captured_payload(pin: &str) -> Vec<u8> {
    PaymentBuilder::captured().pin(pin).build()
}

/// Signs `body` with [`TEST_SECRET`].
pub fn sign(body: &[u8]) -> String {
    sign_with(body, TEST_SECRET)
}

/// Signs `body` with `secret`.
pub fn sign_with(body: &[u8], secret: &str) -> String {
    match sign_payload(body, &SecretString::new(secret)) {
        Ok(signature) => signature,
        Err(e) => panic!("cannot sign test payload: {e}"),
    }
}

/// Builds a request to `/webhook` with an optional signature header.
pub fn webhook_request(method: &str, body: Vec<u8>, signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri("/webhook")
        .header("content-type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header(SIGNATURE_HEADER, signature);
    }

    match builder.body(Body::from(body)) {
        Ok(request) => request,
        Err(e) => panic!("invalid test request: {e}"),
    }
}

/// Builder for gateway event bodies.
#[derive(Debug, Clone)]
pub struct PaymentBuilder {
    event: String,
    entity: Option<serde_json::Map<String, Value>>,
}

impl PaymentBuilder {
    /// A `payment.captured` event with an empty entity.
    pub fn captured() -> Self {
        Self::event("payment.captured")
    }

    /// An event of any type with an empty entity.
    pub fn event(event: impl Into<String>) -> Self {
        Self { event: event.into(), entity: Some(serde_json::Map::new()) }
    }

    /// Drops `payload.payment.entity` entirely.
    #[must_use]
    pub fn without_entity(mut self) -> Self {
        self.entity = None;
        self
    }

    /// Sets `notes.pin`.
    #[must_use]
    pub fn pin(self, pin: &str) -> Self {
        self.notes(json!({ "pin": pin }))
    }

    /// Sets `notes` to an arbitrary value.
    #[must_use]
    pub fn notes(self, notes: Value) -> Self {
        self.field("notes", notes)
    }

    /// Sets the gateway payment id.
    #[must_use]
    pub fn payment_id(self, id: &str) -> Self {
        self.field("id", Value::from(id))
    }

    /// Sets amount and currency.
    #[must_use]
    pub fn amount(self, amount: u64, currency: &str) -> Self {
        self.field("amount", Value::from(amount)).field("currency", Value::from(currency))
    }

    fn field(mut self, name: &str, value: Value) -> Self {
        if let Some(entity) = self.entity.as_mut() {
            entity.insert(name.to_string(), value);
        }
        self
    }

    /// Serializes the event to compact JSON.
    pub fn build(self) -> Vec<u8> {
        let payload = match self.entity {
            Some(entity) => json!({ "payment": { "entity": entity } }),
            None => json!({}),
        };

        json!({ "event": self.event, "payload": payload }).to_string().into_bytes()
    }
}
