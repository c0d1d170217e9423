//! Payment webhook handler.
//!
//! Each delivery runs the same pipeline: method check, signature check over
//! the raw body, classification, identifier extraction and the status write.
//! The body is never parsed before its signature has been verified.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use pinhook_core::{
    classify, extract_identifier, Classification, PaymentEntity, StatusRecord, WebhookError,
};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    crypto::{verify_signature, SignatureCheck},
    state::{AppState, WebhookSettings},
};

const EVENT_ID_HEADER: &str = "x-razorpay-event-id";

/// A webhook delivery as received, before any interpretation.
#[derive(Debug, Clone)]
pub struct InboundWebhookRequest {
    /// Request method.
    pub method: Method,
    /// Request headers.
    pub headers: HeaderMap,
    /// Body bytes exactly as they arrived on the wire.
    pub raw_body: Bytes,
}

impl InboundWebhookRequest {
    /// Returns the value of `name` if present and valid UTF-8.
    pub fn header(&self, name: &HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

/// Successful end state of a delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookOutcome {
    /// A captured payment was recorded as paid.
    Processed {
        /// The record that was written.
        record: StatusRecord,
        /// Gateway payment details, for the response and logs.
        entity: PaymentEntity,
    },
    /// A verified event of a type this service does not act on.
    Ignored {
        /// The skipped event type.
        event_type: String,
    },
}

/// Success response body.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// `processed` or `ignored`
    pub status: &'static str,
    /// Event type from the envelope
    pub event: String,
    /// Identifier the record was written under
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// Gateway payment id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    /// When the capture was recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<DateTime<Utc>>,
}

/// Error response with code and message.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error details including code and message
    pub error: ErrorDetail,
}

/// Detailed error information.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Error code from the taxonomy (E1001-E2001)
    pub code: String,
    /// Human-readable error description
    pub message: String,
}

/// Runs one delivery through the pipeline.
///
/// # Errors
///
/// - `MethodNotAllowed` for anything but POST, before the signature is read
/// - `InvalidSignature` if the header does not authenticate the raw body
/// - `MalformedPayload` if the authenticated body is not a valid envelope
/// - `MissingIdentifier` if a captured payment carries no pin
/// - `Persistence` if the status write failed permanently or ran out of retries
pub async fn process_webhook(
    state: &AppState,
    request: &InboundWebhookRequest,
) -> Result<WebhookOutcome, WebhookError> {
    if request.method != Method::POST {
        return Err(WebhookError::method_not_allowed(request.method.as_str()));
    }

    let settings = &state.settings;
    let provided = request.header(&settings.signature_header);
    if let SignatureCheck::Rejected(reason) =
        verify_signature(&request.raw_body, provided, &settings.secret)
    {
        return Err(WebhookError::invalid_signature(reason.to_string()));
    }

    let event = match classify(&request.raw_body) {
        Classification::Relevant(event) => event,
        Classification::Ignored { event_type } => {
            return Ok(WebhookOutcome::Ignored { event_type });
        },
        Classification::Malformed { reason } => return Err(WebhookError::malformed(reason)),
    };

    let identifier = extract_identifier(&event.entity)?;
    debug!(
        identifier = %identifier,
        payment_id = event.entity.id.as_deref().unwrap_or("unknown"),
        "Captured payment carries identifier"
    );

    let record = state.relay.mark_paid(&identifier).await?;

    Ok(WebhookOutcome::Processed { record, entity: event.entity })
}

/// Receives a gateway webhook.
///
/// Accepts every method so that non-POST requests get a structured 405
/// instead of the router's empty one.
///
/// # Errors
///
/// Returns appropriate HTTP status codes:
/// - 405: Method other than POST
/// - 401 (or the configured status): Signature missing or wrong
/// - 400: Malformed body or missing pin
/// - 500: Status write failed
#[instrument(
    name = "receive_webhook",
    skip(state, headers, body),
    fields(
        method = %method,
        event_id = headers.get(EVENT_ID_HEADER).and_then(|v| v.to_str().ok()).unwrap_or("none"),
        content_length = body.len(),
    )
)]
pub async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = InboundWebhookRequest { method, headers, raw_body: body };

    match process_webhook(&state, &request).await {
        Ok(WebhookOutcome::Processed { record, entity }) => {
            info!(
                identifier = %record.identifier,
                payment_id = entity.id.as_deref().unwrap_or("unknown"),
                order_id = entity.order_id.as_deref().unwrap_or("none"),
                amount = entity.amount,
                currency = entity.currency.as_deref().unwrap_or("unknown"),
                "Payment recorded"
            );
            let response = WebhookResponse {
                status: "processed",
                event: pinhook_core::PAYMENT_CAPTURED.to_string(),
                identifier: Some(record.identifier.to_string()),
                payment_id: entity.id,
                observed_at: Some(record.observed_at),
            };
            (StatusCode::OK, Json(response)).into_response()
        },
        Ok(WebhookOutcome::Ignored { event_type }) => {
            info!(event_type = %event_type, "Ignoring event");
            let response = WebhookResponse {
                status: "ignored",
                event: event_type,
                identifier: None,
                payment_id: None,
                observed_at: None,
            };
            (StatusCode::OK, Json(response)).into_response()
        },
        Err(e) => {
            match &e {
                WebhookError::Persistence(_) => error!(error = %e, "Failed to record payment"),
                _ => warn!(error = %e, code = e.code(), "Rejecting webhook"),
            }
            create_error_response(status_for(&e, &state.settings), &e)
        },
    }
}

/// Middleware answering 405 for anything but POST before the body is read.
///
/// Runs outside the body limit, so a large body on the wrong method is still
/// reported as a method error.
pub async fn require_post(req: Request, next: Next) -> Response {
    if req.method() == Method::POST {
        return next.run(req).await;
    }

    let error = WebhookError::method_not_allowed(req.method().as_str());
    warn!(error = %error, code = error.code(), "Rejecting webhook");
    create_error_response(StatusCode::METHOD_NOT_ALLOWED, &error)
}

/// Maps a pipeline error to its response status.
pub fn status_for(error: &WebhookError, settings: &WebhookSettings) -> StatusCode {
    match error {
        WebhookError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
        WebhookError::InvalidSignature { .. } => settings.auth_failure_status,
        WebhookError::MalformedPayload { .. } | WebhookError::MissingIdentifier => {
            StatusCode::BAD_REQUEST
        },
        WebhookError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Creates a standardized error response.
fn create_error_response(status: StatusCode, error: &WebhookError) -> Response {
    let error_response = ErrorResponse {
        error: ErrorDetail { code: error.code().to_string(), message: error.to_string() },
    };

    let mut response = (status, Json(error_response)).into_response();
    if status == StatusCode::METHOD_NOT_ALLOWED {
        response.headers_mut().insert(header::ALLOW, HeaderValue::from_static("POST"));
    }
    response
}

#[cfg(test)]
mod tests {
    use pinhook_core::{PersistenceError, SecretString};

    use super::*;

    fn settings() -> WebhookSettings {
        WebhookSettings::new(SecretString::new("s3cr3t"))
    }

    #[test]
    fn error_statuses() {
        let settings = settings();

        assert_eq!(
            status_for(&WebhookError::method_not_allowed("GET"), &settings),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            status_for(&WebhookError::invalid_signature("mismatch"), &settings),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(status_for(&WebhookError::malformed("eof"), &settings), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&WebhookError::MissingIdentifier, &settings), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(&PersistenceError::transient(4, "503").into(), &settings),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn auth_failure_status_is_configurable() {
        let settings = WebhookSettings { auth_failure_status: StatusCode::BAD_REQUEST, ..settings() };

        assert_eq!(
            status_for(&WebhookError::invalid_signature("mismatch"), &settings),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn method_error_response_advertises_post() {
        let response = create_error_response(
            StatusCode::METHOD_NOT_ALLOWED,
            &WebhookError::method_not_allowed("GET"),
        );

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(header::ALLOW).unwrap(), "POST");
    }

    #[test]
    fn request_header_lookup() {
        let mut headers = HeaderMap::new();
        headers.insert("x-razorpay-signature", "abc".parse().unwrap());
        let request =
            InboundWebhookRequest { method: Method::POST, headers, raw_body: Bytes::new() };

        assert_eq!(request.header(&HeaderName::from_static("x-razorpay-signature")), Some("abc"));
        assert_eq!(request.header(&HeaderName::from_static("x-other")), None);
    }
}
