//! Shared application state for request handlers.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use http::{HeaderName, StatusCode};
use pinhook_core::SecretString;
use pinhook_store::{DocumentStore, FirebaseStore, PersistenceRelay};

use crate::config::Config;

/// Request-facing settings, resolved from [`Config`] once at startup.
#[derive(Debug, Clone)]
pub struct WebhookSettings {
    /// Shared secret for signature verification.
    pub secret: SecretString,
    /// Header the hex signature is read from.
    pub signature_header: HeaderName,
    /// Status returned for rejected signatures.
    pub auth_failure_status: StatusCode,
    /// Largest accepted body.
    pub max_body_bytes: usize,
    /// Whole-request timeout.
    pub request_timeout: Duration,
}

impl WebhookSettings {
    /// Settings with the default header, status and limits for `secret`.
    pub fn new(secret: SecretString) -> Self {
        Self {
            secret,
            signature_header: HeaderName::from_static("x-razorpay-signature"),
            auth_failure_status: StatusCode::UNAUTHORIZED,
            max_body_bytes: 1024 * 1024,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// State shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Request-facing settings.
    pub settings: WebhookSettings,
    /// Writes paid records to the document store.
    pub relay: PersistenceRelay,
}

impl AppState {
    /// Creates state from already-built parts.
    pub fn new(settings: WebhookSettings, relay: PersistenceRelay) -> Self {
        Self { settings, relay }
    }

    /// Builds state from configuration, wiring a Firebase store client.
    ///
    /// # Errors
    ///
    /// Fails if the settings or the store client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        let settings = config.to_webhook_settings()?;
        let store: Arc<dyn DocumentStore> = Arc::new(
            FirebaseStore::new(config.to_store_config()).context("Failed to create store client")?,
        );
        let relay = PersistenceRelay::new(store, config.to_retry_policy());

        Ok(Self::new(settings, relay))
    }
}
