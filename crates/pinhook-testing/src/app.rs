//! In-process application harness.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use pinhook_api::{create_router, AppState, WebhookSettings};
use pinhook_core::SecretString;
use pinhook_store::{BackoffStrategy, DocumentStore, PersistenceRelay, RetryPolicy};
use serde_json::Value;
use tower::ServiceExt;

use crate::{fixtures::TEST_SECRET, stores::RecordingStore};

/// Retry policy with short, deterministic delays.
pub fn fast_retry_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 4,
        base_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
        max_elapsed: Duration::from_secs(2),
        jitter_factor: 0.0,
        backoff_strategy: BackoffStrategy::Exponential,
    }
}

/// Collected response from the router.
#[derive(Debug)]
pub struct TestResponse {
    /// Response status
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// JSON body, or `Null` if the body was not JSON
    pub body: Value,
}

/// Router wired to a test store.
pub struct TestApp {
    router: Router,
}

impl TestApp {
    /// App writing into `store` with default settings and [`TEST_SECRET`].
    pub fn with_store(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_settings(WebhookSettings::new(SecretString::new(TEST_SECRET)), store)
    }

    /// App backed by a fresh [`RecordingStore`], returned alongside it.
    pub fn recording() -> (Self, Arc<RecordingStore>) {
        let store = RecordingStore::new();
        (Self::with_store(store.clone()), store)
    }

    /// App with custom settings.
    pub fn with_settings(settings: WebhookSettings, store: Arc<dyn DocumentStore>) -> Self {
        let relay = PersistenceRelay::new(store, fast_retry_policy());
        Self { router: create_router(AppState::new(settings, relay)) }
    }

    /// Sends `request` through the full middleware stack.
    pub async fn send(&self, request: Request<Body>) -> Result<TestResponse> {
        let response =
            self.router.clone().oneshot(request).await.context("router call failed")?;

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .context("failed to read response body")?;
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        Ok(TestResponse { status, headers, body })
    }
}
