//! Document store client for recording payment status.
//!
//! `DocumentStore` is the boundary the relay writes through. `FirebaseStore`
//! implements it against the Firebase Realtime Database REST API, where a
//! `PUT` to `/{collection}/{key}.json` replaces the document at that path.
//! A replace is naturally idempotent, which is what the relay relies on.

use std::time::Duration;

use async_trait::async_trait;
use pinhook_core::SecretString;
use reqwest::{header::HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info_span, warn, Instrument};
use url::Url;

use crate::error::{Result, StoreError};

/// Key/value document store the relay writes status records to.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Replaces the document stored under `key` with `fields`.
    ///
    /// Must be an unconditional write: calling it again with the same
    /// arguments leaves the store unchanged.
    async fn upsert(&self, key: &str, fields: &Map<String, Value>) -> Result<()>;
}

/// Configuration for the Firebase REST client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database root, e.g. `https://my-app-default-rtdb.firebaseio.com`.
    pub base_url: String,
    /// Path under the root that records are written into.
    pub collection: String,
    /// Database secret or ID token passed as the `auth` query parameter.
    pub auth_token: Option<SecretString>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9000".to_string(),
            collection: "payments".to_string(),
            auth_token: None,
            timeout: Duration::from_secs(10),
            user_agent: concat!("pinhook/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Firebase Realtime Database client.
#[derive(Debug, Clone)]
pub struct FirebaseStore {
    client: reqwest::Client,
    base_url: Url,
    config: StoreConfig,
}

impl FirebaseStore {
    /// Creates a client for the configured database.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ConfigurationError` if the base URL does not parse
    /// or the HTTP client cannot be built.
    pub fn new(config: StoreConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| StoreError::configuration(format!("invalid store url: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::configuration("store url cannot hold a path"));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| StoreError::configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, base_url, config })
    }

    /// Builds the document URL for `key`.
    ///
    /// The key is appended as a single percent-encoded path segment, so
    /// characters like `/`, `?` or `#` in a caller-supplied identifier cannot
    /// reach another path or alter the query.
    pub fn document_url(&self, key: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| StoreError::configuration("store url cannot hold a path"))?;
            segments.pop_if_empty();
            for part in self.config.collection.split('/').filter(|part| !part.is_empty()) {
                segments.push(part);
            }
            segments.push(&format!("{key}.json"));
        }

        if let Some(token) = &self.config.auth_token {
            url.query_pairs_mut().append_pair("auth", token.expose());
        }

        Ok(url)
    }
}

#[async_trait]
impl DocumentStore for FirebaseStore {
    async fn upsert(&self, key: &str, fields: &Map<String, Value>) -> Result<()> {
        let url = self.document_url(key)?;
        let span = info_span!("store_upsert", path = %url.path());

        async move {
            let start_time = std::time::Instant::now();
            debug!("Writing document");

            let response = match self.client.put(url).json(fields).send().await {
                Ok(response) => response,
                Err(e) => {
                    let duration = start_time.elapsed();
                    // reqwest errors carry the URL, and with it the auth token
                    let e = e.without_url();
                    warn!(duration_ms = duration.as_millis(), error = %e, "Store request failed");

                    if e.is_timeout() {
                        let timeout_ms =
                            u64::try_from(self.config.timeout.as_millis()).unwrap_or(u64::MAX);
                        return Err(StoreError::timeout(timeout_ms));
                    }
                    return Err(StoreError::network(e.to_string()));
                },
            };

            let status = response.status();
            debug!(
                status = status.as_u16(),
                duration_ms = start_time.elapsed().as_millis(),
                "Received store response"
            );

            if status.is_success() {
                return Ok(());
            }

            let retry_after = extract_retry_after_seconds(response.headers());
            let body = read_body(response).await;
            warn!(status = status.as_u16(), body = %body, "Store rejected write");

            Err(classify_status(status, retry_after, body))
        }
        .instrument(span)
        .await
    }
}

/// Maps a non-success status to a store error.
fn classify_status(status: StatusCode, retry_after: Option<u64>, body: String) -> StoreError {
    const DEFAULT_RETRY_AFTER: u64 = 1;

    match status.as_u16() {
        429 => StoreError::rate_limited(retry_after.unwrap_or(DEFAULT_RETRY_AFTER)),
        code @ 500..=599 => StoreError::server_error(code, body),
        code => StoreError::client_error(code, body),
    }
}

/// Reads at most 1KB of an error response body.
async fn read_body(response: reqwest::Response) -> String {
    const MAX_ERROR_BODY: usize = 1024;

    match response.bytes().await {
        Ok(bytes) if bytes.len() > MAX_ERROR_BODY => {
            format!("{}... (truncated)", String::from_utf8_lossy(&bytes[..MAX_ERROR_BODY]))
        },
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => format!("[failed to read response body: {}]", e.without_url()),
    }
}

/// Extracts a Retry-After value given in seconds.
fn extract_retry_after_seconds(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}
