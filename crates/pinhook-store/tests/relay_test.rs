//! Integration tests for the persistence relay.
//!
//! Covers retry classification, attempt and time budgets, and convergence of
//! repeated writes for the same identifier.

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use pinhook_core::{PaymentIdentifier, PaymentStatus, PersistenceError};
use pinhook_store::{
    BackoffStrategy, FirebaseStore, PersistenceRelay, RetryPolicy, StoreConfig, StoreError,
};
use pinhook_testing::{fast_retry_policy, FlakyStore, RecordingStore};
use serde_json::json;
use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

fn pin(value: &str) -> PaymentIdentifier {
    PaymentIdentifier::new(value).unwrap()
}

#[tokio::test]
async fn write_succeeds_first_time() -> Result<()> {
    let store = RecordingStore::new();
    let relay = PersistenceRelay::new(store.clone(), fast_retry_policy());

    let record = relay.mark_paid(&pin("ABC123")).await?;

    assert_eq!(record.identifier.as_str(), "ABC123");
    assert_eq!(record.status, PaymentStatus::Paid);
    assert_eq!(store.call_count(), 1);
    assert_eq!(
        serde_json::Value::Object(store.document("ABC123").unwrap()),
        json!({ "status": "paid", "paid": true })
    );
    Ok(())
}

#[tokio::test]
async fn transient_failures_then_success_yield_one_record() -> Result<()> {
    let inner = RecordingStore::new();
    let store = Arc::new(FlakyStore::new(inner.clone(), [
        StoreError::timeout(100),
        StoreError::server_error(502, "bad gateway"),
    ]));
    let relay = PersistenceRelay::new(store.clone(), fast_retry_policy());

    relay.mark_paid(&pin("ABC123")).await?;

    assert_eq!(store.attempts(), 3);
    assert_eq!(inner.call_count(), 1);
    assert_eq!(inner.record_count(), 1);
    Ok(())
}

#[tokio::test]
async fn permanent_failure_is_not_retried() {
    let inner = RecordingStore::new();
    let store = Arc::new(FlakyStore::always(inner.clone(), StoreError::client_error(403, "")));
    let relay = PersistenceRelay::new(store.clone(), fast_retry_policy());

    let error = relay.mark_paid(&pin("ABC123")).await.unwrap_err();

    assert!(matches!(error, PersistenceError::Permanent { attempts: 1, .. }));
    assert!(!error.is_transient());
    assert_eq!(store.attempts(), 1);
    assert_eq!(inner.record_count(), 0);
}

#[tokio::test]
async fn retries_stop_at_max_attempts() {
    let inner = RecordingStore::new();
    let store = Arc::new(FlakyStore::always(inner.clone(), StoreError::rate_limited(0)));
    let policy = RetryPolicy { max_attempts: 3, ..fast_retry_policy() };
    let relay = PersistenceRelay::new(store.clone(), policy);

    let error = relay.mark_paid(&pin("ABC123")).await.unwrap_err();

    assert!(error.is_transient());
    assert_eq!(error.attempts(), 3);
    assert_eq!(store.attempts(), 3);
    assert_eq!(inner.record_count(), 0);
}

#[tokio::test]
async fn no_retry_policy_makes_one_attempt() {
    let inner = RecordingStore::new();
    let store = Arc::new(FlakyStore::always(inner, StoreError::network("reset")));
    let relay = PersistenceRelay::new(store.clone(), RetryPolicy::no_retry());

    assert!(relay.mark_paid(&pin("ABC123")).await.is_err());
    assert_eq!(store.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn hanging_store_is_bounded_by_elapsed_budget() {
    let inner = RecordingStore::new();
    let store = Arc::new(FlakyStore::new(inner.clone(), []).with_latency(Duration::from_secs(60)));
    let policy = RetryPolicy {
        max_attempts: 10,
        base_delay: Duration::from_millis(100),
        max_delay: Duration::from_millis(100),
        max_elapsed: Duration::from_secs(1),
        jitter_factor: 0.0,
        backoff_strategy: BackoffStrategy::Fixed,
    };
    let relay = PersistenceRelay::new(store.clone(), policy);

    let started = tokio::time::Instant::now();
    let error = relay.mark_paid(&pin("ABC123")).await.unwrap_err();

    assert!(error.is_transient());
    assert_eq!(store.attempts(), 1);
    assert!(started.elapsed() <= Duration::from_millis(1100));
    assert_eq!(inner.record_count(), 0);
}

#[tokio::test]
async fn repeated_writes_converge() -> Result<()> {
    let store = RecordingStore::new();
    let relay = PersistenceRelay::new(store.clone(), fast_retry_policy());

    for _ in 0..5 {
        relay.mark_paid(&pin("ABC123")).await?;
    }

    assert_eq!(store.record_count(), 1);
    let writes = store.history();
    assert_eq!(writes.len(), 5);
    assert!(writes.iter().all(|write| write == &writes[0]));
    Ok(())
}

#[tokio::test]
async fn distinct_identifiers_get_distinct_records() -> Result<()> {
    let store = RecordingStore::new();
    let relay = PersistenceRelay::new(store.clone(), fast_retry_policy());

    relay.mark_paid(&pin("A")).await?;
    relay.mark_paid(&pin("B")).await?;

    assert_eq!(store.record_count(), 2);
    Ok(())
}

#[tokio::test]
async fn firebase_outage_then_recovery() -> Result<()> {
    let mock_server = MockServer::start().await;

    Mock::given(matchers::method("PUT"))
        .and(matchers::path("/payments/ABC123.json"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(matchers::method("PUT"))
        .and(matchers::path("/payments/ABC123.json"))
        .and(matchers::body_json(json!({ "status": "paid", "paid": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "paid" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = FirebaseStore::new(StoreConfig { base_url: mock_server.uri(), ..StoreConfig::default() })?;
    let relay = PersistenceRelay::new(Arc::new(store), fast_retry_policy());

    relay.mark_paid(&pin("ABC123")).await?;
    Ok(())
}

#[tokio::test]
async fn firebase_permission_denied_is_permanent() -> Result<()> {
    let mock_server = MockServer::start().await;

    Mock::given(matchers::method("PUT"))
        .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"error":"Permission denied"}"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = FirebaseStore::new(StoreConfig { base_url: mock_server.uri(), ..StoreConfig::default() })?;
    let relay = PersistenceRelay::new(Arc::new(store), fast_retry_policy());

    let error = relay.mark_paid(&pin("ABC123")).await.unwrap_err();

    assert!(matches!(error, PersistenceError::Permanent { attempts: 1, .. }));
    Ok(())
}
