//! In-memory document stores.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard,
    },
    time::Duration,
};

use async_trait::async_trait;
use pinhook_store::{DocumentStore, StoreError};
use serde_json::{Map, Value};

type Document = Map<String, Value>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Document store that keeps everything in memory and counts writes.
///
/// Writes replace the document under the key, matching the semantics of the
/// real store, and every call is appended to a history for assertions.
#[derive(Debug, Default)]
pub struct RecordingStore {
    documents: Mutex<HashMap<String, Document>>,
    history: Mutex<Vec<(String, Document)>>,
    calls: AtomicUsize,
}

impl RecordingStore {
    /// Creates an empty store.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of successful `upsert` calls.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Current document under `key`.
    pub fn document(&self, key: &str) -> Option<Document> {
        lock(&self.documents).get(key).cloned()
    }

    /// Number of distinct keys holding a document.
    pub fn record_count(&self) -> usize {
        lock(&self.documents).len()
    }

    /// Every write in call order.
    pub fn history(&self) -> Vec<(String, Document)> {
        lock(&self.history).clone()
    }
}

#[async_trait]
impl DocumentStore for RecordingStore {
    async fn upsert(&self, key: &str, fields: &Document) -> pinhook_store::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.documents).insert(key.to_string(), fields.clone());
        lock(&self.history).push((key.to_string(), fields.clone()));
        Ok(())
    }
}

/// Store that fails according to a script before delegating.
///
/// Scripted errors are returned one per call in order. Once the script is
/// empty, calls either keep failing with the fallback error or go through to
/// the inner [`RecordingStore`].
#[derive(Debug)]
pub struct FlakyStore {
    inner: Arc<RecordingStore>,
    script: Mutex<VecDeque<StoreError>>,
    fallback: Option<StoreError>,
    latency: Option<Duration>,
    attempts: AtomicUsize,
}

impl FlakyStore {
    /// Fails with each of `failures` in turn, then succeeds.
    pub fn new(inner: Arc<RecordingStore>, failures: impl IntoIterator<Item = StoreError>) -> Self {
        Self {
            inner,
            script: Mutex::new(failures.into_iter().collect()),
            fallback: None,
            latency: None,
            attempts: AtomicUsize::new(0),
        }
    }

    /// Fails every call with `error`.
    pub fn always(inner: Arc<RecordingStore>, error: StoreError) -> Self {
        Self { fallback: Some(error), ..Self::new(inner, []) }
    }

    /// Sleeps for `latency` before answering each call.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of `upsert` calls, failed or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn upsert(&self, key: &str, fields: &Document) -> pinhook_store::Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let scripted = lock(&self.script).pop_front();
        if let Some(error) = scripted.or_else(|| self.fallback.clone()) {
            return Err(error);
        }

        self.inner.upsert(key, fields).await
    }
}
