//! Idempotent, retrying status writes.
//!
//! The gateway delivers each capture at least once, possibly several times and
//! concurrently. The relay never reads before writing: every call writes the
//! same terminal document under the identifier, so any number of deliveries
//! converge on a single record without locking.

use std::sync::Arc;

use chrono::Utc;
use pinhook_core::{PaymentIdentifier, PersistenceError, StatusRecord};
use tokio::time::{timeout, Instant};
use tracing::{info, instrument, warn};

use crate::{
    client::DocumentStore,
    error::StoreError,
    retry::{RetryContext, RetryDecision, RetryPolicy},
};

/// Writes paid status records through a [`DocumentStore`].
#[derive(Clone)]
pub struct PersistenceRelay {
    store: Arc<dyn DocumentStore>,
    policy: RetryPolicy,
}

impl std::fmt::Debug for PersistenceRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceRelay").field("policy", &self.policy).finish_non_exhaustive()
    }
}

impl PersistenceRelay {
    /// Creates a relay writing to `store` with the given retry policy.
    pub fn new(store: Arc<dyn DocumentStore>, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    /// Returns the retry policy in use.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Records `identifier` as paid.
    ///
    /// Transient store failures are retried with backoff until the policy's
    /// attempt or time budget runs out. Each attempt is also cut off at the
    /// remaining time budget, so a hanging store cannot hold the request
    /// past `max_elapsed`.
    ///
    /// # Errors
    ///
    /// - `PersistenceError::Permanent` on the first non-retryable failure
    /// - `PersistenceError::Transient` once the retry budget is exhausted
    #[instrument(name = "mark_paid", skip(self), fields(identifier = %identifier))]
    pub async fn mark_paid(
        &self,
        identifier: &PaymentIdentifier,
    ) -> Result<StatusRecord, PersistenceError> {
        let document = StatusRecord::paid(identifier.clone(), Utc::now()).document();
        let started = Instant::now();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let remaining = self.policy.max_elapsed.saturating_sub(started.elapsed());
            let result =
                match timeout(remaining, self.store.upsert(identifier.as_str(), &document)).await {
                    Ok(result) => result,
                    Err(_) => Err(StoreError::timeout(
                        u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX),
                    )),
                };

            let error = match result {
                Ok(()) => {
                    info!(attempts = attempt, "Payment recorded as paid");
                    return Ok(StatusRecord::paid(identifier.clone(), Utc::now()));
                },
                Err(error) => error,
            };

            let context = RetryContext::new(attempt, started.elapsed(), self.policy.clone());
            match context.decide_retry(&error) {
                RetryDecision::Retry { delay } => {
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "Store write failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                },
                RetryDecision::GiveUp { reason } => {
                    warn!(
                        attempts = attempt,
                        error = %error,
                        reason = %reason,
                        "Giving up on store write"
                    );
                    let message = format!("{error} ({reason})");
                    return Err(if error.is_retryable() {
                        PersistenceError::transient(attempt, message)
                    } else {
                        PersistenceError::permanent(attempt, message)
                    });
                },
            }
        }
    }
}
