//! Exponential backoff retry strategies with jitter.
//!
//! A store write happens while the gateway's HTTP request is still open, so
//! the policy bounds both the number of attempts and the total time spent.
//! Once either bound is reached the relay gives up and the gateway's own
//! redelivery takes over.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Retry policy for store writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    pub max_attempts: u32,

    /// Base delay for backoff calculation.
    pub base_delay: Duration,

    /// Maximum delay between attempts.
    pub max_delay: Duration,

    /// Upper bound on time spent across all attempts and delays.
    pub max_elapsed: Duration,

    /// Jitter percentage (0.0 to 1.0) to add randomness.
    pub jitter_factor: f64,

    /// Strategy for calculating backoff delays.
    pub backoff_strategy: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
            max_elapsed: Duration::from_secs(8),
            jitter_factor: 0.1,
            backoff_strategy: BackoffStrategy::Exponential,
        }
    }
}

impl RetryPolicy {
    /// Policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self { max_attempts: 1, ..Self::default() }
    }
}

/// Strategy for calculating retry delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackoffStrategy {
    /// Fixed delay between retries.
    Fixed,
    /// Exponential backoff: delay doubles each attempt.
    Exponential,
    /// Linear backoff: delay increases by base amount each attempt.
    Linear,
}

/// State of a write after a failed attempt.
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Attempt that just failed (1-based).
    pub attempt_number: u32,
    /// Time spent since the first attempt started.
    pub elapsed: Duration,
    /// Retry policy to apply.
    pub policy: RetryPolicy,
}

/// Result of a retry decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for `delay`, then try again.
    Retry {
        /// How long to wait before the next attempt
        delay: Duration,
    },
    /// Stop retrying.
    GiveUp {
        /// Why no further attempt will be made
        reason: String,
    },
}

impl RetryContext {
    /// Creates a retry context for a failed attempt.
    pub fn new(attempt_number: u32, elapsed: Duration, policy: RetryPolicy) -> Self {
        Self { attempt_number, elapsed, policy }
    }

    /// Decides whether and when to retry after `error`.
    ///
    /// Gives up for permanent errors, when the attempt budget is used, or when
    /// sleeping for the next delay would cross the elapsed-time cap.
    pub fn decide_retry(&self, error: &StoreError) -> RetryDecision {
        if !error.is_retryable() {
            return RetryDecision::GiveUp { reason: format!("non-retryable error: {error}") };
        }

        if self.attempt_number >= self.policy.max_attempts {
            return RetryDecision::GiveUp {
                reason: format!("maximum attempts ({}) exceeded", self.policy.max_attempts),
            };
        }

        let delay = self.calculate_delay(error);
        if self.elapsed.saturating_add(delay) >= self.policy.max_elapsed {
            return RetryDecision::GiveUp {
                reason: format!(
                    "retry budget of {}ms exhausted",
                    self.policy.max_elapsed.as_millis()
                ),
            };
        }

        RetryDecision::Retry { delay }
    }

    /// Calculates the delay until the next attempt.
    ///
    /// A store-provided Retry-After wins over the backoff strategy but is still
    /// capped at `max_delay`.
    fn calculate_delay(&self, error: &StoreError) -> Duration {
        if let Some(retry_after_seconds) = error.retry_after_seconds() {
            return std::cmp::min(Duration::from_secs(retry_after_seconds), self.policy.max_delay);
        }

        let base_delay = match self.policy.backoff_strategy {
            BackoffStrategy::Fixed => self.policy.base_delay,
            BackoffStrategy::Linear => self.policy.base_delay * self.attempt_number,
            BackoffStrategy::Exponential => {
                let exponent = self.attempt_number.saturating_sub(1).min(20);
                let multiplier = 2_u32.saturating_pow(exponent);
                self.policy.base_delay.saturating_mul(multiplier)
            },
        };

        let capped_delay = std::cmp::min(base_delay, self.policy.max_delay);

        let jittered_delay = apply_jitter(capped_delay, self.policy.jitter_factor);

        std::cmp::min(jittered_delay, self.policy.max_delay)
    }
}

/// Applies jitter to a duration.
///
/// Randomizes the delay by ±jitter_factor percentage so concurrent
/// redeliveries do not retry against the store in lockstep.
fn apply_jitter(duration: Duration, jitter_factor: f64) -> Duration {
    if jitter_factor <= 0.0 {
        return duration;
    }

    let clamped_jitter = jitter_factor.clamp(0.0, 1.0);

    let mut rng = rand::rng();
    let jitter_range = duration.as_secs_f64() * clamped_jitter;
    let jitter_offset = rng.random_range(-jitter_range..=jitter_range);
    let jittered_secs = duration.as_secs_f64() + jitter_offset;

    Duration::from_secs_f64(jittered_secs.max(0.0))
}
