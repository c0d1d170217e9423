//! Persistence of payment status into an external document store.
//!
//! This crate owns the write side of the pipeline: a [`DocumentStore`]
//! boundary with a Firebase Realtime Database implementation, retry policies
//! with capped exponential backoff, and the [`PersistenceRelay`] that ties
//! them together.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use pinhook_core::PaymentIdentifier;
//! use pinhook_store::{FirebaseStore, PersistenceRelay, RetryPolicy, StoreConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = FirebaseStore::new(StoreConfig::default())?;
//! let relay = PersistenceRelay::new(Arc::new(store), RetryPolicy::default());
//!
//! let pin = PaymentIdentifier::new("ABC123").expect("non-empty");
//! relay.mark_paid(&pin).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod error;
pub mod relay;
pub mod retry;

pub use client::{DocumentStore, FirebaseStore, StoreConfig};
pub use error::{Result, StoreError, StoreErrorKind};
pub use relay::PersistenceRelay;
pub use retry::{BackoffStrategy, RetryPolicy};
