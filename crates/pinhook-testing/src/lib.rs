//! Test infrastructure for pinhook.
//!
//! Provides in-memory document stores with failure injection, signed payload
//! fixtures and an in-process application harness that drives the router
//! without binding a socket.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod app;
pub mod fixtures;
pub mod stores;

pub use app::{fast_retry_policy, TestApp, TestResponse};
pub use fixtures::{captured_payload, sign, webhook_request, PaymentBuilder, TEST_SECRET};
pub use stores::{FlakyStore, RecordingStore};
