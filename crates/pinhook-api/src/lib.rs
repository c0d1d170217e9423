//! Pinhook HTTP API.
//!
//! Receives payment gateway webhooks, authenticates them against the shared
//! secret and records captured payments through the persistence relay.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod crypto;
pub mod handlers;
pub mod server;
pub mod state;

pub use config::Config;
pub use server::{create_router, start_server};
pub use state::{AppState, WebhookSettings};
