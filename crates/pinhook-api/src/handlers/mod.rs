//! HTTP request handlers for the pinhook API.
//!
//! Handlers are grouped by functionality:
//! - `webhook` - Payment webhook verification and recording
//! - `health` - Liveness probes
//!
//! # Error Handling
//!
//! Rejections return a standardized body with an error code from the
//! taxonomy (E1001-E2001) and a human-readable message.

pub mod health;
pub mod webhook;

pub use health::{health_check, liveness_check};
pub use webhook::{
    process_webhook, receive_webhook, require_post, InboundWebhookRequest, WebhookOutcome,
};
