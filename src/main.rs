//! Pinhook payment webhook service.
//!
//! Main entry point for the pinhook server. Loads configuration, wires the
//! store client and serves webhooks until shutdown.

use anyhow::{Context, Result};
use pinhook_api::{AppState, Config};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    // Initialize tracing with structured logging
    init_tracing(&config.rust_log)?;

    info!("Starting pinhook payment webhook service");

    let addr = config.parse_server_addr()?;
    info!(
        store_url = %config.store_url_masked(),
        collection = %config.store_collection,
        signature_header = %config.signature_header,
        max_retry_attempts = config.max_retry_attempts,
        server_addr = %addr,
        "Configuration loaded"
    );

    let state = AppState::from_config(&config)?;

    info!(addr = %addr, "pinhook is ready to receive webhooks");

    pinhook_api::start_server(state, addr).await.context("HTTP server failed")?;

    info!("pinhook shutdown complete");
    Ok(())
}

/// Initializes tracing with environment-based configuration.
///
/// `RUST_LOG` wins when set; otherwise the configured level is used.
fn init_tracing(default_level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("{default_level},pinhook=debug,tower_http=debug")))
        .context("Invalid log filter")?;

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).try_init()?;
    Ok(())
}
