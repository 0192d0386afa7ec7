//! # condo-api: Binary Entry Point
//!
//! Starts the Axum HTTP server on `0.0.0.0:$PORT` (default 8000).
//! Without spreadsheet credentials the server still starts; data routes
//! answer 503 until it is configured.

use std::net::SocketAddr;
use std::sync::Arc;

use condo_api::state::{AppConfig, AppState};
use condo_api::store::{SheetStore, SheetsStore};
use condo_sheets::{SheetsClient, SheetsConfig};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Invalid configuration: {e}");
        e
    })?;
    tracing::debug!(?config, "configuration loaded");

    // Spreadsheet backend (optional: absent means data routes return 503).
    let store: Option<Arc<dyn SheetStore>> = match SheetsConfig::from_env() {
        Ok(sheets_config) => {
            let client = SheetsClient::new(sheets_config).map_err(|e| {
                tracing::error!("Failed to create Google Sheets client: {e}");
                e
            })?;
            tracing::info!(
                spreadsheet = client.spreadsheet_id(),
                "Google Sheets client configured"
            );
            Some(Arc::new(SheetsStore::new(client)))
        }
        Err(e) => {
            tracing::warn!("Spreadsheet backend not configured: {e}. Data routes will return 503.");
            None
        }
    };

    // Compute the dummy password hash before the first login needs it.
    tokio::task::spawn_blocking(condo_api::auth::prime_dummy_hash);

    let port = config.port;
    let app = condo_api::app(AppState::new(config, store));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Condominium API listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    Ok(())
}
