//! SPI merchant HTTP server.
//!
//! Serves the transaction request endpoint wallets call after scanning a
//! checkout QR code, and forwards transaction construction to the settlement
//! SDK service.
//!
//! # Usage
//!
//! ```bash
//! # Run with default config (config.toml in current directory)
//! cargo run -p spi-merchant --bin spi-merchant --release
//!
//! # Run with custom config path
//! CONFIG=/path/to/config.toml cargo run -p spi-merchant --bin spi-merchant
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to TOML configuration file (default: `config.toml`)
//! - `HOST` - Override bind address (default: `0.0.0.0`)
//! - `PORT` - Override port (default: `3000`)
//! - `RUST_LOG` - Log level filter (default: `info`)

use std::net::SocketAddr;

use axum::http::Method;
use axum::{Json, Router};
use spi_http::server::{MerchantState, merchant_router};
use tower_http::cors;
use tower_http::trace::TraceLayer;

use spi_merchant::{ServerConfig, init_tracing, shutdown_signal};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    if let Err(e) = run().await {
        tracing::error!("Merchant server failed: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let _ = rustls::crypto::ring::default_provider().install_default();

    let config = ServerConfig::load()?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        public_url = %config.public_url,
        merchant = %config.merchant.label,
        algorithm = config.merchant.algorithm.as_str(),
        network = %config.merchant.network,
        sdk = %config.sdk.url,
        "Loaded configuration"
    );
    if config.sdk.api_key.is_some() && config.sdk.resolved_api_key().is_none() {
        tracing::warn!("sdk.api_key not resolved (missing env var?), sending no credentials");
    }

    let sdk = config.sdk.client(&config.merchant)?;
    let state = MerchantState::new(sdk, config.merchant.clone());

    let app = Router::new()
        .merge(merchant_router(state))
        .route("/health", axum::routing::get(health))
        .layer(TraceLayer::new_for_http())
        .layer(
            cors::CorsLayer::new()
                .allow_origin(cors::Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(cors::Any),
        );

    let addr = SocketAddr::new(config.host, config.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Merchant server listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Merchant server shut down gracefully");
    Ok(())
}

/// Health check endpoint.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
