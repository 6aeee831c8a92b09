//! # mayday-server
//!
//! HTTP server for the mayday smart jacket tracking system.
//!
//! This binary provides:
//! - REST API for live tracking, hospital routing, SOS, and registries
//! - OpenAPI documentation via Swagger UI at `/docs`
//! - Structured logging to file and stdout
//!
//! ## Running
//!
//! ```bash
//! # Development
//! cargo run --package mayday-server
//!
//! # Production
//! MAYDAY_ENV=production ./mayday-server
//! ```
//!
//! Configuration is read from `MAYDAY_CONFIG` when set, otherwise from the
//! platform config path; a missing file falls back to defaults.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use std::path::PathBuf;

use anyhow::Context;
use mayday_core::MaydayConfig;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use mayday_server::state::AppState;
use mayday_server::{api, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let is_production = std::env::var("MAYDAY_ENV")
        .map(|env| env.eq_ignore_ascii_case("production"))
        .unwrap_or(false);

    logging::init(is_production)?;

    info!(production = is_production, "Starting mayday-server");

    let config_path = match std::env::var("MAYDAY_CONFIG") {
        Ok(path) => PathBuf::from(path),
        Err(_) => MaydayConfig::default_path().context("resolving config path")?,
    };
    let config =
        MaydayConfig::load_or_default(&config_path).context("loading configuration")?;
    config.validate().context("validating configuration")?;
    info!(path = %config_path.display(), "Configuration loaded");

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config)?.into_shared();

    let app = api::create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new());

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;
    info!("Listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("mayday-server stopped");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM so open tracking sessions get dropped
/// cleanly instead of dying mid-write.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
