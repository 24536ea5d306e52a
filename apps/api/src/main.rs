mod api_client;
mod config;
mod diff;
mod document;
mod errors;
mod highlight;
mod keywords;
mod models;
mod reconcile;
mod review;
mod rewrite;
mod routes;
mod state;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::api_client::HttpTrackerApi;
use crate::config::Config;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting review API v{}", env!("CARGO_PKG_VERSION"));

    let api = HttpTrackerApi::new(
        &config.tracker_api_url,
        config.tracker_api_token.clone(),
        Duration::from_secs(config.tracker_timeout_secs),
    )?;
    info!(
        "Tracker client initialized ({}, diff strategy {:?}, polling every {}s up to {} times)",
        config.tracker_api_url,
        config.diff_strategy,
        config.poll_interval_secs,
        config.poll_max_attempts
    );

    let state = AppState::new(Arc::new(api), config.clone());

    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()), // TODO: restrict origins to the tracker UI host
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = until_signal("ctrl_c", tokio::signal::ctrl_c());

    #[cfg(unix)]
    let terminate = until_signal("SIGTERM", async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?
            .recv()
            .await;
        Ok::<(), std::io::Error>(())
    });

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

/// Completes when `signal` fires. A handler that cannot be installed never
/// completes, so the server keeps running without it.
async fn until_signal<E: std::fmt::Display>(
    name: &'static str,
    signal: impl Future<Output = Result<(), E>>,
) {
    if let Err(e) = signal.await {
        warn!(signal = name, error = %e, "Failed to install shutdown handler");
        std::future::pending::<()>().await;
    }
}
