use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, extract::DefaultBodyLimit, routing::get, routing::post};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::decompression::RequestDecompressionLayer;
use tracing::{error, info};

use super::{
    services::{health, upload},
    state::AppState,
};
use crate::batch::BatchOrchestrator;
use crate::config::Config;
use crate::dispatch::HttpDispatcher;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Routes with body limit and request decompression applied
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.server.max_upload_bytes.as_usize();

    Router::new()
        .route("/upload", post(upload))
        .route("/health", get(health))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(RequestDecompressionLayer::new())
                .layer(DefaultBodyLimit::max(body_limit)),
        )
}

/// Serve the upload API until Ctrl+C or SIGTERM.
///
/// `address` overrides `server.bind_addr` from the configuration.
pub async fn run(address: Option<SocketAddr>) -> Result<(), AnyError> {
    info!("Loading configuration");
    let config = Config::load().map_err(|e| format!("Failed to load config: {}", e))?;

    let dispatcher = HttpDispatcher::new(&config.dispatch)?;
    info!(endpoint = %dispatcher.endpoint(), "Dispatching registrations");

    let orchestrator = BatchOrchestrator::from_config(Arc::new(dispatcher), &config);
    let address = address.unwrap_or(config.server.bind_addr);
    let state = AppState::new(config, orchestrator);
    let shutdown = state.shutdown.clone();

    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "batchreg upload API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown.cancel();
        })
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, cancelling running batches");
}
