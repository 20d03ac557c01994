//! HTTP server
//!
//! Axum router exposing the simulate-swap endpoints, request tracing via
//! tower-http, graceful shutdown on Ctrl-C.
//!
//! Created: 2026-01-30

pub mod error;
pub mod routes;

use anyhow::{Context, Result};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::service::SimulationService;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SimulationService>,
}

impl AppState {
    pub fn new(service: SimulationService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

/// Router with all routes and middleware
pub fn build_app(state: AppState) -> Router {
    routes::create_router(state).layer(TraceLayer::new_for_http())
}

/// Serve until Ctrl-C
pub async fn serve(bind: SocketAddr, service: SimulationService) -> Result<()> {
    let app = build_app(AppState::new(service));

    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind to {}", bind))?;
    info!("Swap simulator listening on http://{}", bind);

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal, stopping server...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("Server error")?;

    info!("Server stopped gracefully");
    Ok(())
}
