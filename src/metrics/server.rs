//! HTTP server for the Prometheus endpoint and manager status.

use crate::metrics::{MetricsRegistry, MetricsSnapshot};
use crate::session::{CameraSessionManager, ManagerStatus};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::CorsLayer;

/// Errors that can occur during metrics server operations.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind to address: {0}")]
    Bind(#[from] std::io::Error),

    #[error("server error: {0}")]
    Server(String),
}

/// Configuration for the metrics server.
#[derive(Debug, Clone)]
pub struct MetricsServerConfig {
    /// Address to bind the server to.
    pub bind_addr: SocketAddr,
}

impl Default for MetricsServerConfig {
    fn default() -> Self {
        Self::with_port(9091)
    }
}

impl MetricsServerConfig {
    /// Creates a config with a custom port.
    pub fn with_port(port: u16) -> Self {
        Self {
            bind_addr: ([0, 0, 0, 0], port).into(),
        }
    }
}

struct ServerState {
    registry: MetricsRegistry,
    manager: Arc<CameraSessionManager>,
}

/// HTTP server exposing metrics and status of one manager.
///
/// Metrics are refreshed from the manager on every scrape.
pub struct MetricsServer {
    config: MetricsServerConfig,
    state: Arc<ServerState>,
}

impl MetricsServer {
    /// Creates a new metrics server.
    pub fn new(
        config: MetricsServerConfig,
        registry: MetricsRegistry,
        manager: Arc<CameraSessionManager>,
    ) -> Self {
        Self {
            config,
            state: Arc::new(ServerState { registry, manager }),
        }
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/metrics", get(metrics_handler))
            .route("/health", get(health_handler))
            .route("/status", get(status_handler))
            .layer(CorsLayer::permissive())
            .with_state(Arc::clone(&self.state))
    }

    /// Starts the HTTP server.
    ///
    /// This method runs the server until it is shut down.
    pub async fn run(self) -> Result<(), ServerError> {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        tracing::info!(
            addr = %self.config.bind_addr,
            "Metrics server listening"
        );

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Server(e.to_string()))?;

        Ok(())
    }
}

/// Handler for the /metrics endpoint.
async fn metrics_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    state
        .registry
        .update(&MetricsSnapshot::from_manager(&state.manager));

    match state.registry.encode() {
        Ok(output) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            output,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {}", e),
        ),
    }
}

/// Handler for the /health endpoint.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Handler for the /status endpoint.
async fn status_handler(State(state): State<Arc<ServerState>>) -> Json<ManagerStatus> {
    Json(state.manager.snapshot())
}
