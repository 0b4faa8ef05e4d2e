//! HTTP front end for agentos.
//!
//! # Endpoints
//!
//! - `GET /health` - Liveness and uptime
//! - `GET /api/status` - Host resource snapshot and power mode
//! - `POST /api/chat` - Run one user turn through the workflow
//!
//! ```text
//! Client (web UI / curl)
//!    │
//!    ▼
//! ┌─────────────────┐
//! │   API (Axum)    │ ◄── This crate
//! └────────┬────────┘
//!          │
//!    ┌─────┴───────────┬────────────────┐
//!    ▼                 ▼                ▼
//! [WorkflowEngine] [ResourceMonitor] [ConversationStore]
//! ```

pub mod repl;
pub mod routes;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use repl::run_repl;
pub use state::{AppState, MemorySession};

/// Create the API router with all routes configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health))
        .route("/api/status", get(routes::status))
        .route("/api/chat", post(routes::chat))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> anyhow::Result<()> {
    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(addr = %listener.local_addr()?, "Starting agentos API server");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Shutdown signal received"),
                // No signal handler available; run until killed.
                Err(_) => std::future::pending::<()>().await,
            }
        })
        .await?;

    Ok(())
}
