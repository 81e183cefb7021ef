//! HTTP control surface
//!
//! Thin axum layer over the engine's read-only snapshot and its two
//! commands, plus an SSE stream of `ScanEvent`s. Simulation hooks are only
//! served when the controller runs with simulated bridges.

pub mod handlers;
pub mod sse;

use crate::bridges::sim::{Scene, SoftTrigger};
use crate::error::{Error, Result};
use crate::scan::ScanEngine;
use axum::{
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Notify;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub engine: Arc<ScanEngine>,
    /// Simulated scene (None with real bridges)
    pub scene: Option<Arc<Scene>>,
    /// Simulated trigger (None with real bridges)
    pub soft_trigger: Option<Arc<SoftTrigger>>,
    /// Signalled by `POST /api/v1/shutdown`
    pub shutdown: Arc<Notify>,
}

/// Build the router
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .nest(
            "/api/v1",
            Router::new()
                .route("/session", get(handlers::get_session))
                .route("/session/reset", post(handlers::reset_session))
                .route("/shutdown", post(handlers::shutdown))
                .route("/events", get(sse::event_stream))
                .route(
                    "/sim/scene",
                    post(handlers::show_scene_item).delete(handlers::clear_scene),
                )
                .route("/sim/button", post(handlers::set_button)),
        )
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve the API until `shutdown_signal` resolves
pub async fn run(
    ctx: AppContext,
    addr: SocketAddr,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let app = create_router(ctx);

    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Http(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| Error::Http(format!("Server error: {}", e)))?;

    Ok(())
}
