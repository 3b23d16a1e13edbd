//! HTTP server setup and routing

use crate::error::{Error, Result};
use crate::state::SharedState;
use axum::{
    routing::{get, post, put},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub state: Arc<SharedState>,
}

/// Build the router
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        // Health check (no prefix for health endpoint)
        .route("/health", get(super::handlers::health))
        .nest(
            "/api/v1",
            Router::new()
                // Session lifecycle
                .route("/sessions", post(super::handlers::open_session))
                .route("/session", get(super::handlers::get_session))
                // User actions
                .route("/session/start", post(super::handlers::start))
                .route("/session/done", post(super::handlers::reps_done))
                .route("/session/replay", post(super::handlers::replay))
                .route("/session/dismiss", post(super::handlers::dismiss))
                .route("/session/back", post(super::handlers::back))
                // Display locale
                .route("/locale", get(super::handlers::get_locale))
                .route("/locale", put(super::handlers::set_locale))
                // SSE event stream
                .route("/events", get(super::sse::event_stream)),
        )
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve the API on `port` until `shutdown` resolves
pub async fn run<F>(port: u16, state: Arc<SharedState>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(AppContext { state });

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Http(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Http(format!("Server error: {}", e)))?;

    Ok(())
}
