//! Application builder: wires router, middleware and state into an Axum app.

use std::future::Future;

use axum::Router;
use axum::middleware::from_fn;
use tower_http::trace::TraceLayer;

use heritage_core::config::app::ServerConfig;
use heritage_core::error::{AppError, ErrorKind};

use crate::middleware::cors::build_cors_layer;
use crate::middleware::logging::request_logging;
use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.server.cors);

    build_router(state)
        .layer(from_fn(request_logging))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Bind the listener and serve `app` until `shutdown` resolves.
pub async fn serve<F>(config: &ServerConfig, app: Router, shutdown: F) -> Result<(), AppError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        AppError::with_source(ErrorKind::Configuration, format!("Failed to bind {addr}"), e)
    })?;

    tracing::info!(%addr, "Heritage admin server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .map_err(|e| AppError::with_source(ErrorKind::Internal, "Server error", e))?;

    Ok(())
}
