//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::options::ServerOptions;
use crate::errors::DeployError;
use crate::server::handlers::{
    deploy_handler, health_handler, index_handler, status_handler, version_handler,
};
use crate::server::state::ServerState;

/// Build the service router
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        // Deployment
        .route("/", get(index_handler))
        .route("/deploy", get(deploy_handler))
        .route("/status", get(status_handler))
        // Health and version
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        // State and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server
pub async fn serve(
    options: &ServerOptions,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), DeployError>>, DeployError> {
    let app = router(state);

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| DeployError::ServerError(e.to_string()))?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| DeployError::ServerError(e.to_string()))
    });

    Ok(handle)
}
