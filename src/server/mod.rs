//! HTTP transport: routing, middleware and error rendering

pub mod handlers;
pub mod payload;

use crate::{
    config::ServerConfig,
    error::{BgRemovalError, Result},
    segmentation::SegmentationBackend,
};
use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use payload::ErrorResponse;
use std::{sync::Arc, time::Duration};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{error, info, warn};

/// State shared by every request
#[derive(Debug)]
pub struct AppState {
    /// Segmentation strategy chosen at startup
    pub backend: Arc<SegmentationBackend>,
    pub config: ServerConfig,
}

impl AppState {
    #[must_use]
    pub fn new(backend: SegmentationBackend, config: ServerConfig) -> Self {
        Self {
            backend: Arc::new(backend),
            config,
        }
    }
}

impl BgRemovalError {
    /// HTTP status reported for this error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for BgRemovalError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        } else {
            warn!(error = %self, "Request rejected");
        }
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}

/// Build the application router with its middleware stack
pub fn router(state: Arc<AppState>) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout_secs);
    let body_limit = state.config.max_upload_bytes;

    let routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/remove-background", post(handlers::remove_background))
        .route("/change-background", post(handlers::change_background))
        .route("/create-passport-grid", post(handlers::create_passport_grid));

    with_middleware(routes, timeout, body_limit).with_state(state)
}

fn with_middleware<S>(routes: Router<S>, timeout: Duration, body_limit: usize) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    routes
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TimeoutLayer::new(timeout))
        .layer(middleware::map_response(timeout_body))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Give timed-out requests the same `{error}` body as every other failure
async fn timeout_body(response: Response) -> Response {
    if response.status() != StatusCode::REQUEST_TIMEOUT {
        return response;
    }
    warn!("Request timed out");
    let body = Json(ErrorResponse {
        error: "Request timed out".to_string(),
    });
    (StatusCode::REQUEST_TIMEOUT, body).into_response()
}

/// Bind the configured address and serve until Ctrl-C
///
/// # Errors
/// - Invalid configuration
/// - Failure to bind or accept on the listening socket
pub async fn serve(config: ServerConfig, backend: SegmentationBackend) -> Result<()> {
    config.validate()?;
    let address = config.bind_address();
    let method = backend.method();

    let state = Arc::new(AppState::new(backend, config));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!(
        address = %listener.local_addr()?,
        method = %method,
        quality = method.quality(),
        "Background removal API listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
