//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy handler
//! - Wire up middleware (request ID, tracing, panic capture, CORS, authorizer)
//! - Bind server to listener with graceful shutdown
//! - Run the fetch → validate → forward pipeline per request

use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{AuthMode, ProxyConfig};
use crate::error::ProxyError;
use crate::http::request::{request_id, MakeRequestUuid, TargetUrl, X_REQUEST_ID};
use crate::http::response;
use crate::lifecycle::shutdown;
use crate::observability::metrics;
use crate::security::access_control::{access_control_middleware, authorizer_from_config};
use crate::security::cors::cors_layer;
use crate::upstream::{ResponseValidator, UpstreamFetcher};

/// Error type for server construction and serving.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Server IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub fetcher: UpstreamFetcher,
    pub validator: Arc<ResponseValidator>,
}

/// HTTP server for the image proxy.
pub struct HttpServer {
    router: Router,
    auth_mode: AuthMode,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: &ProxyConfig) -> Result<Self, ServerError> {
        let state = AppState {
            fetcher: UpstreamFetcher::new(&config.upstream)?,
            validator: Arc::new(ResponseValidator::new(&config.validation)),
        };

        Ok(Self {
            router: Self::build_router(&config, state),
            auth_mode: config.auth.mode,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let authorizer = authorizer_from_config(&config.auth);

        Router::new()
            .route("/{target}", get(proxy_handler))
            .route_layer(middleware::from_fn_with_state(
                authorizer,
                access_control_middleware,
            ))
            .fallback(not_found)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                    .layer(CatchPanicLayer::custom(panic_response))
                    .layer(cors_layer(&config.cors)),
            )
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            auth_mode = ?self.auth_mode,
            "HTTP server starting"
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown::wait_for(shutdown_rx))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler.
/// Decodes the target, fetches it, validates it, and streams it back.
async fn proxy_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    target: Result<TargetUrl, ProxyError>,
) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(&headers);

    let result = match target {
        Ok(TargetUrl(url)) => {
            tracing::info!(request_id = %request_id, url = %url, "Proxying image");
            proxy_image(&state, &url).await
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(response) => {
            metrics::record_request(response.status().as_u16(), "forwarded", start_time);
            response
        }
        Err(e) => {
            let (status, _) = e.classify();
            if e.is_client_error() {
                tracing::warn!(request_id = %request_id, status = %status, error = %e, "Request rejected");
            } else {
                tracing::error!(request_id = %request_id, status = %status, error = %e, "Image download failed");
            }
            metrics::record_request(status.as_u16(), e.kind().as_str(), start_time);
            e.into_response()
        }
    }
}

async fn proxy_image(state: &AppState, url: &url::Url) -> Result<Response, ProxyError> {
    let upstream = state.fetcher.fetch(url).await?;
    let upstream = state.validator.validate(upstream)?;
    Ok(response::forward(upstream))
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not found")
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %detail, "Handler panicked");
    ProxyError::Unknown(detail.to_string()).into_response()
}
