//! Web layer module
//!
//! The HTTP interface of the image optimizer. Handlers are thin and delegate
//! to [`ImageOptimizer`]; errors are mapped to status codes in
//! [`responses::handle_error`].
//!
//! # Routes
//!
//! - `GET /` usage banner
//! - `GET /api/image/{*path}` optimized JPEG
//! - `GET /api/info?url=` source image dimensions and format
//! - `GET /api/cache/stats` cache size and directory
//! - `POST /api/cache/cleanup` immediate expiry sweep
//! - `GET /api/health` liveness
//!
//! All `/api` routes require `Authorization: Bearer <token>` when an API
//! token is configured.

use anyhow::Result;
use axum::{
    Router,
    http::{HeaderName, Method, header},
    routing::{get, post},
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::services::ImageOptimizer;

pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod responses;

pub use responses::{ApiResponse, handle_error};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub optimizer: Arc<ImageOptimizer>,
    pub api_token: Option<Arc<str>>,
}

impl AppState {
    /// An empty or whitespace-only token disables authentication.
    pub fn new(optimizer: Arc<ImageOptimizer>, api_token: Option<&str>) -> Self {
        let api_token = api_token
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(Arc::from);
        Self {
            optimizer,
            api_token,
        }
    }
}

/// Build the application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/image/{*path}", get(handlers::images::optimize_image))
        .route("/info", get(handlers::info::image_info))
        .route("/cache/stats", get(handlers::cache::cache_stats))
        .route("/cache/cleanup", post(handlers::cache::cleanup_cache))
        .route("/health", get(handlers::health::health_check))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::bearer_auth_middleware,
        ));

    Router::new()
        .route("/", get(handlers::index::index))
        .nest("/api", api)
        // Middleware (applied in reverse order)
        .layer(cors_layer())
        .layer(axum::middleware::from_fn(
            middleware::request_logging_middleware,
        ))
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ACCEPT,
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-csrf-token"),
        ])
        .expose_headers([header::LINK])
        .max_age(Duration::from_secs(300))
}

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(state: AppState, addr: SocketAddr) -> Self {
        Self {
            app: create_router(state),
            addr,
        }
    }

    /// Serve with cancellation support and ready notification
    ///
    /// `ready_signal` receives `Ok(())` once the listener is bound, or the bind
    /// error. Without a cancellation token the server stops on SIGINT/SIGTERM.
    ///
    /// # Errors
    /// Fails when the address cannot be bound or the server errors.
    pub async fn serve_with_cancellation(
        self,
        ready_signal: oneshot::Sender<Result<SocketAddr>>,
        cancellation_token: Option<CancellationToken>,
    ) -> Result<()> {
        let listener = match tokio::net::TcpListener::bind(&self.addr).await {
            Ok(listener) => listener,
            Err(bind_error) => {
                let bind_err_msg = format!("Failed to bind to {}: {}", self.addr, bind_error);
                let _ = ready_signal.send(Err(anyhow::anyhow!("{}", bind_err_msg)));
                return Err(anyhow::anyhow!("{}", bind_err_msg));
            }
        };

        let local_addr = listener.local_addr()?;
        info!("Web server listening on http://{}", local_addr);
        let _ = ready_signal.send(Ok(local_addr));

        let shutdown_signal = async move {
            match cancellation_token {
                Some(token) => {
                    token.cancelled().await;
                    info!("Web server received cancellation signal, shutting down gracefully");
                }
                None => wait_for_shutdown_signal().await,
            }
        };

        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal)
            .await?;
        Ok(())
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
        (Err(e), _) | (_, Err(e)) => {
            error!("Failed to install signal handlers: {}", e);
            std::future::pending::<()>().await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down gracefully");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down gracefully"),
        Err(e) => {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
