//! HTTP server exposing the proxy
//!
//! Routes:
//! - `/proxy?uri=...` (any method): fetch, negotiate and possibly transcode
//! - `/health`: liveness check

use axum::{
    Json, Router,
    body::Body,
    extract::{Query, State},
    http::{HeaderMap, Method},
    response::{IntoResponse, Response},
    routing::{any, get},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

use crate::config::ProxyConfig;
use crate::error::{FormatsProxyError, Result};
use crate::formats::FormatRegistry;

use super::fetch::HttpFetcher;
use super::pipeline::{FormatsProxy, ProxyRequest};
use super::response::ProxyError;

/// Shared application state for all handlers
#[derive(Clone, Debug)]
pub struct AppState {
    pub proxy: FormatsProxy,
    /// Upper bound when buffering an inbound request body
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(proxy: FormatsProxy) -> Self {
        Self {
            proxy,
            max_body_bytes: usize::MAX,
        }
    }
}

/// The proxy server
pub struct ProxyServer {
    config: ProxyConfig,
    registry: Arc<dyn FormatRegistry>,
}

impl ProxyServer {
    pub fn new(config: ProxyConfig, registry: Arc<dyn FormatRegistry>) -> Self {
        Self { config, registry }
    }

    /// Bind the listen address and serve until Ctrl+C or SIGTERM
    pub async fn serve(&self) -> Result<()> {
        let timeout = self.config.timeout_secs.map(Duration::from_secs);
        let fetcher = HttpFetcher::new(timeout)?;

        let proxy = FormatsProxy::new(Arc::clone(&self.registry), Arc::new(fetcher))
            .with_default_accept(self.config.default_accept.clone());
        let state = Arc::new(AppState {
            proxy,
            max_body_bytes: self.config.max_body_bytes,
        });

        let app = create_router(state);

        let addr: SocketAddr = self
            .config
            .listen_addr
            .parse()
            .map_err(|e| FormatsProxyError::Config(format!("Invalid listen address: {e}")))?;

        tracing::info!("Starting formats proxy on {addr}");
        tracing::info!(
            "Parsers: {}",
            self.registry.parser_types().to_header_value()
        );
        tracing::info!(
            "Serializers: {}",
            self.registry.serializer_types().to_header_value()
        );
        match timeout {
            Some(timeout) => tracing::info!("Outbound fetch timeout: {}s", timeout.as_secs()),
            None => tracing::warn!(
                "No outbound fetch timeout configured; a hung origin holds its request open indefinitely"
            ),
        }

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| FormatsProxyError::Server(format!("Failed to bind to {addr}: {e}")))?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| FormatsProxyError::Server(format!("Server error: {e}")))?;

        tracing::info!("Formats proxy shut down gracefully");
        Ok(())
    }
}

/// Create the router with all routes configured
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/proxy", any(proxy_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

async fn proxy_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Vec<(String, String)>>,
    method: Method,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!("Failed to read request body: {e}");
            return ProxyError::BadRequest(format!("Failed to read request body: {e}"))
                .into_response();
        }
    };

    // A repeated parameter resolves to its first occurrence.
    let uri = params
        .into_iter()
        .find_map(|(name, value)| (name == "uri").then_some(value));

    state
        .proxy
        .handle(ProxyRequest {
            method,
            uri,
            headers,
            body,
        })
        .await
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        },
    }
}
