//! HTTP server implementation.

use std::net::SocketAddr;

use axum::{middleware, routing::get, Json, Router};
use tokio::net::TcpListener;
use tracing::{error, info};

use super::middleware::admission_middleware;
use super::AppState;
use crate::error::{Result, TurnstileError};

/// Build the application router with the admission layer in front of every
/// route.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(ping))
        .route("/healthz", get(health))
        .layer(middleware::from_fn_with_state(state, admission_middleware))
}

async fn ping() -> &'static str {
    "Finished"
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// HTTP server fronting the application with admission control.
pub struct HttpServer {
    /// Address to bind to
    addr: SocketAddr,
    /// Shared application state
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(addr: SocketAddr, state: AppState) -> Self {
        Self { addr, state }
    }

    /// Start the HTTP server.
    ///
    /// This method will block until the server is shut down.
    pub async fn serve(self) -> Result<()> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Start the HTTP server with graceful shutdown.
    ///
    /// The server will shut down when the provided signal resolves. A bind
    /// failure is fatal and surfaces as an I/O error.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let app = router(self.state);

        let listener = TcpListener::bind(self.addr).await.map_err(|e| {
            error!(addr = %self.addr, error = %e, "Failed to bind listen address");
            TurnstileError::Io(e)
        })?;

        info!(addr = %self.addr, "Starting HTTP server");

        // ConnectInfo carries the peer address into the admission middleware.
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(signal)
        .await
        .map_err(|e| {
            error!(error = %e, "HTTP server failed");
            TurnstileError::Io(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeyStrategy;
    use crate::ratelimit::LimiterRegistry;
    use std::sync::Arc;

    #[test]
    fn test_server_creation() {
        let addr: SocketAddr = "127.0.0.1:8889".parse().unwrap();
        let registry = Arc::new(LimiterRegistry::new(200, 490.0));
        let state = AppState::new(registry, KeyStrategy::Ip);
        let _server = HttpServer::new(addr, state);
    }
}
