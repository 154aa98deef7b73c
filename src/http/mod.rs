//! HTTP server module: router, admission middleware, and serving.

mod middleware;
mod server;

pub use middleware::admission_middleware;
pub use server::{router, HttpServer};

use std::sync::Arc;

use crate::config::KeyStrategy;
use crate::ratelimit::LimiterRegistry;

/// Shared state handed to the router and its middleware.
///
/// The registry is constructed once at startup and injected here; there is
/// no process-global limiter state, so tests can build isolated instances.
#[derive(Clone)]
pub struct AppState {
    /// The per-client limiter registry
    pub registry: Arc<LimiterRegistry>,
    /// How client keys are derived from peer addresses
    pub key_strategy: KeyStrategy,
}

impl AppState {
    /// Create the shared state from an existing registry.
    pub fn new(registry: Arc<LimiterRegistry>, key_strategy: KeyStrategy) -> Self {
        Self {
            registry,
            key_strategy,
        }
    }
}
