//! Admission middleware: per-client token bucket check in front of every
//! route.

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use super::AppState;
use crate::config::KeyStrategy;

/// Decide whether a request is admitted before it reaches the handler.
///
/// Derives the client key from the peer address, consults that key's token
/// bucket, and either forwards the request unchanged or answers
/// `429 Too Many Requests` without ever invoking the downstream handler.
pub async fn admission_middleware(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = client_key(peer, state.key_strategy);

    if state.registry.check(&key) {
        next.run(request).await
    } else {
        debug!(
            client = %key,
            method = %request.method(),
            path = %request.uri().path(),
            "Rejecting request over rate limit"
        );
        too_many_requests()
    }
}

/// Derive the client key from the peer address.
fn client_key(peer: SocketAddr, strategy: KeyStrategy) -> String {
    match strategy {
        KeyStrategy::Ip => peer.ip().to_string(),
        KeyStrategy::Socket => peer.to_string(),
    }
}

/// Standard rejection response: status 429 with the canonical status text
/// as body, no extra headers.
fn too_many_requests() -> Response {
    let body = StatusCode::TOO_MANY_REQUESTS
        .canonical_reason()
        .unwrap_or("Too Many Requests");
    (StatusCode::TOO_MANY_REQUESTS, body).into_response()
}
