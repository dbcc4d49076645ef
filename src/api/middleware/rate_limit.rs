//! Per-client rate limiting for the public endpoints.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use serde_json::json;
use tracing::debug;

use crate::error::AppError;
use crate::state::AppState;
use crate::telemetry::names;
use crate::utils::request::client_key;

/// Consumes one token from the caller's bucket or rejects the request.
///
/// The caller is identified by peer IP, or by forwarding headers when the
/// service runs behind a trusted proxy (see [`client_key`]).
///
/// # Errors
///
/// Returns `429 Too Many Requests` when the bucket is empty.
///
/// # Example
///
/// ```rust,ignore
/// let limited = Router::new()
///     .route("/shorten", post(shorten_handler))
///     .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit::layer));
/// ```
pub async fn layer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let key = client_key(req.headers(), peer, state.behind_proxy);

    if !state.rate_limiter.allow(&key) {
        debug!(client = %key, path = %req.uri().path(), "Rate limit exceeded");
        metrics::counter!(names::RATE_LIMITED_TOTAL).increment(1);
        return Err(AppError::rate_limited("Rate limit exceeded", json!({})));
    }

    Ok(next.run(req).await)
}
