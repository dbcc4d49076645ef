//! Top-level router.
//!
//! # Route Structure
//!
//! - `POST /shorten`     - Create a short code (rate-limited)
//! - `GET  /{code}`      - Redirect (rate-limited)
//! - `GET  /admin/urls`  - Paginated listing (`X-Admin-Token` required)
//! - `GET  /healthz`     - Health check: store, cache, flush queue
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **Rate limiting** - Per-client token bucket on public routes
//! - **Admin auth** - Shared secret header on admin routes
//! - **Path normalization** - Trailing slash handling

use crate::api;
use crate::api::handlers::health_handler;
use crate::api::middleware::{admin_auth, rate_limit, tracing};
use crate::state::AppState;
use axum::routing::get;
use axum::{Router, middleware};
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Builds the router with all routes and middleware except path normalization.
pub fn router(state: AppState) -> Router {
    let public = api::routes::public_routes().route_layer(middleware::from_fn_with_state(
        state.clone(),
        rate_limit::layer,
    ));

    let admin = api::routes::admin_routes().route_layer(middleware::from_fn_with_state(
        state.clone(),
        admin_auth::layer,
    ));

    Router::new()
        .merge(public)
        .merge(admin)
        .route("/healthz", get(health_handler))
        .with_state(state)
        .layer(tracing::layer())
}

/// Builds the application router, trimming trailing slashes before routing.
pub fn app_router(state: AppState) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(router(state))
}
