//! API route tables.

use crate::api::handlers::{list_urls_handler, redirect_handler, shorten_handler};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

/// Public routes, rate-limited per client by the caller.
///
/// # Endpoints
///
/// - `POST /shorten` - Create or return a short code
/// - `GET  /{code}`  - Redirect to the original URL
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/shorten", post(shorten_handler))
        .route("/{code}", get(redirect_handler))
}

/// Admin routes, protected by `X-Admin-Token` by the caller.
///
/// # Endpoints
///
/// - `GET /admin/urls?page=&limit=` - List mappings newest first
pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/admin/urls", get(list_urls_handler))
}
