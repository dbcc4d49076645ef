//! Shared-secret authentication for admin routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::{error::AppError, state::AppState};

/// Header carrying the admin secret.
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Admits requests whose `X-Admin-Token` matches the configured token.
///
/// When no token is configured every request is rejected.
///
/// # Errors
///
/// Returns `401 Unauthorized` if the header is missing or does not match.
pub async fn layer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let presented = req
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());

    match (state.admin_token.as_deref(), presented) {
        (Some(expected), Some(presented)) if tokens_match(expected, presented) => {
            Ok(next.run(req).await)
        }
        _ => Err(AppError::unauthorized(
            "Unauthorized",
            json!({ "reason": "X-Admin-Token header is missing or invalid" }),
        )),
    }
}

/// Compares digests so the comparison time does not depend on how much of
/// the secret matched.
fn tokens_match(expected: &str, presented: &str) -> bool {
    Sha256::digest(expected.as_bytes()) == Sha256::digest(presented.as_bytes())
}
