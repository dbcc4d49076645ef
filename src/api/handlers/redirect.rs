//! Handler for short URL redirect.

use axum::{
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use url::Url;

use crate::error::AppError;
use crate::state::AppState;

/// Redirects a short code to its original URL.
///
/// # Endpoint
///
/// `GET /{code}`
///
/// Responds `302 Found`. The click is counted asynchronously and never
/// delays or fails the redirect.
///
/// # Errors
///
/// - 404 if the code is unknown
/// - 503 if the cache missed and the store is unavailable
pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let original = state.shortener.resolve(&code).await?;
    let location = location_header(&original)?;

    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}

/// Builds a `Location` value, percent-encoding URLs that are not plain ASCII.
fn location_header(original: &str) -> Result<HeaderValue, AppError> {
    if let Ok(value) = HeaderValue::from_str(original) {
        return Ok(value);
    }

    Url::parse(original)
        .ok()
        .and_then(|url| HeaderValue::from_str(url.as_str()).ok())
        .ok_or_else(|| {
            AppError::internal("Stored URL is not a valid redirect target", json!({}))
        })
}
