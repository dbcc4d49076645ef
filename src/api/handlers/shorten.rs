//! Handler for the shortening endpoint.

use axum::{Json, extract::State, http::HeaderMap};
use validator::Validate;

use crate::api::dto::shorten::{ShortenRequest, ShortenResponse};
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::request::request_host;

/// Creates (or returns the existing) short code for a URL.
///
/// # Endpoint
///
/// `POST /shorten`
///
/// # Request Body
///
/// ```json
/// { "url": "https://example.com/a" }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "short_url": "https://sho.rt/IPhmXSNu",
///   "short_code": "IPhmXSNu",
///   "original_url": "https://example.com/a"
/// }
/// ```
///
/// The short URL is built from the request's `Host` header.
///
/// # Errors
///
/// - 400 if the body, the URL or the `Host` header is invalid
/// - 503 if no free code was found or the store is unavailable
pub async fn shorten_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ShortenRequest>,
) -> Result<Json<ShortenResponse>, AppError> {
    payload.validate()?;
    let host = request_host(&headers)?;

    let mapping = state.shortener.create_short(&payload.url).await?;

    Ok(Json(ShortenResponse {
        short_url: format!("{}://{}/{}", state.scheme(), host, mapping.short_code),
        short_code: mapping.short_code,
        original_url: mapping.original_url,
    }))
}
