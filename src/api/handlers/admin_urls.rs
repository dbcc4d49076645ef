//! Handler for the admin listing.

use axum::{
    Json,
    extract::{Query, State},
};

use crate::api::dto::pagination::ListParams;
use crate::domain::entities::UrlMapping;
use crate::error::AppError;
use crate::state::AppState;

/// Lists mappings newest first.
///
/// # Endpoint
///
/// `GET /admin/urls?page=1&limit=20`
///
/// Requires `X-Admin-Token`. `page` below 1 reads as 1 and `limit` outside
/// `1..=100` reads as 20.
pub async fn list_urls_handler(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<UrlMapping>>, AppError> {
    let mappings = state
        .shortener
        .list(params.page(), params.limit())
        .await?;

    Ok(Json(mappings))
}
