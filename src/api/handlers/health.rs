//! Handler for the health check endpoint.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::health::{CheckStatus, HealthChecks, HealthResponse};
use crate::state::AppState;
use crate::utils::deadline::best_effort;

/// Returns service health with component checks.
///
/// # Endpoint
///
/// `GET /healthz`
///
/// # Response Codes
///
/// - **200 OK**: store reachable and flush queue open. A failing cache only
///   marks the status `degraded`, since resolution falls back to the store.
/// - **503 Service Unavailable**: store unreachable or flush queue closed
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "checks": {
///     "database": { "status": "ok", "message": "Connected" },
///     "cache": { "status": "disabled" },
///     "flush_queue": { "status": "ok", "message": "Free slots: 10000" }
///   }
/// }
/// ```
pub async fn health_handler(
    State(state): State<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let database = check_database(&state).await;
    let cache = check_cache(&state).await;
    let flush_queue = check_flush_queue(&state);

    let critical = database.is_error() || flush_queue.is_error();
    let status = if critical || cache.is_error() {
        "degraded"
    } else {
        "healthy"
    };

    let code = if critical {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            checks: HealthChecks {
                database,
                cache,
                flush_queue,
            },
        }),
    )
}

async fn check_database(state: &AppState) -> CheckStatus {
    match state.shortener.ping_store().await {
        Ok(()) => CheckStatus::ok("Connected"),
        Err(e) => CheckStatus::error(format!("Database error: {e}")),
    }
}

async fn check_cache(state: &AppState) -> CheckStatus {
    let Some(cache) = state.shortener.cache() else {
        return CheckStatus::disabled();
    };

    let timeout = state.shortener.settings().store_timeout;
    match best_effort(timeout, "health_check", cache.health_check()).await {
        Some(true) => CheckStatus::ok("Connected"),
        _ => CheckStatus::error("Cache unreachable"),
    }
}

fn check_flush_queue(state: &AppState) -> CheckStatus {
    let queue = state.shortener.flush_queue();
    if queue.is_closed() {
        CheckStatus::error("Flush queue is closed")
    } else {
        CheckStatus::ok(format!("Free slots: {}", queue.capacity()))
    }
}
