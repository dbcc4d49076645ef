//! Deadline helpers for Store and Cache calls.

use std::future::Future;
use std::time::Duration;

use serde_json::json;

use crate::error::AppError;

/// Runs a fallible Store operation under `limit`.
///
/// An elapsed deadline becomes [`AppError::Unavailable`], the same class as a
/// connectivity failure, so callers treat both as retryable.
pub async fn with_deadline<T, F>(limit: Duration, operation: &'static str, fut: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, timeout_ms = limit.as_millis() as u64, "Store call timed out");
            Err(AppError::unavailable(
                "Store call timed out",
                json!({ "operation": operation, "timeout_ms": limit.as_millis() as u64 }),
            ))
        }
    }
}

/// Runs a best-effort Cache operation under `limit`, returning `None` on timeout.
pub async fn best_effort<T, F>(limit: Duration, operation: &'static str, fut: F) -> Option<T>
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(operation, timeout_ms = limit.as_millis() as u64, "Cache call timed out");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_deadline_passes_result_through() {
        let ok = with_deadline(Duration::from_secs(1), "op", async { Ok::<_, AppError>(7) }).await;
        assert_eq!(ok.unwrap(), 7);

        let err = with_deadline(Duration::from_secs(1), "op", async {
            Err::<(), _>(AppError::not_found("missing", json!({})))
        })
        .await;
        assert!(matches!(err, Err(AppError::NotFound { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_deadline_times_out_as_unavailable() {
        let result = with_deadline(Duration::from_millis(50), "slow", async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, AppError>(())
        })
        .await;

        assert!(matches!(result, Err(AppError::Unavailable { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_best_effort_returns_none_on_timeout() {
        let result = best_effort(Duration::from_millis(50), "slow", async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            1
        })
        .await;

        assert!(result.is_none());
        assert_eq!(best_effort(Duration::from_secs(1), "fast", async { 2 }).await, Some(2));
    }
}
