//! Write-back of pending click counts from the cache to the store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::domain::flush_job::FlushJob;
use crate::domain::flush_worker::FlushHandler;
use crate::domain::repositories::MappingRepository;
use crate::error::AppError;
use crate::infrastructure::cache::CacheService;
use crate::telemetry::names;
use crate::utils::deadline::{best_effort, with_deadline};

/// How the pending delta is moved out of the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeltaDrain {
    /// Atomic get-and-delete. A failed store write puts the delta back.
    #[default]
    Take,
    /// Read, write to the store, then subtract what was written. Increments
    /// landing after the read stay pending; for backends without get-and-delete.
    ReadThenClear,
}

/// Moves pending clicks into the store.
///
/// Every cache and store call runs under `timeout`, a deadline independent
/// of the request that triggered the flush.
pub struct ClickFlusher {
    repository: Arc<dyn MappingRepository>,
    cache: Option<Arc<dyn CacheService>>,
    timeout: Duration,
    drain: DeltaDrain,
}

impl ClickFlusher {
    pub fn new(
        repository: Arc<dyn MappingRepository>,
        cache: Option<Arc<dyn CacheService>>,
        timeout: Duration,
        drain: DeltaDrain,
    ) -> Self {
        Self {
            repository,
            cache,
            timeout,
            drain,
        }
    }

    /// Flushes the clicks represented by `job`, returning how many were written.
    ///
    /// With a cache and a cached job, the pending delta is drained and written
    /// in one increment; a zero delta means an earlier flush already took it.
    /// Without a cache, for direct jobs, or when the delta cannot be read,
    /// exactly one click is written.
    ///
    /// # Errors
    ///
    /// Returns the store error if the write fails. With [`DeltaDrain::Take`]
    /// the drained delta has been returned to the cache by then.
    pub async fn flush_clicks(&self, job: &FlushJob) -> Result<i64, AppError> {
        if job.pending_in_cache
            && let Some(cache) = &self.cache
        {
            let drained = match self.drain {
                DeltaDrain::Take => {
                    best_effort(self.timeout, "take_click_delta", cache.take_click_delta(&job.code))
                        .await
                }
                DeltaDrain::ReadThenClear => {
                    best_effort(self.timeout, "get_click_delta", cache.get_click_delta(&job.code))
                        .await
                }
            };

            match drained {
                Some(Ok(0)) => {
                    debug!(code = %job.code, "No pending clicks");
                    return Ok(0);
                }
                Some(Ok(delta)) => return self.write_delta(cache.as_ref(), &job.code, delta).await,
                Some(Err(e)) => {
                    warn!(code = %job.code, "Pending click read failed, writing one click: {}", e);
                    metrics::counter!(names::CACHE_ERRORS_TOTAL, "op" => "drain").increment(1);
                }
                None => {
                    warn!(code = %job.code, "Pending click read timed out, writing one click");
                }
            }
        }

        self.increment(&job.code, 1).await?;
        Ok(1)
    }

    async fn write_delta(
        &self,
        cache: &dyn CacheService,
        code: &str,
        delta: i64,
    ) -> Result<i64, AppError> {
        match (self.drain, self.increment(code, delta).await) {
            (DeltaDrain::Take, Ok(())) => Ok(delta),
            (DeltaDrain::ReadThenClear, Ok(())) => {
                match best_effort(
                    self.timeout,
                    "settle_click_delta",
                    cache.restore_click_delta(code, -delta),
                )
                .await
                {
                    Some(Ok(())) => {}
                    _ => warn!(code, delta, "Failed to settle pending clicks after write"),
                }
                Ok(delta)
            }
            (drain, Err(e @ AppError::NotFound { .. })) => {
                if drain == DeltaDrain::ReadThenClear {
                    self.discard(cache, code).await;
                }
                Err(e)
            }
            (DeltaDrain::Take, Err(e)) => {
                match best_effort(
                    self.timeout,
                    "restore_click_delta",
                    cache.restore_click_delta(code, delta),
                )
                .await
                {
                    Some(Ok(())) => debug!(code, delta, "Returned pending clicks to cache"),
                    _ => error!(code, delta, "Failed to return pending clicks to cache"),
                }
                Err(e)
            }
            (DeltaDrain::ReadThenClear, Err(e)) => Err(e),
        }
    }

    /// Drops the pending delta of a code the store no longer knows.
    async fn discard(&self, cache: &dyn CacheService, code: &str) {
        if !matches!(
            best_effort(self.timeout, "clear_click_delta", cache.clear_click_delta(code)).await,
            Some(Ok(()))
        ) {
            warn!(code, "Failed to drop pending clicks of a missing mapping");
        }
    }

    async fn increment(&self, code: &str, delta: i64) -> Result<(), AppError> {
        with_deadline(
            self.timeout,
            "increment_clicks",
            self.repository.increment_clicks(code, delta),
        )
        .await?;

        metrics::counter!(names::CLICKS_FLUSHED_TOTAL).increment(delta as u64);
        Ok(())
    }
}

#[async_trait]
impl FlushHandler for ClickFlusher {
    async fn flush(&self, job: FlushJob) {
        match self.flush_clicks(&job).await {
            Ok(written) => debug!(code = %job.code, written, "Clicks flushed"),
            Err(e) => {
                metrics::counter!(names::FLUSH_FAILURES_TOTAL).increment(1);
                warn!(code = %job.code, "Click flush failed: {}", e);
            }
        }
    }
}
