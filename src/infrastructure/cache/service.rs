//! Cache service trait and error types.

use async_trait::async_trait;

/// Errors that can occur during cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache connection error: {0}")]
    ConnectionError(String),

    #[error("Cache operation error: {0}")]
    OperationError(String),
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Best-effort accelerator for short code lookups and pending click counts.
///
/// Nothing stored here is authoritative. URL entries are replicas of store
/// rows; the pending click delta for a code is owned by the cache until a
/// flush moves it into the store. Each single-key operation must be atomic
/// in the backend.
///
/// Running without a cache is a valid mode: the service holds an
/// `Option<Arc<dyn CacheService>>`.
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::RedisCache`] - Redis-backed cache
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Retrieves the original URL for a short code.
    ///
    /// Implementations report backend errors as a miss (`Ok(None)`).
    async fn get_url(&self, short_code: &str) -> CacheResult<Option<String>>;

    /// Stores a URL mapping.
    ///
    /// `ttl_seconds = None` keeps the entry until the backend evicts it.
    async fn set_url(
        &self,
        short_code: &str,
        original_url: &str,
        ttl_seconds: Option<u64>,
    ) -> CacheResult<()>;

    /// Increments the pending click delta for `short_code`, returning the new value.
    async fn increment_click_delta(&self, short_code: &str) -> CacheResult<i64>;

    /// Reads the pending click delta; a missing counter reads as zero.
    async fn get_click_delta(&self, short_code: &str) -> CacheResult<i64>;

    /// Deletes the pending click delta, including increments that landed
    /// after the last read.
    async fn clear_click_delta(&self, short_code: &str) -> CacheResult<()>;

    /// Atomically reads and deletes the pending click delta.
    async fn take_click_delta(&self, short_code: &str) -> CacheResult<i64>;

    /// Adds `delta` to the pending counter.
    ///
    /// A positive delta returns clicks after a failed write-back; a negative
    /// one settles clicks already written, leaving later increments pending.
    async fn restore_click_delta(&self, short_code: &str, delta: i64) -> CacheResult<()>;

    /// Checks if the cache backend is healthy.
    async fn health_check(&self) -> bool;
}
