//! Repository trait for URL mappings (the durable store).

use crate::domain::entities::UrlMapping;
use crate::error::AppError;
use async_trait::async_trait;

/// Durable store of URL mappings.
///
/// The store owns the authoritative record and enforces uniqueness of both
/// `short_code` and `original_url` itself; concurrent writers rely on that
/// rather than on any locking in the service.
///
/// Deadlines are applied by callers: dropping a returned future cancels the
/// call.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgMappingRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MappingRepository: Send + Sync {
    /// Finds a mapping by short code.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unavailable`] on connectivity failures.
    async fn find_by_code(&self, code: &str) -> Result<Option<UrlMapping>, AppError>;

    /// Finds a mapping by its original URL.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unavailable`] on connectivity failures.
    async fn find_by_original(&self, original: &str) -> Result<Option<UrlMapping>, AppError>;

    /// Atomically inserts a new mapping.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if another mapping already holds `code`
    /// or `original`. Never overwrites.
    async fn create(&self, code: &str, original: &str) -> Result<UrlMapping, AppError>;

    /// Adds `delta` clicks and stamps `last_accessed_at` in one update.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no mapping has `code`.
    /// Returns [`AppError::InvalidInput`] if `delta < 1`.
    async fn increment_clicks(&self, code: &str, delta: i64) -> Result<(), AppError>;

    /// Lists mappings newest first.
    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<UrlMapping>, AppError>;

    /// Checks store connectivity.
    async fn ping(&self) -> Result<(), AppError>;
}
