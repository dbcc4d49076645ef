//! Short code creation and resolution.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::application::services::click_flusher::ClickFlusher;
use crate::domain::entities::UrlMapping;
use crate::domain::flush_job::{FlushJob, FlushQueue};
use crate::domain::repositories::MappingRepository;
use crate::error::AppError;
use crate::infrastructure::cache::CacheService;
use crate::telemetry::names;
use crate::utils::code_generator::{self, MAX_ATTEMPTS, MAX_CODE_LENGTH};
use crate::utils::deadline::{best_effort, with_deadline};
use crate::utils::url_validator::validate_url;

/// Page size used when the requested limit is out of range.
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Tunables for [`ShortenerService`].
#[derive(Debug, Clone, Copy)]
pub struct ShortenerSettings {
    /// Length of generated codes, `1..=11`.
    pub code_length: usize,
    /// TTL applied when a resolution repopulates the cache.
    pub cache_ttl_seconds: u64,
    /// Deadline for every store and cache call on the request path.
    pub store_timeout: Duration,
}

impl Default for ShortenerSettings {
    fn default() -> Self {
        Self {
            code_length: 8,
            cache_ttl_seconds: 86_400,
            store_timeout: Duration::from_secs(5),
        }
    }
}

/// Creates and resolves short codes.
///
/// The store is authoritative. The cache is optional and every cache failure
/// degrades to the store path. Clicks are counted off the request path
/// through the flush queue.
pub struct ShortenerService {
    repository: Arc<dyn MappingRepository>,
    cache: Option<Arc<dyn CacheService>>,
    flusher: Arc<ClickFlusher>,
    flush_queue: FlushQueue,
    settings: ShortenerSettings,
}

impl ShortenerService {
    pub fn new(
        repository: Arc<dyn MappingRepository>,
        cache: Option<Arc<dyn CacheService>>,
        flusher: Arc<ClickFlusher>,
        flush_queue: FlushQueue,
        settings: ShortenerSettings,
    ) -> Self {
        Self {
            repository,
            cache,
            flusher,
            flush_queue,
            settings,
        }
    }

    pub fn settings(&self) -> ShortenerSettings {
        self.settings
    }

    pub fn cache(&self) -> Option<&Arc<dyn CacheService>> {
        self.cache.as_ref()
    }

    pub fn flush_queue(&self) -> &FlushQueue {
        &self.flush_queue
    }

    /// Returns the short mapping for `original`, creating it if needed.
    ///
    /// Idempotent: a URL that is already mapped returns its existing mapping.
    /// Otherwise up to [`MAX_ATTEMPTS`] deterministic candidates are tried.
    /// A candidate owned by a different URL is a collision and is skipped; a
    /// unique-constraint conflict on insert means a concurrent writer won the
    /// race and is resolved by re-reading.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidInput`] if `original` is not an absolute http(s) URL
    /// - [`AppError::GenerationExhausted`] if every candidate collides
    /// - [`AppError::Unavailable`] if the store fails or times out
    pub async fn create_short(&self, original: &str) -> Result<UrlMapping, AppError> {
        let original = validate_url(original).map_err(|e| {
            AppError::invalid_input("Invalid URL", json!({ "reason": e.to_string() }))
        })?;

        if let Some(existing) = self.find_by_original(original).await? {
            debug!(code = %existing.short_code, "URL already shortened");
            return Ok(existing);
        }

        for attempt in 0..MAX_ATTEMPTS {
            let code = code_generator::generate(original, self.settings.code_length, attempt);

            match self.find_by_code(&code).await? {
                Some(mapping) if mapping.targets(original) => return Ok(mapping),
                Some(_) => {
                    debug!(code = %code, attempt, "Short code collision");
                    metrics::counter!(names::CODE_COLLISIONS_TOTAL).increment(1);
                    continue;
                }
                None => {}
            }

            match with_deadline(
                self.settings.store_timeout,
                "create",
                self.repository.create(&code, original),
            )
            .await
            {
                Ok(mapping) => {
                    metrics::counter!(names::CODES_CREATED_TOTAL).increment(1);
                    info!(code = %mapping.short_code, "Short code created");
                    self.cache_url(&mapping.short_code, &mapping.original_url, None)
                        .await;
                    return Ok(mapping);
                }
                Err(AppError::Conflict { .. }) => {
                    debug!(code = %code, attempt, "Insert lost a race");
                    if let Some(existing) = self.find_by_original(original).await? {
                        return Ok(existing);
                    }
                }
                Err(e) => return Err(e),
            }
        }

        metrics::counter!(names::GENERATION_EXHAUSTED_TOTAL).increment(1);
        error!(attempts = MAX_ATTEMPTS, "Could not find a free short code");
        Err(AppError::generation_exhausted(
            "Could not generate a unique short code",
            json!({ "attempts": MAX_ATTEMPTS }),
        ))
    }

    /// Resolves `code` to its original URL and records one click.
    ///
    /// The click is recorded in the cache's pending delta when possible and a
    /// flush job is scheduled either way. Neither step can fail the call.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if no mapping exists
    /// - [`AppError::Unavailable`] if the cache missed and the store failed
    pub async fn resolve(&self, code: &str) -> Result<String, AppError> {
        if code.len() > MAX_CODE_LENGTH || !code_generator::is_base62(code) {
            return Err(Self::unknown_code(code));
        }

        if let Some(cache) = &self.cache {
            match best_effort(self.settings.store_timeout, "get_url", cache.get_url(code)).await {
                Some(Ok(Some(url))) => {
                    metrics::counter!(names::CACHE_HITS_TOTAL).increment(1);
                    self.record_click(cache.as_ref(), code).await;
                    return Ok(url);
                }
                Some(Err(e)) => {
                    warn!(code, "Cache lookup failed: {}", e);
                    metrics::counter!(names::CACHE_ERRORS_TOTAL, "op" => "get_url").increment(1);
                }
                Some(Ok(None)) | None => {}
            }
            metrics::counter!(names::CACHE_MISSES_TOTAL).increment(1);
        }

        let mapping = self
            .find_by_code(code)
            .await?
            .ok_or_else(|| Self::unknown_code(code))?;

        match &self.cache {
            Some(cache) => {
                self.cache_url(code, &mapping.original_url, Some(self.settings.cache_ttl_seconds))
                    .await;
                self.record_click(cache.as_ref(), code).await;
            }
            None => {
                self.flush_queue.enqueue(FlushJob::direct(code)).await;
            }
        }

        Ok(mapping.original_url)
    }

    /// Writes pending clicks for `code` to the store now, returning how many
    /// were written.
    ///
    /// # Errors
    ///
    /// Returns the store error if the write fails.
    pub async fn flush_clicks(&self, code: &str) -> Result<i64, AppError> {
        let job = match self.cache {
            Some(_) => FlushJob::cached(code),
            None => FlushJob::direct(code),
        };
        self.flusher.flush_clicks(&job).await
    }

    /// Lists mappings newest first.
    ///
    /// `page` below 1 is treated as 1; `limit` outside `1..=100` falls back to 20.
    pub async fn list(&self, page: i64, limit: i64) -> Result<Vec<UrlMapping>, AppError> {
        let (offset, limit) = page_window(page, limit);
        with_deadline(
            self.settings.store_timeout,
            "list",
            self.repository.list(offset, limit),
        )
        .await
    }

    /// Checks that the store answers within the deadline.
    pub async fn ping_store(&self) -> Result<(), AppError> {
        with_deadline(self.settings.store_timeout, "ping", self.repository.ping()).await
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<UrlMapping>, AppError> {
        with_deadline(
            self.settings.store_timeout,
            "find_by_code",
            self.repository.find_by_code(code),
        )
        .await
    }

    async fn find_by_original(&self, original: &str) -> Result<Option<UrlMapping>, AppError> {
        with_deadline(
            self.settings.store_timeout,
            "find_by_original",
            self.repository.find_by_original(original),
        )
        .await
    }

    async fn cache_url(&self, code: &str, original: &str, ttl_seconds: Option<u64>) {
        let Some(cache) = &self.cache else {
            return;
        };

        match best_effort(
            self.settings.store_timeout,
            "set_url",
            cache.set_url(code, original, ttl_seconds),
        )
        .await
        {
            Some(Ok(())) | None => {}
            Some(Err(e)) => {
                warn!(code, "Failed to cache mapping: {}", e);
                metrics::counter!(names::CACHE_ERRORS_TOTAL, "op" => "set_url").increment(1);
            }
        }
    }

    async fn record_click(&self, cache: &dyn CacheService, code: &str) {
        let job = match best_effort(
            self.settings.store_timeout,
            "increment_click_delta",
            cache.increment_click_delta(code),
        )
        .await
        {
            Some(Ok(_)) => FlushJob::cached(code),
            Some(Err(e)) => {
                warn!(code, "Failed to record click in cache: {}", e);
                metrics::counter!(names::CACHE_ERRORS_TOTAL, "op" => "increment").increment(1);
                FlushJob::direct(code)
            }
            None => FlushJob::direct(code),
        };

        self.flush_queue.enqueue(job).await;
    }

    fn unknown_code(code: &str) -> AppError {
        AppError::not_found("Short code not found", json!({ "code": code }))
    }
}

/// Normalizes a page request into `(offset, limit)`.
pub fn page_window(page: i64, limit: i64) -> (i64, i64) {
    let page = page.max(1);
    let limit = if (1..=MAX_PAGE_SIZE).contains(&limit) {
        limit
    } else {
        DEFAULT_PAGE_SIZE
    };

    ((page - 1).saturating_mul(limit), limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::click_flusher::DeltaDrain;
    use crate::domain::repositories::MockMappingRepository;
    use crate::infrastructure::cache::{CacheError, MockCacheService};
    use chrono::Utc;
    use mockall::predicate::eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    const URL: &str = "https://example.com/a";
    const CODE: &str = "IPhmXSNu";

    fn mapping(id: i64, code: &str, url: &str) -> UrlMapping {
        UrlMapping::new(id, code.to_string(), url.to_string(), Utc::now())
    }

    fn service(
        repo: MockMappingRepository,
        cache: Option<MockCacheService>,
    ) -> (ShortenerService, mpsc::Receiver<FlushJob>) {
        let repo: Arc<dyn MappingRepository> = Arc::new(repo);
        let cache = cache.map(|c| Arc::new(c) as Arc<dyn CacheService>);
        let flusher = Arc::new(ClickFlusher::new(
            repo.clone(),
            cache.clone(),
            Duration::from_secs(1),
            DeltaDrain::Take,
        ));
        let (queue, rx) = FlushQueue::new(16);
        let service = ShortenerService::new(repo, cache, flusher, queue, ShortenerSettings::default());
        (service, rx)
    }

    #[tokio::test]
    async fn test_create_short_inserts_first_candidate() {
        let mut repo = MockMappingRepository::new();
        repo.expect_find_by_original()
            .with(eq(URL))
            .times(1)
            .returning(|_| Ok(None));
        repo.expect_find_by_code()
            .with(eq(CODE))
            .times(1)
            .returning(|_| Ok(None));
        repo.expect_create()
            .with(eq(CODE), eq(URL))
            .times(1)
            .returning(|code, url| Ok(mapping(1, code, url)));

        let mut cache = MockCacheService::new();
        cache
            .expect_set_url()
            .with(eq(CODE), eq(URL), eq(None))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let (service, _rx) = service(repo, Some(cache));
        let created = service.create_short(URL).await.unwrap();

        assert_eq!(created.short_code, CODE);
        assert_eq!(created.original_url, URL);
    }

    #[tokio::test]
    async fn test_create_short_is_idempotent() {
        let mut repo = MockMappingRepository::new();
        repo.expect_find_by_original()
            .returning(|url| Ok(Some(mapping(7, CODE, url))));
        repo.expect_create().times(0);

        let (service, _rx) = service(repo, None);
        let existing = service.create_short(URL).await.unwrap();

        assert_eq!(existing.id, 7);
    }

    #[tokio::test]
    async fn test_create_short_trims_input() {
        let mut repo = MockMappingRepository::new();
        repo.expect_find_by_original()
            .with(eq(URL))
            .times(1)
            .returning(|_| Ok(None));
        repo.expect_find_by_code().returning(|_| Ok(None));
        repo.expect_create()
            .with(eq(CODE), eq(URL))
            .returning(|code, url| Ok(mapping(1, code, url)));

        let (service, _rx) = service(repo, None);
        let created = service.create_short("  https://example.com/a \n").await.unwrap();

        assert_eq!(created.original_url, URL);
    }

    #[tokio::test]
    async fn test_create_short_skips_collision() {
        let mut repo = MockMappingRepository::new();
        repo.expect_find_by_original().returning(|_| Ok(None));
        repo.expect_find_by_code()
            .with(eq(CODE))
            .returning(|code| Ok(Some(mapping(1, code, "https://other.example/"))));
        repo.expect_find_by_code()
            .with(eq("kAVlNwvB"))
            .returning(|_| Ok(None));
        repo.expect_create()
            .with(eq("kAVlNwvB"), eq(URL))
            .times(1)
            .returning(|code, url| Ok(mapping(2, code, url)));

        let (service, _rx) = service(repo, None);
        let created = service.create_short(URL).await.unwrap();

        assert_eq!(created.short_code, "kAVlNwvB");
    }

    #[tokio::test]
    async fn test_create_short_returns_candidate_already_owned() {
        let mut repo = MockMappingRepository::new();
        repo.expect_find_by_original().returning(|_| Ok(None));
        repo.expect_find_by_code()
            .returning(|code| Ok(Some(mapping(3, code, URL))));
        repo.expect_create().times(0);

        let (service, _rx) = service(repo, None);
        let mapping = service.create_short(URL).await.unwrap();

        assert_eq!(mapping.id, 3);
    }

    #[tokio::test]
    async fn test_create_short_conflict_rereads_original() {
        let lookups = Arc::new(AtomicUsize::new(0));
        let seen = lookups.clone();

        let mut repo = MockMappingRepository::new();
        repo.expect_find_by_original()
            .times(2)
            .returning(move |url| match seen.fetch_add(1, Ordering::SeqCst) {
                0 => Ok(None),
                _ => Ok(Some(mapping(9, CODE, url))),
            });
        repo.expect_find_by_code().returning(|_| Ok(None));
        repo.expect_create()
            .times(1)
            .returning(|_, _| Err(AppError::conflict("taken", json!({}))));

        let (service, _rx) = service(repo, None);
        let mapping = service.create_short(URL).await.unwrap();

        assert_eq!(mapping.id, 9);
        assert_eq!(lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_create_short_exhaustion() {
        let mut repo = MockMappingRepository::new();
        repo.expect_find_by_original().returning(|_| Ok(None));
        repo.expect_find_by_code()
            .times(MAX_ATTEMPTS)
            .returning(|code| Ok(Some(mapping(1, code, "https://other.example/"))));
        repo.expect_create().times(0);

        let (service, _rx) = service(repo, None);
        let result = service.create_short(URL).await;

        assert!(matches!(result, Err(AppError::GenerationExhausted { .. })));
    }

    #[tokio::test]
    async fn test_create_short_rejects_invalid_url() {
        let mut repo = MockMappingRepository::new();
        repo.expect_find_by_original().times(0);
        repo.expect_create().times(0);

        let (service, _rx) = service(repo, None);

        for input in ["", "   ", "not a url", "ftp://example.com/file"] {
            let result = service.create_short(input).await;
            assert!(matches!(result, Err(AppError::InvalidInput { .. })), "{input}");
        }
    }

    #[tokio::test]
    async fn test_create_short_surfaces_store_failure() {
        let mut repo = MockMappingRepository::new();
        repo.expect_find_by_original().returning(|_| Ok(None));
        repo.expect_find_by_code().returning(|_| Ok(None));
        repo.expect_create()
            .times(1)
            .returning(|_, _| Err(AppError::unavailable("down", json!({}))));

        let (service, _rx) = service(repo, None);
        let result = service.create_short(URL).await;

        assert!(matches!(result, Err(AppError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn test_resolve_cache_hit_skips_store() {
        let mut repo = MockMappingRepository::new();
        repo.expect_find_by_code().times(0);

        let mut cache = MockCacheService::new();
        cache
            .expect_get_url()
            .with(eq(CODE))
            .returning(|_| Ok(Some(URL.to_string())));
        cache
            .expect_increment_click_delta()
            .with(eq(CODE))
            .times(1)
            .returning(|_| Ok(1));

        let (service, mut rx) = service(repo, Some(cache));
        let url = service.resolve(CODE).await.unwrap();

        assert_eq!(url, URL);
        assert_eq!(rx.try_recv().unwrap(), FlushJob::cached(CODE));
    }

    #[tokio::test]
    async fn test_resolve_cache_miss_populates_with_ttl() {
        let mut repo = MockMappingRepository::new();
        repo.expect_find_by_code()
            .with(eq(CODE))
            .returning(|code| Ok(Some(mapping(1, code, URL))));

        let mut cache = MockCacheService::new();
        cache.expect_get_url().returning(|_| Ok(None));
        cache
            .expect_set_url()
            .with(eq(CODE), eq(URL), eq(Some(86_400)))
            .times(1)
            .returning(|_, _, _| Ok(()));
        cache.expect_increment_click_delta().returning(|_| Ok(1));

        let (service, mut rx) = service(repo, Some(cache));
        let url = service.resolve(CODE).await.unwrap();

        assert_eq!(url, URL);
        assert_eq!(rx.try_recv().unwrap(), FlushJob::cached(CODE));
    }

    #[tokio::test]
    async fn test_resolve_cache_failure_falls_back_to_store() {
        let mut repo = MockMappingRepository::new();
        repo.expect_find_by_code()
            .returning(|code| Ok(Some(mapping(1, code, URL))));

        let mut cache = MockCacheService::new();
        cache
            .expect_get_url()
            .returning(|_| Err(CacheError::ConnectionError("refused".to_string())));
        cache
            .expect_set_url()
            .returning(|_, _, _| Err(CacheError::ConnectionError("refused".to_string())));
        cache
            .expect_increment_click_delta()
            .returning(|_| Err(CacheError::ConnectionError("refused".to_string())));

        let (service, mut rx) = service(repo, Some(cache));
        let url = service.resolve(CODE).await.unwrap();

        assert_eq!(url, URL);
        assert_eq!(rx.try_recv().unwrap(), FlushJob::direct(CODE));
    }

    #[tokio::test]
    async fn test_resolve_without_cache_schedules_direct_job() {
        let mut repo = MockMappingRepository::new();
        repo.expect_find_by_code()
            .returning(|code| Ok(Some(mapping(1, code, URL))));

        let (service, mut rx) = service(repo, None);
        service.resolve(CODE).await.unwrap();

        assert_eq!(rx.try_recv().unwrap(), FlushJob::direct(CODE));
    }

    #[tokio::test]
    async fn test_resolve_unknown_code() {
        let mut repo = MockMappingRepository::new();
        repo.expect_find_by_code().returning(|_| Ok(None));

        let (service, mut rx) = service(repo, None);
        let result = service.resolve("zzzzzzzz").await;

        assert!(matches!(result, Err(AppError::NotFound { .. })));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_resolve_rejects_malformed_code_without_lookup() {
        let mut repo = MockMappingRepository::new();
        repo.expect_find_by_code().times(0);

        let (service, _rx) = service(repo, None);

        for code in ["", "favicon.ico", "abc-def", "aaaaaaaaaaaa"] {
            assert!(matches!(
                service.resolve(code).await,
                Err(AppError::NotFound { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_resolve_store_failure_is_unavailable() {
        let mut repo = MockMappingRepository::new();
        repo.expect_find_by_code()
            .returning(|_| Err(AppError::unavailable("down", json!({}))));

        let (service, _rx) = service(repo, None);
        let result = service.resolve(CODE).await;

        assert!(matches!(result, Err(AppError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn test_flush_clicks_delegates_to_flusher() {
        let mut repo = MockMappingRepository::new();
        repo.expect_increment_clicks()
            .with(eq(CODE), eq(1))
            .times(1)
            .returning(|_, _| Ok(()));

        let (service, _rx) = service(repo, None);
        assert_eq!(service.flush_clicks(CODE).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_clamps_arguments() {
        let mut repo = MockMappingRepository::new();
        repo.expect_list()
            .with(eq(0), eq(DEFAULT_PAGE_SIZE))
            .times(1)
            .returning(|_, _| Ok(vec![]));

        let (service, _rx) = service(repo, None);
        assert!(service.list(0, 1000).await.unwrap().is_empty());
    }

    #[test]
    fn test_page_window() {
        assert_eq!(page_window(1, 20), (0, 20));
        assert_eq!(page_window(3, 10), (20, 10));
        assert_eq!(page_window(0, 10), (0, 10));
        assert_eq!(page_window(-5, 10), (0, 10));
        assert_eq!(page_window(2, 0), (20, 20));
        assert_eq!(page_window(2, 101), (20, 20));
        assert_eq!(page_window(1, 100), (0, 100));
        assert_eq!(page_window(i64::MAX, 100).1, 100);
    }
}
