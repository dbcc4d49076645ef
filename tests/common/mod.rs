#![allow(dead_code)]

use async_trait::async_trait;
use axum::extract::ConnectInfo;
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::json;
use shortcode_service::application::rate_limiter::{RateLimitConfig, RateLimiter};
use shortcode_service::application::services::{
    ClickFlusher, DeltaDrain, ShortenerService, ShortenerSettings,
};
use shortcode_service::domain::entities::UrlMapping;
use shortcode_service::domain::flush_job::{FlushJob, FlushQueue};
use shortcode_service::domain::flush_worker::FlushHandler;
use shortcode_service::domain::repositories::MappingRepository;
use shortcode_service::error::AppError;
use shortcode_service::infrastructure::cache::{CacheError, CacheResult, CacheService};
use shortcode_service::state::AppState;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tower::Layer;

pub const HOST: &str = "sho.rt";

/// In-memory store enforcing both uniqueness constraints.
#[derive(Default)]
pub struct MemoryRepository {
    rows: Mutex<Vec<UrlMapping>>,
    unavailable: AtomicBool,
}

impl MemoryRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Inserts a row directly, bypassing code generation.
    pub fn seed(&self, code: &str, original: &str) {
        let mut rows = self.rows.lock().unwrap();
        let id = rows.len() as i64 + 1;
        rows.push(UrlMapping::new(
            id,
            code.to_string(),
            original.to_string(),
            Utc::now() + ChronoDuration::microseconds(id),
        ));
    }

    pub fn clicks(&self, code: &str) -> i64 {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.short_code == code)
            .map(|m| m.click_count)
            .unwrap_or(0)
    }

    pub fn count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), AppError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::unavailable("Database unavailable", json!({})));
        }
        Ok(())
    }
}

#[async_trait]
impl MappingRepository for MemoryRepository {
    async fn find_by_code(&self, code: &str) -> Result<Option<UrlMapping>, AppError> {
        self.check()?;
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|m| m.short_code == code).cloned())
    }

    async fn find_by_original(&self, original: &str) -> Result<Option<UrlMapping>, AppError> {
        self.check()?;
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|m| m.original_url == original).cloned())
    }

    async fn create(&self, code: &str, original: &str) -> Result<UrlMapping, AppError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        if rows
            .iter()
            .any(|m| m.short_code == code || m.original_url == original)
        {
            return Err(AppError::conflict("Unique constraint violation", json!({})));
        }

        let id = rows.len() as i64 + 1;
        let mapping = UrlMapping::new(
            id,
            code.to_string(),
            original.to_string(),
            Utc::now() + ChronoDuration::microseconds(id),
        );
        rows.push(mapping.clone());
        Ok(mapping)
    }

    async fn increment_clicks(&self, code: &str, delta: i64) -> Result<(), AppError> {
        self.check()?;
        if delta < 1 {
            return Err(AppError::invalid_input("delta must be positive", json!({})));
        }

        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|m| m.short_code == code)
            .ok_or_else(|| AppError::not_found("Short code not found", json!({})))?;
        row.click_count += delta;
        row.last_accessed_at = Some(Utc::now());
        Ok(())
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<UrlMapping>, AppError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap().clone();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(rows
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.check()
    }
}

/// In-memory cache with a switch to make every call fail.
#[derive(Default)]
pub struct MemoryCache {
    urls: Mutex<HashMap<String, (String, Option<u64>)>>,
    deltas: Mutex<HashMap<String, i64>>,
    failing: AtomicBool,
}

impl MemoryCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn pending(&self, code: &str) -> i64 {
        self.deltas.lock().unwrap().get(code).copied().unwrap_or(0)
    }

    pub fn cached(&self, code: &str) -> Option<(String, Option<u64>)> {
        self.urls.lock().unwrap().get(code).cloned()
    }

    fn check(&self) -> CacheResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CacheError::ConnectionError("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheService for MemoryCache {
    async fn get_url(&self, short_code: &str) -> CacheResult<Option<String>> {
        self.check()?;
        Ok(self
            .urls
            .lock()
            .unwrap()
            .get(short_code)
            .map(|(url, _)| url.clone()))
    }

    async fn set_url(
        &self,
        short_code: &str,
        original_url: &str,
        ttl_seconds: Option<u64>,
    ) -> CacheResult<()> {
        self.check()?;
        self.urls
            .lock()
            .unwrap()
            .insert(short_code.to_string(), (original_url.to_string(), ttl_seconds));
        Ok(())
    }

    async fn increment_click_delta(&self, short_code: &str) -> CacheResult<i64> {
        self.check()?;
        let mut deltas = self.deltas.lock().unwrap();
        let value = deltas.entry(short_code.to_string()).or_insert(0);
        *value += 1;
        Ok(*value)
    }

    async fn get_click_delta(&self, short_code: &str) -> CacheResult<i64> {
        self.check()?;
        Ok(self.pending(short_code))
    }

    async fn clear_click_delta(&self, short_code: &str) -> CacheResult<()> {
        self.check()?;
        self.deltas.lock().unwrap().remove(short_code);
        Ok(())
    }

    async fn take_click_delta(&self, short_code: &str) -> CacheResult<i64> {
        self.check()?;
        Ok(self.deltas.lock().unwrap().remove(short_code).unwrap_or(0))
    }

    async fn restore_click_delta(&self, short_code: &str, delta: i64) -> CacheResult<()> {
        self.check()?;
        *self
            .deltas
            .lock()
            .unwrap()
            .entry(short_code.to_string())
            .or_insert(0) += delta;
        Ok(())
    }

    async fn health_check(&self) -> bool {
        !self.failing.load(Ordering::SeqCst)
    }
}

/// A service wired to in-memory backends, with the flush queue receiver
/// kept so tests decide when jobs run.
pub struct TestContext {
    pub repo: Arc<MemoryRepository>,
    pub cache: Option<Arc<MemoryCache>>,
    pub flusher: Arc<ClickFlusher>,
    pub service: Arc<ShortenerService>,
    pub flush_rx: mpsc::Receiver<FlushJob>,
}

impl TestContext {
    pub fn new(with_cache: bool) -> Self {
        Self::with_queue_capacity(with_cache, 1024)
    }

    pub fn with_queue_capacity(with_cache: bool, capacity: usize) -> Self {
        let repo = MemoryRepository::new();
        let cache = with_cache.then(MemoryCache::new);

        let repository: Arc<dyn MappingRepository> = repo.clone();
        let cache_service = cache.clone().map(|c| c as Arc<dyn CacheService>);

        let flusher = Arc::new(ClickFlusher::new(
            repository.clone(),
            cache_service.clone(),
            Duration::from_secs(1),
            DeltaDrain::Take,
        ));

        let (queue, flush_rx) = FlushQueue::new(capacity);
        let service = Arc::new(ShortenerService::new(
            repository,
            cache_service,
            flusher.clone(),
            queue,
            ShortenerSettings {
                code_length: 8,
                cache_ttl_seconds: 86_400,
                store_timeout: Duration::from_secs(1),
            },
        ));

        Self {
            repo,
            cache,
            flusher,
            service,
            flush_rx,
        }
    }

    /// Runs every queued flush job to completion, returning how many ran.
    pub async fn drain_flushes(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.flush_rx.try_recv() {
            self.flusher.flush(job).await;
            ran += 1;
        }
        ran
    }

    pub fn state(&self, rate: RateLimitConfig) -> AppState {
        AppState::new(self.service.clone(), Arc::new(RateLimiter::new(rate)))
    }
}

/// Rate limit generous enough never to interfere.
pub fn unlimited() -> RateLimitConfig {
    RateLimitConfig {
        rate_per_second: 1000.0,
        burst: 10_000,
    }
}

/// Inserts a fixed peer address, standing in for
/// `into_make_service_with_connect_info`.
#[derive(Clone)]
pub struct MockConnectInfoLayer(pub SocketAddr);

impl Default for MockConnectInfoLayer {
    fn default() -> Self {
        Self("127.0.0.1:12345".parse().unwrap())
    }
}

impl<S> Layer<S> for MockConnectInfoLayer {
    type Service = MockConnectInfoService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MockConnectInfoService {
            inner,
            addr: self.0,
        }
    }
}

#[derive(Clone)]
pub struct MockConnectInfoService<S> {
    inner: S,
    addr: SocketAddr,
}

impl<S, B> tower::Service<axum::http::Request<B>> for MockConnectInfoService<S>
where
    S: tower::Service<axum::http::Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        req.extensions_mut().insert(ConnectInfo(self.addr));
        self.inner.call(req)
    }
}

/// Test server over the full router with a mocked peer address.
pub fn test_server(state: AppState) -> axum_test::TestServer {
    let app = shortcode_service::routes::router(state).layer(MockConnectInfoLayer::default());
    axum_test::TestServer::new(app).unwrap()
}
