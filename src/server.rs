//! HTTP server initialization and runtime setup.
//!
//! Handles database connections, cache setup, the flush worker, and the Axum
//! server lifecycle including graceful shutdown.

use crate::application::rate_limiter::{RateLimitConfig, RateLimiter};
use crate::application::services::{ClickFlusher, DeltaDrain, ShortenerService, ShortenerSettings};
use crate::config::Config;
use crate::domain::flush_job::FlushQueue;
use crate::domain::flush_worker::run_flush_worker;
use crate::domain::repositories::MappingRepository;
use crate::infrastructure::cache::{CacheService, RedisCache};
use crate::infrastructure::persistence::PgMappingRepository;
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};

/// Attempts made to reach the database at startup.
const DB_CONNECT_ATTEMPTS: usize = 5;

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool (retried with backoff) and migrations
/// - Redis cache, or no cache when unset or unreachable
/// - Background flush worker
/// - Axum HTTP server
///
/// On SIGINT/SIGTERM the server stops accepting connections and finishes
/// in-flight requests. Dropping the router closes the flush queue; the worker
/// then drains the remaining jobs, bounded by `SHUTDOWN_DRAIN_SECS`.
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let pool = connect_database(&config).await?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let cache = connect_cache(&config).await;

    let repository: Arc<dyn MappingRepository> = Arc::new(PgMappingRepository::new(Arc::new(pool)));

    let drain = if config.flush_atomic_take {
        DeltaDrain::Take
    } else {
        DeltaDrain::ReadThenClear
    };
    let flusher = Arc::new(ClickFlusher::new(
        repository.clone(),
        cache.clone(),
        config.flush_timeout(),
        drain,
    ));

    let (flush_queue, flush_rx) = FlushQueue::new(config.flush_queue_capacity);
    let worker = tokio::spawn(run_flush_worker(
        flush_rx,
        flusher.clone(),
        config.flush_worker_concurrency,
    ));

    let shortener = Arc::new(ShortenerService::new(
        repository,
        cache,
        flusher,
        flush_queue,
        ShortenerSettings {
            code_length: config.short_code_length,
            cache_ttl_seconds: config.cache_ttl_seconds,
            store_timeout: config.store_timeout(),
        },
    ));

    let rate_limiter = Arc::new(RateLimiter::new(RateLimitConfig {
        rate_per_second: config.rate_limit_per_second,
        burst: config.rate_limit_burst,
    }));

    let state = AppState::new(shortener, rate_limiter)
        .with_admin_token(config.admin_token.clone())
        .with_dev_http(config.dev_http)
        .with_behind_proxy(config.behind_proxy);

    let app = app_router(state);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped, draining pending click flushes");
    match tokio::time::timeout(config.shutdown_drain(), worker).await {
        Ok(Ok(())) => tracing::info!("Flush worker drained"),
        Ok(Err(e)) => tracing::error!("Flush worker panicked: {}", e),
        Err(_) => tracing::warn!(
            timeout_secs = config.shutdown_drain_secs,
            "Flush worker did not drain in time; pending cache deltas are kept for the next run"
        ),
    }

    Ok(())
}

async fn connect_database(config: &Config) -> Result<PgPool> {
    let options = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime));

    let strategy = ExponentialBackoff::from_millis(10)
        .factor(50)
        .max_delay(Duration::from_secs(5))
        .map(jitter)
        .take(DB_CONNECT_ATTEMPTS - 1);

    Retry::spawn(strategy, || {
        let options = options.clone();
        async move {
            options.connect(&config.database_url).await.inspect_err(|e| {
                tracing::warn!("Database connection failed: {}", e);
            })
        }
    })
    .await
    .context("Failed to connect to database")
}

async fn connect_cache(config: &Config) -> Option<Arc<dyn CacheService>> {
    let Some(redis_url) = &config.redis_url else {
        tracing::info!("Cache disabled");
        return None;
    };

    match RedisCache::connect(redis_url).await {
        Ok(redis) => {
            tracing::info!("Cache enabled (Redis)");
            Some(Arc::new(redis) as Arc<dyn CacheService>)
        }
        Err(e) => {
            tracing::warn!("Failed to connect to Redis: {}. Running without cache.", e);
            None
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
