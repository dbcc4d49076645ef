//! Redis-backed cache implementation.

use super::service::{CacheError, CacheResult, CacheService};
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tracing::{debug, info, warn};

const URL_KEY_PREFIX: &str = "short:";
const CLICKS_KEY_PREFIX: &str = "clicks:";

/// Redis cache for URL lookups and pending click deltas.
///
/// Uses `ConnectionManager` for connection reuse and transparent reconnects.
/// URL reads and writes are fail-open; click delta operations report errors
/// so the caller can fall back to writing clicks directly.
pub struct RedisCache {
    client: ConnectionManager,
}

impl RedisCache {
    /// Connects to Redis and validates the connection with a PING.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::ConnectionError`] if the URL is invalid, the connection cannot
    /// be established, or the PING health check fails.
    pub async fn connect(redis_url: &str) -> CacheResult<Self> {
        info!("Connecting to Redis");

        let client = Client::open(redis_url).map_err(|e| {
            CacheError::ConnectionError(format!("Failed to create Redis client: {}", e))
        })?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            CacheError::ConnectionError(format!("Failed to connect to Redis: {}", e))
        })?;

        let mut test_conn = manager.clone();
        test_conn
            .ping::<()>()
            .await
            .map_err(|e| CacheError::ConnectionError(format!("Redis PING failed: {}", e)))?;

        info!("Connected to Redis");

        Ok(Self { client: manager })
    }

    fn url_key(short_code: &str) -> String {
        format!("{}{}", URL_KEY_PREFIX, short_code)
    }

    fn clicks_key(short_code: &str) -> String {
        format!("{}{}", CLICKS_KEY_PREFIX, short_code)
    }
}

fn op_error(op: &str, short_code: &str, e: redis::RedisError) -> CacheError {
    warn!("Redis {} error for {}: {}", op, short_code, e);
    CacheError::OperationError(format!("{op} failed: {e}"))
}

#[async_trait]
impl CacheService for RedisCache {
    async fn get_url(&self, short_code: &str) -> CacheResult<Option<String>> {
        let mut conn = self.client.clone();

        match conn.get::<_, Option<String>>(Self::url_key(short_code)).await {
            Ok(Some(url)) => {
                debug!("Cache HIT: {}", short_code);
                Ok(Some(url))
            }
            Ok(None) => {
                debug!("Cache MISS: {}", short_code);
                Ok(None)
            }
            Err(e) => {
                warn!("Redis GET error for {}: {}", short_code, e);
                Ok(None)
            }
        }
    }

    async fn set_url(
        &self,
        short_code: &str,
        original_url: &str,
        ttl_seconds: Option<u64>,
    ) -> CacheResult<()> {
        let key = Self::url_key(short_code);
        let mut conn = self.client.clone();

        let result = match ttl_seconds {
            Some(ttl) => conn.set_ex::<_, _, ()>(&key, original_url, ttl).await,
            None => conn.set::<_, _, ()>(&key, original_url).await,
        };

        match result {
            Ok(()) => {
                debug!("Cache SET: {} (TTL: {:?})", short_code, ttl_seconds);
                Ok(())
            }
            Err(e) => {
                warn!("Redis SET error for {}: {}", short_code, e);
                Ok(())
            }
        }
    }

    async fn increment_click_delta(&self, short_code: &str) -> CacheResult<i64> {
        let mut conn = self.client.clone();
        conn.incr::<_, _, i64>(Self::clicks_key(short_code), 1)
            .await
            .map_err(|e| op_error("INCR", short_code, e))
    }

    async fn get_click_delta(&self, short_code: &str) -> CacheResult<i64> {
        let mut conn = self.client.clone();
        conn.get::<_, Option<i64>>(Self::clicks_key(short_code))
            .await
            .map(|v| v.unwrap_or(0))
            .map_err(|e| op_error("GET", short_code, e))
    }

    async fn clear_click_delta(&self, short_code: &str) -> CacheResult<()> {
        let mut conn = self.client.clone();
        conn.del::<_, i32>(Self::clicks_key(short_code))
            .await
            .map(|_| ())
            .map_err(|e| op_error("DEL", short_code, e))
    }

    async fn take_click_delta(&self, short_code: &str) -> CacheResult<i64> {
        let mut conn = self.client.clone();
        conn.get_del::<_, Option<i64>>(Self::clicks_key(short_code))
            .await
            .map(|v| v.unwrap_or(0))
            .map_err(|e| op_error("GETDEL", short_code, e))
    }

    async fn restore_click_delta(&self, short_code: &str, delta: i64) -> CacheResult<()> {
        let mut conn = self.client.clone();
        conn.incr::<_, _, i64>(Self::clicks_key(short_code), delta)
            .await
            .map(|_| ())
            .map_err(|e| op_error("INCRBY", short_code, e))
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.client.clone();
        conn.ping::<()>().await.is_ok()
    }
}
