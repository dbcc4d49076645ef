//! Caching layer for fast redirects and pending click counts.
//!
//! Provides the [`CacheService`] trait and the [`RedisCache`] implementation.
//! Absence of a cache is expressed as `None`, not as a separate type.

mod redis_cache;
mod service;

pub use redis_cache::RedisCache;
pub use service::{CacheError, CacheResult, CacheService};

#[cfg(test)]
pub use service::MockCacheService;
