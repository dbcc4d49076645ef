//! Per-key rate limiter on top of `governor`.
//!
//! State is process-local: buckets are not shared between replicas and stale
//! keys are never evicted. Both are accepted limitations of this limiter.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::Quota;
use governor::clock::{Clock, DefaultClock};
use governor::middleware::NoOpMiddleware;
use governor::state::keyed::DashMapStateStore;

type KeyedLimiter<C> =
    governor::RateLimiter<String, DashMapStateStore<String>, C, NoOpMiddleware<<C as Clock>::Instant>>;

/// Refill rate and capacity shared by every bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitConfig {
    /// Tokens added per second. Fractional rates are allowed.
    pub rate_per_second: f64,
    /// Maximum tokens a bucket can hold.
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            rate_per_second: 1.0,
            burst: 10,
        }
    }
}

impl RateLimitConfig {
    /// Converts the rate into a `governor` quota of one token per period.
    ///
    /// A burst of zero is raised to one; a rate too high to express as a
    /// whole number of nanoseconds replenishes every nanosecond.
    pub fn quota(&self) -> Quota {
        let burst = NonZeroU32::new(self.burst).unwrap_or(NonZeroU32::MIN);
        let period = Duration::try_from_secs_f64(1.0 / self.rate_per_second)
            .unwrap_or(Duration::MAX)
            .max(Duration::from_nanos(1));

        Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MAX))
            .allow_burst(burst)
    }
}

/// Token bucket limiter keyed by client identity.
///
/// Buckets live in a `DashMap` keyed by client, so callers with different
/// keys never contend on one lock. A key seen for the first time has a full
/// bucket: it is admitted and left with `burst - 1` tokens.
pub struct RateLimiter<C: Clock = DefaultClock> {
    config: RateLimitConfig,
    limiter: KeyedLimiter<C>,
}

impl RateLimiter {
    /// Creates a limiter driven by the default monotonic clock.
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, DefaultClock::default())
    }
}

impl<C: Clock> RateLimiter<C> {
    /// Creates a limiter driven by `clock`.
    pub fn with_clock(config: RateLimitConfig, clock: C) -> Self {
        Self {
            config,
            limiter: governor::RateLimiter::dashmap_with_clock(config.quota(), clock),
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Decides whether a request for `key` may proceed, consuming a token if so.
    pub fn allow(&self, key: &str) -> bool {
        self.limiter.check_key(&key.to_owned()).is_ok()
    }

    /// Number of keys with a bucket.
    pub fn tracked_keys(&self) -> usize {
        self.limiter.len()
    }
}
