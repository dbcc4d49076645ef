//! Logging setup and metric names.
//!
//! Counters are recorded through the `metrics` facade; they are no-ops until
//! the embedding process installs a recorder.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Metric names as constants for consistency.
pub mod names {
    pub const CODES_CREATED_TOTAL: &str = "shortener_codes_created_total";
    pub const CODE_COLLISIONS_TOTAL: &str = "shortener_code_collisions_total";
    pub const GENERATION_EXHAUSTED_TOTAL: &str = "shortener_generation_exhausted_total";

    pub const CACHE_HITS_TOTAL: &str = "shortener_cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "shortener_cache_misses_total";
    pub const CACHE_ERRORS_TOTAL: &str = "shortener_cache_errors_total";

    pub const CLICKS_FLUSHED_TOTAL: &str = "shortener_clicks_flushed_total";
    pub const FLUSH_FAILURES_TOTAL: &str = "shortener_flush_failures_total";
    pub const FLUSH_JOBS_DROPPED_TOTAL: &str = "shortener_flush_jobs_dropped_total";

    pub const RATE_LIMITED_TOTAL: &str = "shortener_rate_limited_total";
}

/// Installs the global tracing subscriber.
///
/// `log_format` is `text` or `json`; `log_level` is an `EnvFilter` directive
/// used when `RUST_LOG` is not set.
pub fn init_tracing(log_level: &str, log_format: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(log_level))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if log_format == "json" {
        builder
            .json()
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;
    } else {
        builder
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;
    }

    Ok(())
}
