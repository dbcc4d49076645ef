//! Application layer: use cases built on the domain traits.
//!
//! - [`services::ShortenerService`] - code creation, resolution, listing
//! - [`services::ClickFlusher`] - click write-back from cache to store
//! - [`rate_limiter::RateLimiter`] - per-client token buckets

pub mod rate_limiter;
pub mod services;
