//! HTTP middleware for request processing and protection.
//!
//! Provides admin authentication, per-client rate limiting, and request tracing.

pub mod admin_auth;
pub mod rate_limit;
pub mod tracing;
