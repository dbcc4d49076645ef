//! REST API layer for HTTP request/response handling.
//!
//! Thin adapter over [`crate::application::services::ShortenerService`].
//!
//! # Modules
//!
//! - [`dto`] - Request/response bodies and query parameters
//! - [`handlers`] - HTTP request handlers
//! - [`middleware`] - Admin authentication, rate limiting, tracing
//! - [`routes`] - Route tables

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;
