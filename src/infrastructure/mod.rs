//! Infrastructure layer for external integrations.
//!
//! - [`cache`] - Cache abstraction and Redis implementation
//! - [`persistence`] - PostgreSQL repository implementations

pub mod cache;
pub mod persistence;
