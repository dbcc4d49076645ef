//! Data Transfer Objects for API requests and responses.
//!
//! Request bodies are validated with `validator` before they reach the
//! service. Mappings are returned as [`crate::domain::entities::UrlMapping`]
//! directly.

pub mod health;
pub mod pagination;
pub mod shorten;
