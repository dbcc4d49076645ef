//! Core domain entities.
//!
//! - [`UrlMapping`] - The single persisted entity: short code to original URL

pub mod url_mapping;

pub use url_mapping::UrlMapping;
