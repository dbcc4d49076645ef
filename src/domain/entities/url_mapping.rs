//! URL mapping entity.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A persisted mapping between a short code and an original URL.
///
/// `short_code` and `original_url` are each unique across all mappings.
/// `click_count` is authoritative here and only ever grows; `last_accessed_at`
/// is set whenever clicks are written back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlMapping {
    pub id: i64,
    pub short_code: String,
    pub original_url: String,
    pub click_count: i64,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_accessed_at: Option<DateTime<Utc>>,
}

impl UrlMapping {
    /// Creates a freshly inserted mapping with no clicks.
    pub fn new(id: i64, short_code: String, original_url: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            short_code,
            original_url,
            click_count: 0,
            created_at,
            last_accessed_at: None,
        }
    }

    /// Returns true if this mapping points at `original`.
    pub fn targets(&self, original: &str) -> bool {
        self.original_url == original
    }
}
