//! Query parameters for the admin listing.

use serde::Deserialize;

use crate::application::services::shortener_service::DEFAULT_PAGE_SIZE;

/// `?page=&limit=` for `GET /admin/urls`.
///
/// Both are taken as raw strings so that garbage never fails the request:
/// anything that is not an integer falls back to the default, and the
/// service clamps the rest.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub page: Option<String>,

    #[serde(default)]
    pub limit: Option<String>,
}

impl ListParams {
    pub fn page(&self) -> i64 {
        parse_or(self.page.as_deref(), 1)
    }

    pub fn limit(&self) -> i64 {
        parse_or(self.limit.as_deref(), DEFAULT_PAGE_SIZE)
    }
}

fn parse_or(value: Option<&str>, default: i64) -> i64 {
    value
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
