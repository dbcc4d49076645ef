//! Shared application state injected into every handler.

use std::sync::Arc;

use crate::application::rate_limiter::RateLimiter;
use crate::application::services::ShortenerService;

/// Handler state. Cheap to clone.
///
/// Holds the only long-lived handles to the flush queue besides the worker's
/// receiver; dropping every clone closes the queue.
#[derive(Clone)]
pub struct AppState {
    pub shortener: Arc<ShortenerService>,
    pub rate_limiter: Arc<RateLimiter>,
    /// Expected `X-Admin-Token`. `None` rejects every admin request.
    pub admin_token: Option<Arc<str>>,
    /// Build `http://` short URLs instead of `https://`.
    pub dev_http: bool,
    /// Take client IPs from forwarding headers.
    pub behind_proxy: bool,
}

impl AppState {
    pub fn new(shortener: Arc<ShortenerService>, rate_limiter: Arc<RateLimiter>) -> Self {
        Self {
            shortener,
            rate_limiter,
            admin_token: None,
            dev_http: false,
            behind_proxy: false,
        }
    }

    pub fn with_admin_token(mut self, token: Option<String>) -> Self {
        self.admin_token = token.map(Arc::from);
        self
    }

    pub fn with_dev_http(mut self, dev_http: bool) -> Self {
        self.dev_http = dev_http;
        self
    }

    pub fn with_behind_proxy(mut self, behind_proxy: bool) -> Self {
        self.behind_proxy = behind_proxy;
        self
    }

    /// Scheme used when building short URLs.
    pub fn scheme(&self) -> &'static str {
        if self.dev_http { "http" } else { "https" }
    }
}
