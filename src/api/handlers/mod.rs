//! HTTP request handlers.

pub mod admin_urls;
pub mod health;
pub mod redirect;
pub mod shorten;

pub use admin_urls::list_urls_handler;
pub use health::health_handler;
pub use redirect::redirect_handler;
pub use shorten::shorten_handler;
