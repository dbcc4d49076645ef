//! Business logic services for the application layer.

pub mod click_flusher;
pub mod shortener_service;

pub use click_flusher::{ClickFlusher, DeltaDrain};
pub use shortener_service::{ShortenerService, ShortenerSettings};
