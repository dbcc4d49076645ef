//! Values derived from HTTP request metadata.

use std::net::{IpAddr, SocketAddr};

use axum::http::{HeaderMap, header};
use serde_json::json;

use crate::error::AppError;

/// Returns the `Host` header as sent, port included.
///
/// # Errors
///
/// Returns [`AppError::InvalidInput`] if the header is missing, not ASCII,
/// empty, or contains characters that cannot appear in an authority.
pub fn request_host(headers: &HeaderMap) -> Result<&str, AppError> {
    let host = headers
        .get(header::HOST)
        .ok_or_else(|| AppError::invalid_input("Missing Host header", json!({})))?
        .to_str()
        .map_err(|_| AppError::invalid_input("Invalid Host header", json!({})))?
        .trim();

    if host.is_empty()
        || host
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '/' | '\\' | '@' | '?' | '#'))
    {
        return Err(AppError::invalid_input(
            "Invalid Host header",
            json!({ "host": host }),
        ));
    }

    Ok(host)
}

/// Identifies the client for rate limiting.
///
/// With `behind_proxy`, the first `X-Forwarded-For` entry wins, then
/// `X-Real-IP`; unparsable values are ignored. Otherwise, and as a fallback,
/// the peer address is used. Without any of these every request shares the
/// key `"unknown"`.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, behind_proxy: bool) -> String {
    if behind_proxy {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse::<IpAddr>().ok());

        let real_ip = || {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<IpAddr>().ok())
        };

        if let Some(ip) = forwarded.or_else(real_ip) {
            return ip.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
