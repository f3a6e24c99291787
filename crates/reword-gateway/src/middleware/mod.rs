//! Request middleware: access logging and per-client rate limiting.

mod access_log;
mod rate_limit;

use axum::extract::{ConnectInfo, Request};
use std::net::SocketAddr;

pub use access_log::{REQUEST_ID_HEADER, access_log};
pub use rate_limit::{RateLimiter, rate_limit, spawn_sweeper};

/// Identify the caller: the peer address when the server was started with
/// connect info, else the first `x-forwarded-for` hop, else `x-real-ip`.
pub(crate) fn client_key(request: &Request) -> String {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    let headers = request.headers();
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn peer_address_wins() {
        let mut request = Request::builder()
            .header("x-forwarded-for", "10.0.0.9")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 168, 1, 4], 5123))));
        assert_eq!(client_key(&request), "192.168.1.4");
    }

    #[test]
    fn falls_back_to_forwarded_headers() {
        let request = Request::builder()
            .header("x-forwarded-for", "10.0.0.9, 172.16.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_key(&request), "10.0.0.9");

        let request = Request::builder()
            .header("x-real-ip", "10.0.0.7")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_key(&request), "10.0.0.7");

        let request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_key(&request), "unknown");
    }
}
