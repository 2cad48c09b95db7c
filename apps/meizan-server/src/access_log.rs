//! Client identity extraction and the optional per-request access log.
//!
//! Forwarded headers are attacker-writable on a direct connection, so
//! they only feed the rate-limit key when `MEIZAN_TRUST_FORWARD_HEADERS=1`
//! (deployments sitting behind the platform's edge proxy). Otherwise the
//! socket peer address is used, degrading to `unknown` when the listener
//! attached none.

use axum::extract::{ConnectInfo, MatchedPath};
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;
use once_cell::sync::Lazy;
use std::net::SocketAddr;
use std::time::Instant;

static ENABLED: Lazy<bool> =
    Lazy::new(|| std::env::var("MEIZAN_ACCESS_LOG").ok().as_deref() == Some("1"));
static TRUST_FORWARD: Lazy<bool> = Lazy::new(|| {
    std::env::var("MEIZAN_TRUST_FORWARD_HEADERS").ok().as_deref() == Some("1")
});

fn first_forwarded_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(v) = headers.get("x-forwarded-for").and_then(|h| h.to_str().ok()) {
        let ip = v.split(',').next().unwrap_or("").trim();
        if !ip.is_empty() {
            // strip port if present
            if let Some((host, _)) = ip.rsplit_once(':') {
                if host
                    .chars()
                    .all(|c| c.is_ascii_hexdigit() || c == ':' || c == '.')
                {
                    return Some(host.to_string());
                }
            }
            return Some(ip.to_string());
        }
    }
    if let Some(v) = headers.get("forwarded").and_then(|h| h.to_str().ok()) {
        for part in v.split(';').flat_map(|s| s.split(',')) {
            let part = part.trim();
            if let Some(rest) = part.strip_prefix("for=") {
                let ip = rest.trim_matches('"');
                if !ip.is_empty() {
                    return Some(ip.to_string());
                }
            }
        }
    }
    None
}

fn resolve_client_ip(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_forward: bool,
) -> String {
    let from_peer = peer.map(|p| p.ip().to_string());
    let resolved = if trust_forward {
        first_forwarded_ip(headers).or(from_peer)
    } else {
        from_peer
    };
    resolved.unwrap_or_else(|| "unknown".to_string())
}

/// Caller identity for rate limiting and logging. `peer` is the socket
/// address the listener attached, when there is one.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    resolve_client_ip(headers, peer, *TRUST_FORWARD)
}

pub async fn access_log_mw(req: Request<axum::body::Body>, next: Next) -> Response {
    if !*ENABLED {
        return next.run(req).await;
    }
    let started = Instant::now();
    let method = req.method().clone();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|c| c.0);
    let remote = client_ip(req.headers(), peer);
    let resp = next.run(req).await;
    tracing::info!(
        target: "http.access",
        %method,
        path = %path,
        status = resp.status().as_u16(),
        remote = %remote,
        duration_ms = started.elapsed().as_millis() as u64,
    );
    resp
}
