//! Shared outbound HTTP client with harmonized defaults.

use once_cell::sync::OnceCell;
use std::time::Duration;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(default)
}

fn connect_timeout() -> Duration {
    Duration::from_secs(env_u64("MEIZAN_HTTP_CONNECT_TIMEOUT_SECS", 3).max(1))
}

fn keepalive() -> Duration {
    Duration::from_secs(env_u64("MEIZAN_HTTP_TCP_KEEPALIVE_SECS", 60).max(1))
}

fn user_agent() -> String {
    format!("meizan-server/{}", env!("CARGO_PKG_VERSION"))
}

/// Base client builder. Apply per-call `.timeout(...)` as needed.
pub fn builder() -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .user_agent(user_agent())
        .connect_timeout(connect_timeout())
        .tcp_keepalive(keepalive())
}

/// Shared default client for data-plane calls (mountain table fetches).
pub fn client() -> &'static reqwest::Client {
    static CLIENT: OnceCell<reqwest::Client> = OnceCell::new();
    CLIENT.get_or_init(|| {
        builder()
            .timeout(Duration::from_secs(env_u64(
                "MEIZAN_HTTP_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )))
            .build()
            .expect("http client")
    })
}

/// Client with a specific total request timeout (model calls).
pub fn client_with_timeout(timeout: Duration) -> reqwest::Client {
    builder().timeout(timeout).build().expect("http client")
}
