// crates/live/src/config.rs
//! Update channel configuration.

use std::time::Duration;

use jobwatch_types::DEFAULT_API_URL;

/// Path of the progress hub, relative to the server root.
const HUB_PATH: &str = "/jobProgressHub";

/// Configuration for an [`UpdateChannelClient`](crate::UpdateChannelClient).
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Hub endpoint. `http(s)://` is accepted and rewritten to `ws(s)://`.
    pub hub_url: String,
    /// Invocation target carrying progress events (matched case-insensitively).
    pub event_name: String,
    /// Wait after a failed connect/handshake before trying again.
    pub connect_retry_delay: Duration,
    /// Wait after an established connection drops before reconnecting.
    pub reconnect_delay: Duration,
    /// Upper bound for the socket connect plus hub handshake.
    pub handshake_timeout: Duration,
    /// How often the client pings the hub.
    pub keepalive_interval: Duration,
    /// Silence from the hub longer than this drops the connection.
    pub server_timeout: Duration,
    /// Capacity of the progress event broadcast channel.
    pub broadcast_capacity: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            hub_url: hub_url_from_api(DEFAULT_API_URL),
            event_name: "JobStatusUpdate".into(),
            connect_retry_delay: Duration::from_secs(5),
            reconnect_delay: Duration::from_secs(3),
            handshake_timeout: Duration::from_secs(15),
            keepalive_interval: Duration::from_secs(15),
            server_timeout: Duration::from_secs(30),
            broadcast_capacity: 256,
        }
    }
}

impl ChannelConfig {
    pub fn with_hub_url(mut self, hub_url: impl Into<String>) -> Self {
        self.hub_url = hub_url.into();
        self
    }
}

/// Derive the hub URL from the REST API base: drop a trailing `/api`,
/// append the hub path and switch to the WebSocket scheme.
///
/// `http://localhost:5000/api` becomes `ws://localhost:5000/jobProgressHub`.
pub fn hub_url_from_api(api_url: &str) -> String {
    let base = api_url.trim_end_matches('/');
    let base = base.strip_suffix("/api").unwrap_or(base);
    to_ws_scheme(&format!("{base}{HUB_PATH}"))
}

/// Rewrite `http://` / `https://` to `ws://` / `wss://`; anything else is
/// returned unchanged.
pub fn to_ws_scheme(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hub_url_from_api() {
        assert_eq!(
            hub_url_from_api("http://localhost:5000/api"),
            "ws://localhost:5000/jobProgressHub"
        );
        assert_eq!(
            hub_url_from_api("https://jobs.example.com/api/"),
            "wss://jobs.example.com/jobProgressHub"
        );
        assert_eq!(
            hub_url_from_api("http://10.0.0.2:8080"),
            "ws://10.0.0.2:8080/jobProgressHub"
        );
    }

    #[test]
    fn test_ws_urls_pass_through() {
        assert_eq!(to_ws_scheme("ws://host/hub"), "ws://host/hub");
        assert_eq!(to_ws_scheme("wss://host/hub"), "wss://host/hub");
    }

    #[test]
    fn test_default_delays() {
        let config = ChannelConfig::default();
        assert_eq!(config.connect_retry_delay, Duration::from_secs(5));
        assert_eq!(config.reconnect_delay, Duration::from_secs(3));
        assert_eq!(config.event_name, "JobStatusUpdate");
    }
}
