//! Client configuration

use std::str::FromStr;
use tracing::warn;

#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the relay
    pub server_url: String,
    /// User the client sends as
    pub user_id: String,
    /// Max distance between an optimistic message and its echo, in milliseconds
    pub echo_window_ms: i64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:4000".to_string(),
            user_id: "u1".to_string(),
            echo_window_ms: 10_000,
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `RELAY_URL`, `RELAY_USER` and `RELAY_ECHO_WINDOW_MS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_url: std::env::var("RELAY_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.server_url),
            user_id: std::env::var("RELAY_USER").unwrap_or(defaults.user_id),
            echo_window_ms: env_or("RELAY_ECHO_WINDOW_MS", defaults.echo_window_ms).max(0),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}={:?}", key, raw);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_point_at_local_relay() {
        let config = ClientConfig::default();
        assert_eq!(config.server_url, "http://localhost:4000");
        assert_eq!(config.user_id, "u1");
        assert_eq!(config.echo_window_ms, 10_000);
    }

    #[test]
    fn test_env_or_falls_back_when_unset() {
        assert_eq!(env_or("RELAY_CLIENT_TEST_SURELY_UNSET", 7i64), 7);
    }
}
