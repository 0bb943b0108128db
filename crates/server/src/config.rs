//! Relay server configuration

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;

use tracing::warn;

use crate::store::ChatStore;

/// Configuration for the relay server
#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// Interface to bind
    pub host: IpAddr,
    /// Listening port
    pub port: u16,
    /// Buffered broadcast events per subscriber before it starts lagging
    pub broadcast_capacity: usize,
    /// Heartbeat interval for streaming subscriptions, in seconds
    pub heartbeat_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 4000,
            broadcast_capacity: 100,
            heartbeat_secs: 30,
        }
    }
}

impl RelayConfig {
    /// Defaults overridden by `RELAY_HOST`, `PORT`, `RELAY_BROADCAST_CAPACITY`
    /// and `RELAY_HEARTBEAT_SECS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env_or("RELAY_HOST", defaults.host),
            port: env_or("PORT", defaults.port),
            broadcast_capacity: env_or("RELAY_BROADCAST_CAPACITY", defaults.broadcast_capacity).max(1),
            heartbeat_secs: env_or("RELAY_HEARTBEAT_SECS", defaults.heartbeat_secs).max(1),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
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

/// App state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: RelayConfig,
    pub store: Arc<ChatStore>,
}

impl AppState {
    /// Fresh state seeded with the default roster.
    pub fn new(config: RelayConfig) -> Self {
        let store = Arc::new(ChatStore::with_default_roster(config.broadcast_capacity));
        Self { config, store }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_addr() {
        let config = RelayConfig::default();
        assert_eq!(config.addr().to_string(), "0.0.0.0:4000");
    }

    #[test]
    fn test_env_or_falls_back_on_garbage() {
        std::env::set_var("RELAY_TEST_BOGUS_PORT", "not-a-port");
        assert_eq!(env_or("RELAY_TEST_BOGUS_PORT", 4000u16), 4000);
        std::env::set_var("RELAY_TEST_GOOD_PORT", " 5050 ");
        assert_eq!(env_or("RELAY_TEST_GOOD_PORT", 4000u16), 5050);
        assert_eq!(env_or("RELAY_TEST_UNSET_PORT", 4000u16), 4000);
    }
}
