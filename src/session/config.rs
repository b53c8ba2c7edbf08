//! Session Configuration - passed from the host application

use crate::core::keys::{env, storage};
use crate::core::Network;
use std::time::Duration;

/// Reference interval for the authorized-accounts consistency check.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Session configuration. Host apps construct this once at startup.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Chain the platform's contracts live on; negotiated after connect.
    pub network: Network,
    pub poll_interval: Duration,
    pub storage_key: String,
    pub negotiate_network: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            network: Network::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            storage_key: storage::WALLET_CONNECTED.into(),
            negotiate_network: true,
        }
    }
}

impl SessionConfig {
    pub fn new(network: Network) -> Self { Self { network, ..Default::default() } }
    pub fn with_network(mut self, network: Network) -> Self { self.network = network; self }
    pub fn with_poll_interval(mut self, interval: Duration) -> Self { self.poll_interval = interval; self }
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self { self.storage_key = key.into(); self }
    pub fn without_network_negotiation(mut self) -> Self { self.negotiate_network = false; self }

    /// Defaults overridden by `AVALAUNCH_*` variables. Unparseable values are
    /// logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(env::NETWORK) {
            match raw.parse::<Network>() {
                Ok(network) => config.network = network,
                Err(e) => tracing::warn!(error = %e, "ignoring {}", env::NETWORK),
            }
        }
        if let Ok(raw) = std::env::var(env::POLL_INTERVAL_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => config.poll_interval = Duration::from_millis(ms),
                _ => tracing::warn!(value = %raw, "ignoring invalid {}", env::POLL_INTERVAL_MS),
            }
        }
        if let Ok(raw) = std::env::var(env::STORAGE_KEY) {
            if !raw.trim().is_empty() {
                config.storage_key = raw.trim().to_string();
            }
        }
        if let Ok(raw) = std::env::var(env::NEGOTIATE_NETWORK) {
            config.negotiate_network = !matches!(raw.trim(), "0" | "false" | "off");
        }
        config
    }
}
