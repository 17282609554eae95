use std::time::Duration;

use bitcoin::Network;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Used when a payload doesn't say which network it belongs to, and tried first for addresses
    pub network: Network,

    /// How long the worker waits for a frame before checking for cancellation again
    pub poll_interval_ms: u64,

    /// Bound of each subscriber's event channel
    pub event_capacity: usize,
}

#[derive(Debug, thiserror::Error)]
#[error("invalid scan config: {0}")]
pub struct ConfigError(#[from] serde_json::Error);

impl Default for ScanConfig {
    fn default() -> Self {
        Self { network: Network::Bitcoin, poll_interval_ms: 100, event_capacity: 32 }
    }
}

impl ScanConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_network(network: Network) -> Self {
        Self { network, ..Self::default() }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
