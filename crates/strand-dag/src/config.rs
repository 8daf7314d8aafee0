use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tuning for the DAG manager and its sync protocol.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DagConfig {
    /// Hard deadline for a whole sync, in milliseconds.
    pub sync_timeout_ms: u64,
    /// How long to wait for one peer's inventory or one fetched object.
    pub fetch_timeout_ms: u64,
    /// Capacity of per-request response channels.
    pub response_buffer: usize,
    /// Capacity of each graph update subscriber's channel.
    pub subscriber_capacity: usize,
}

impl DagConfig {
    pub fn sync_timeout(&self) -> Duration {
        Duration::from_millis(self.sync_timeout_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

impl Default for DagConfig {
    fn default() -> Self {
        Self {
            sync_timeout_ms: 10_000,
            fetch_timeout_ms: 5_000,
            response_buffer: 16,
            subscriber_capacity: 64,
        }
    }
}
