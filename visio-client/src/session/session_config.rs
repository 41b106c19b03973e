use crate::media::MediaConstraints;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use visio_core::utils::DEFAULT_RECONNECT_BACKOFF_MS;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub media: MediaConstraints,
    pub reconnect: ReconnectConfig,
}

/// Signaling reconnect policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Upper bound of the first retry delay; doubles on every failed attempt.
    pub initial_backoff_ms: u64,
}

impl ReconnectConfig {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_backoff_ms: DEFAULT_RECONNECT_BACKOFF_MS,
        }
    }
}
