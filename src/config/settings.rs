//! Client tunables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Client-wide settings.
///
/// Every field has a sensible default, so a missing or partial config file
/// still yields a working client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Seconds between activity monitor observation cycles.
    pub poll_interval_secs: u64,
    /// Per-call HTTP timeout in seconds.
    pub request_timeout_secs: u64,
    /// Total attempts per request, including the first.
    pub max_attempts: u32,
    /// Base delay for exponential backoff, in milliseconds.
    pub retry_base_delay_ms: u64,
    /// Backoff cap in milliseconds.
    pub retry_max_delay_ms: u64,
    /// Maximum concurrently executing requests; excess callers queue.
    pub max_in_flight: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 120,
            request_timeout_secs: 30,
            max_attempts: 4,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 15_000,
            max_in_flight: 8,
        }
    }
}

impl Settings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
