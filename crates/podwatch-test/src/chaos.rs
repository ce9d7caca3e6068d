//! Fault injection for the fake cluster.

use std::time::Duration;

/// Faults applied to cluster fetches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChaosConfig {
    /// Number of upcoming fetches that fail with a fetch error.
    pub fetch_failures: u32,
    /// Delay applied to every fetch.
    pub latency: Option<Duration>,
}

impl ChaosConfig {
    /// Fails the next `count` fetches.
    #[must_use]
    pub const fn errors(count: u32) -> Self {
        Self {
            fetch_failures: count,
            latency: None,
        }
    }

    /// Delays every fetch by `delay`.
    #[must_use]
    pub const fn latency(delay: Duration) -> Self {
        Self {
            fetch_failures: 0,
            latency: Some(delay),
        }
    }

    /// Adds fetch failures to this config.
    #[must_use]
    pub const fn with_errors(mut self, count: u32) -> Self {
        self.fetch_failures = count;
        self
    }
}
