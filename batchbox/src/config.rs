//! Scheduler configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default batching window.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(10);

/// Configuration of a [`BatchScheduler`](crate::BatchScheduler).
///
/// Immutable once the scheduler is built. Deserializable from any serde
/// format; the interval is written as a humantime string:
///
/// ```
/// use std::time::Duration;
/// use batchbox::SchedulerConfig;
///
/// let config: SchedulerConfig =
///     serde_json::from_str(r#"{ "interval": "100ms", "dedupe": true }"#).unwrap();
/// assert_eq!(config.interval, Duration::from_millis(100));
/// assert!(config.dedupe);
/// assert!(!config.caching);
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
pub struct SchedulerConfig {
    /// Minimum time between two flushes (e.g., "5ms", "100ms", "1s").
    #[serde(with = "humantime_serde", default = "default_interval")]
    pub interval: Duration,
    /// Memoize successfully resolved values in the cache store.
    #[serde(default)]
    pub caching: bool,
    /// Send each distinct key to the fetch only once per batch.
    #[serde(default)]
    pub dedupe: bool,
}

fn default_interval() -> Duration {
    DEFAULT_INTERVAL
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            caching: false,
            dedupe: false,
        }
    }
}

impl SchedulerConfig {
    /// Create a new builder for `SchedulerConfig`.
    pub fn builder() -> SchedulerConfigBuilder {
        SchedulerConfigBuilder::default()
    }
}

/// Builder for [`SchedulerConfig`].
#[derive(Debug, Clone, Default)]
pub struct SchedulerConfigBuilder {
    config: SchedulerConfig,
}

impl SchedulerConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the batching interval.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    /// Enable or disable caching of resolved values.
    pub fn caching(mut self, enabled: bool) -> Self {
        self.config.caching = enabled;
        self
    }

    /// Enable or disable key deduplication within a batch.
    pub fn dedupe(mut self, enabled: bool) -> Self {
        self.config.dedupe = enabled;
        self
    }

    /// Build the `SchedulerConfig`.
    pub fn build(self) -> SchedulerConfig {
        self.config
    }
}
