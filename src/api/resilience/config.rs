//! Polling configuration with builder pattern
//!
//! One place for the progress tracker's and the computation waiter's
//! intervals and budgets, with presets for interactive use and pipelines.

use crate::api::constants::polling;
use crate::api::models::WaitBudget;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Polling configuration for both tracking styles
#[derive(Debug, Clone, PartialEq)]
pub struct PollingConfig {
    pub tracker: TrackerConfig,
    pub wait: WaitBudget,
}

/// Progress tracker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(with = "millis")]
    pub poll_interval: Duration,
    /// Consecutive transient failures absorbed before giving up
    pub error_tolerance: u32,
    /// Fraction of `poll_interval` slept after a transient failure
    pub not_found_backoff: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: polling::TRACKER_INTERVAL,
            error_tolerance: polling::TRACKER_ERROR_TOLERANCE,
            not_found_backoff: polling::NOT_FOUND_BACKOFF,
        }
    }
}

impl TrackerConfig {
    pub fn new(poll_interval: Duration, error_tolerance: u32) -> Self {
        Self {
            poll_interval,
            error_tolerance,
            ..Self::default()
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            tracker: TrackerConfig::default(),
            wait: WaitBudget::default(),
        }
    }
}

impl PollingConfig {
    /// Create a new builder for PollingConfig
    pub fn builder() -> PollingConfigBuilder {
        PollingConfigBuilder::new()
    }

    /// Fast feedback for a person watching a terminal
    pub fn interactive() -> Self {
        Self {
            tracker: TrackerConfig {
                poll_interval: Duration::from_millis(250),
                error_tolerance: 10,
                not_found_backoff: 0.5,
            },
            wait: WaitBudget::new(Duration::from_millis(500), Duration::from_secs(300)),
        }
    }

    /// Slower polling and larger budgets for automated pipelines
    pub fn pipeline() -> Self {
        Self {
            tracker: TrackerConfig {
                poll_interval: Duration::from_secs(2),
                error_tolerance: 3,
                not_found_backoff: 0.5,
            },
            wait: WaitBudget::new(Duration::from_secs(5), Duration::from_secs(3600)),
        }
    }
}

/// Builder for PollingConfig
#[derive(Debug)]
pub struct PollingConfigBuilder {
    config: PollingConfig,
}

impl PollingConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: PollingConfig::default(),
        }
    }

    pub fn tracker_interval(mut self, interval: Duration) -> Self {
        self.config.tracker.poll_interval = interval;
        self
    }

    pub fn error_tolerance(mut self, tolerance: u32) -> Self {
        self.config.tracker.error_tolerance = tolerance;
        self
    }

    pub fn not_found_backoff(mut self, ratio: f64) -> Self {
        self.config.tracker.not_found_backoff = ratio;
        self
    }

    pub fn wait_interval(mut self, interval: Duration) -> Self {
        self.config.wait.poll_interval = interval;
        self
    }

    pub fn max_wait(mut self, max_total_wait: Duration) -> Self {
        self.config.wait.max_total_wait = max_total_wait;
        self
    }

    pub fn build(self) -> PollingConfig {
        self.config
    }
}

impl Default for PollingConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Durations as integer milliseconds
pub(crate) mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
