//! Failure classification and the consecutive-error budget
//!
//! Maps HTTP outcomes onto [`FetchError`] kinds and tracks how many transient
//! failures in a row a polling loop has absorbed.

use crate::api::error::FetchError;
use std::time::Duration;

impl FetchError {
    /// Classify a non-success HTTP status
    pub fn from_status_code(status: u16, context: &str) -> Self {
        match status {
            404 => FetchError::NotFound(context.to_string()),
            401 | 403 => FetchError::Unauthorized(format!("HTTP {}: {}", status, context)),
            _ => FetchError::Transport(format!("HTTP {}: {}", status, context)),
        }
    }

    /// Classify a reqwest error
    pub fn from_reqwest_error(error: &reqwest::Error) -> Self {
        match error.status() {
            Some(status) => Self::from_status_code(status.as_u16(), &error.to_string()),
            None => FetchError::Transport(error.to_string()),
        }
    }
}

/// Counts consecutive transient failures against a tolerance
#[derive(Debug, Clone)]
pub struct ErrorBudget {
    tolerance: u32,
    consecutive: u32,
}

impl ErrorBudget {
    pub fn new(tolerance: u32) -> Self {
        Self {
            tolerance,
            consecutive: 0,
        }
    }

    /// Record a failure. Returns false once the tolerance is exceeded.
    pub fn record_failure(&mut self) -> bool {
        self.consecutive = self.consecutive.saturating_add(1);
        self.consecutive <= self.tolerance
    }

    pub fn reset(&mut self) {
        self.consecutive = 0;
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    pub fn tolerance(&self) -> u32 {
        self.tolerance
    }
}

/// Scale a poll interval by a back-off ratio. A product too large for a
/// `Duration` falls back to the plain interval.
pub fn backoff_delay(interval: Duration, ratio: f64) -> Duration {
    if ratio <= 0.0 || !ratio.is_finite() {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(interval.as_secs_f64() * ratio).unwrap_or(interval)
}
