//! Polling budgets and failure tolerance
//!
//! Shared by the progress tracker and the computation waiter.

pub mod config;
pub mod retry;

pub use config::{PollingConfig, PollingConfigBuilder, TrackerConfig};
pub use retry::{ErrorBudget, backoff_delay};
