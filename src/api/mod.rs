//! Session and task orchestration for the compute platform
//!
//! Keeps a caller authenticated for the lifetime of a session and turns
//! remote task status into local progress, with bounded error tolerance,
//! cancellation and wait budgets.

pub mod auth;
pub mod client;
pub mod constants;
pub mod error;
pub mod models;
pub mod progress;
pub mod query;
pub mod resilience;
pub mod session;
pub mod waiter;

pub use auth::{IdentityProvider, OidcProvider};
pub use client::{HttpTaskClient, RemoteTaskClient, build_http_client};
pub use error::{Error, FetchError, IdentityError, Result};
pub use models::{
    AuthFlow, ComputationState, ComputationStatus, Credential, Identity, ProgressSnapshot,
    StageProgress, TokenGrant, WaitBudget,
};
pub use progress::{
    LogSink, ProgressEvent, ProgressSink, ProgressTracker, TrackOutcome, TrackerHandle,
};
pub use query::{Filter, FilterValue};
pub use resilience::{ErrorBudget, PollingConfig, TrackerConfig};
pub use session::{SessionManager, TokenStore};
pub use waiter::ComputationWaiter;
