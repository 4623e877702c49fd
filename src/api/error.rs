//! Error taxonomy for the session and task orchestration layer.
//!
//! Collaborator failures are kept in their own enums ([`IdentityError`],
//! [`FetchError`]) so each layer can apply its own policy before wrapping
//! them in the caller-facing [`Error`].

use std::time::Duration;
use thiserror::Error;

/// Failures reported by an identity provider exchange
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityError {
    /// Client id/secret or username/password rejected
    #[error("invalid client credentials: {0}")]
    InvalidClient(String),

    /// Refresh token rejected (expired or revoked server-side)
    #[error("invalid grant: {0}")]
    InvalidGrant(String),

    #[error("identity provider unreachable: {0}")]
    Transport(String),
}

/// Failures reported by a [`RemoteTaskClient`](super::client::RemoteTaskClient)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The task is not visible yet, usually a race with task creation
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl FetchError {
    /// Whether the progress tracker may count this failure against its tolerance.
    /// Authorization failures are never transient: tolerating them could hide a
    /// revoked grant.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::NotFound(_) | FetchError::Transport(_))
    }
}

/// Caller-facing error
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("authentication failed: {0}")]
    Auth(#[from] IdentityError),

    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The wait budget ran out; the computation may still be running
    #[error("timed out after {waited:?} waiting for computation {computation_id}")]
    Timeout {
        computation_id: String,
        waited: Duration,
    },

    #[error("background task failed: {0}")]
    Join(String),
}

impl Error {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
