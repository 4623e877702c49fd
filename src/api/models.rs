use super::constants::{TOKEN_SAFETY_MARGIN, polling};
use super::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Who we authenticate as. Immutable for the lifetime of a session.
///
/// A non-empty client secret selects the client-credentials flow, otherwise
/// the password flow is used. Exactly one of the two must be configured.
#[derive(Clone)]
pub struct Identity {
    pub issuer_url: String,
    pub realm: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub username: String,
    pub password: Option<String>,
}

/// Which exchange an [`Identity`] authenticates with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFlow {
    ClientCredentials,
    Password,
}

impl Identity {
    pub fn new(
        issuer_url: impl Into<String>,
        realm: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: Option<String>,
        username: impl Into<String>,
        password: Option<String>,
    ) -> Result<Self> {
        let identity = Self {
            issuer_url: issuer_url.into(),
            realm: realm.into(),
            client_id: client_id.into(),
            client_secret: client_secret.filter(|s| !s.is_empty()),
            username: username.into(),
            password: password.filter(|p| !p.is_empty()),
        };
        identity.validate()?;
        Ok(identity)
    }

    /// Machine identity using the client-credentials flow
    pub fn client_credentials(
        issuer_url: impl Into<String>,
        realm: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self> {
        Self::new(issuer_url, realm, client_id, Some(client_secret.into()), "", None)
    }

    /// Interactive identity using the password flow
    pub fn password(
        issuer_url: impl Into<String>,
        realm: impl Into<String>,
        client_id: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        Self::new(issuer_url, realm, client_id, None, username, Some(password.into()))
    }

    fn validate(&self) -> Result<()> {
        if self.issuer_url.is_empty() {
            return Err(Error::Config("issuer url is required".into()));
        }
        if self.client_id.is_empty() {
            return Err(Error::Config("client id is required".into()));
        }

        let has_secret = self.client_secret.is_some();
        let has_password = !self.username.is_empty() && self.password.is_some();
        match (has_secret, has_password) {
            (true, false) | (false, true) => Ok(()),
            (true, true) => Err(Error::Config(
                "configure either a client secret or a username/password, not both".into(),
            )),
            (false, false) => Err(Error::Config(
                "either a client secret or a username and password is required".into(),
            )),
        }
    }

    pub fn flow(&self) -> AuthFlow {
        if self.client_secret.is_some() {
            AuthFlow::ClientCredentials
        } else {
            AuthFlow::Password
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("issuer_url", &self.issuer_url)
            .field("realm", &self.realm)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Raw result of a token exchange, lifetimes as reported by the provider
#[derive(Clone)]
pub struct TokenGrant {
    pub access_token: String,
    /// Empty when the provider did not issue one
    pub refresh_token: String,
    pub expires_in: Duration,
    pub refresh_expires_in: Duration,
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("expires_in", &self.expires_in)
            .field("refresh_expires_in", &self.refresh_expires_in)
            .finish_non_exhaustive()
    }
}

/// Bearer credential held by a session. Replaced wholesale, never patched.
#[derive(Clone)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expiry: Instant,
    pub refresh_expiry: Instant,
}

impl Credential {
    /// Build a credential from a grant issued at `issued_at`, pulling both
    /// expiry horizons in by [`TOKEN_SAFETY_MARGIN`]
    pub fn from_grant(grant: TokenGrant, issued_at: Instant) -> Self {
        let access_expiry = issued_at + grant.expires_in.saturating_sub(TOKEN_SAFETY_MARGIN);
        let refresh_expiry = if grant.refresh_token.is_empty() {
            access_expiry
        } else {
            issued_at + grant.refresh_expires_in.saturating_sub(TOKEN_SAFETY_MARGIN)
        };

        Self {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            access_expiry,
            refresh_expiry,
        }
    }

    pub fn access_valid(&self, now: Instant) -> bool {
        now < self.access_expiry
    }

    pub fn refresh_valid(&self, now: Instant) -> bool {
        !self.refresh_token.is_empty() && now < self.refresh_expiry
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_expiry", &self.access_expiry)
            .field("refresh_expiry", &self.refresh_expiry)
            .finish_non_exhaustive()
    }
}

/// Progress report for a task as returned by the platform.
/// Unset numeric fields are filled in by [`ProgressSnapshot::normalize`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressSnapshot {
    #[serde(default)]
    pub stage_number: Option<u32>,
    #[serde(default)]
    pub num_stages: Option<u32>,
    #[serde(default)]
    pub stage_name: Option<String>,
    #[serde(default)]
    pub step_number: Option<u32>,
    #[serde(default)]
    pub num_steps: Option<u32>,
    #[serde(default)]
    pub running: bool,
}

/// A [`ProgressSnapshot`] with defaults applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageProgress {
    pub stage_number: u32,
    pub num_stages: u32,
    pub stage_name: String,
    pub step_number: u32,
    pub num_steps: u32,
    pub running: bool,
}

impl ProgressSnapshot {
    pub fn normalize(&self) -> StageProgress {
        StageProgress {
            stage_number: self.stage_number.unwrap_or(0),
            num_stages: self.num_stages.unwrap_or(1).max(1),
            stage_name: self.stage_name.clone().unwrap_or_default(),
            step_number: self.step_number.unwrap_or(0),
            num_steps: self.num_steps.unwrap_or(1).max(1),
            running: self.running,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ComputationState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl ComputationState {
    /// No further transition happens from a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ComputationState::Succeeded | ComputationState::Failed | ComputationState::Cancelled
        )
    }
}

impl fmt::Display for ComputationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComputationState::Pending => "pending",
            ComputationState::Running => "running",
            ComputationState::Succeeded => "succeeded",
            ComputationState::Failed => "failed",
            ComputationState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComputationStatus {
    #[serde(rename = "status")]
    pub state: ComputationState,
    #[serde(default)]
    pub result_ref: Option<String>,
}

/// Polling budget for [`ComputationWaiter::wait`](super::waiter::ComputationWaiter::wait)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitBudget {
    pub poll_interval: Duration,
    pub max_total_wait: Duration,
}

impl WaitBudget {
    pub fn new(poll_interval: Duration, max_total_wait: Duration) -> Self {
        Self {
            poll_interval,
            max_total_wait,
        }
    }
}

impl Default for WaitBudget {
    fn default() -> Self {
        Self::new(polling::WAITER_INTERVAL, polling::WAITER_MAX_WAIT)
    }
}
