//! API constants for the compute platform and its identity provider

use std::time::Duration;

/// Tokens are treated as expired this long before the provider says they are
pub const TOKEN_SAFETY_MARGIN: Duration = Duration::from_secs(10);

/// Progress endpoint for a task
pub fn task_progress_endpoint(base_url: &str, task_id: &str) -> String {
    format!(
        "{}/tasks/{}/progress",
        base_url.trim_end_matches('/'),
        urlencoding::encode(task_id)
    )
}

/// Status endpoint for a computation
pub fn computation_endpoint(base_url: &str, computation_id: &str) -> String {
    format!(
        "{}/computations/{}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(computation_id)
    )
}

/// OpenID Connect token endpoint for a realm
pub fn token_endpoint(issuer_url: &str, realm: &str) -> String {
    format!(
        "{}/realms/{}/protocol/openid-connect/token",
        issuer_url.trim_end_matches('/'),
        urlencoding::encode(realm)
    )
}

/// Header names and fixed values
pub mod headers {
    pub const AUTHORIZATION: &str = "Authorization";
    pub const ACCEPT: &str = "Accept";
    pub const USER_AGENT: &str = "User-Agent";

    pub const CONTENT_TYPE_JSON: &str = "application/json";

    pub fn bearer(token: &str) -> String {
        format!("Bearer {}", token)
    }

    pub fn user_agent() -> String {
        format!("compute-cli/{}", env!("CARGO_PKG_VERSION"))
    }
}

/// OAuth2 grant types
pub mod grants {
    pub const CLIENT_CREDENTIALS: &str = "client_credentials";
    pub const PASSWORD: &str = "password";
    pub const REFRESH_TOKEN: &str = "refresh_token";
}

/// Polling defaults
pub mod polling {
    use std::time::Duration;

    pub const TRACKER_INTERVAL: Duration = Duration::from_millis(500);
    pub const TRACKER_ERROR_TOLERANCE: u32 = 5;
    /// Fraction of the poll interval slept after a transient fetch failure
    pub const NOT_FOUND_BACKOFF: f64 = 0.5;

    pub const WAITER_INTERVAL: Duration = Duration::from_secs(1);
    pub const WAITER_MAX_WAIT: Duration = Duration::from_secs(600);
}
