//! Token lifecycle tests for the session manager, run on paused time

mod common;

use common::FakeProvider;
use compute_cli::api::{Error, Identity, IdentityError, SessionManager};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, advance};

const ACCESS_LIFETIME: Duration = Duration::from_secs(60);
const REFRESH_LIFETIME: Duration = Duration::from_secs(600);

fn provider() -> Arc<FakeProvider> {
    Arc::new(FakeProvider::new(ACCESS_LIFETIME, REFRESH_LIFETIME))
}

fn session(provider: &Arc<FakeProvider>) -> SessionManager {
    let identity = Identity::client_credentials(
        "https://auth.example.com",
        "platform",
        "pipeline",
        "s3cret",
    )
    .unwrap();
    SessionManager::new(identity, provider.clone())
}

#[tokio::test(start_paused = true)]
async fn test_first_call_acquires_and_later_calls_reuse() {
    let provider = provider();
    let session = session(&provider);

    assert!(session.credential_expiry().is_none());

    let first = session.access_token().await.unwrap();
    advance(Duration::from_secs(30)).await;
    let second = session.access_token().await.unwrap();

    assert_eq!(first, "access-1");
    assert_eq!(second, first);
    assert_eq!(provider.acquires(), 1);
    assert_eq!(provider.refreshes(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_headers_carry_bearer_and_static_values() {
    let provider = provider();
    let mut extra = HashMap::new();
    extra.insert("X-Project".to_string(), "alpha".to_string());
    extra.insert("Authorization".to_string(), "Basic nope".to_string());
    let session = session(&provider).with_static_headers(extra);

    let headers = session.get_headers().await.unwrap();

    assert_eq!(headers["Authorization"], "Bearer access-1");
    assert_eq!(headers["X-Project"], "alpha");
    assert_eq!(headers["Accept"], "application/json");
    assert!(headers["User-Agent"].starts_with("compute-cli/"));
}

#[tokio::test(start_paused = true)]
async fn test_expiry_horizons_are_pulled_in_by_margin() {
    let provider = provider();
    let session = session(&provider);
    let start = Instant::now();

    session.access_token().await.unwrap();
    let (access, refresh) = session.credential_expiry().unwrap();

    assert_eq!(access, start + Duration::from_secs(50));
    assert_eq!(refresh, start + Duration::from_secs(590));
}

#[tokio::test(start_paused = true)]
async fn test_expired_access_refreshes_exactly_once() {
    let provider = provider();
    let session = session(&provider);
    session.access_token().await.unwrap();

    // past the access horizon, inside the refresh horizon
    advance(Duration::from_secs(55)).await;
    let token = session.access_token().await.unwrap();
    let again = session.access_token().await.unwrap();

    assert_eq!(token, "access-2");
    assert_eq!(again, token);
    assert_eq!(provider.refreshes(), 1);
    assert_eq!(provider.acquires(), 1);
    assert_eq!(provider.refresh_tokens_seen(), vec!["refresh-1".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_expired_refresh_reacquires_without_refreshing() {
    let provider = provider();
    let session = session(&provider);
    session.access_token().await.unwrap();

    advance(Duration::from_secs(600)).await;
    let token = session.access_token().await.unwrap();

    assert_eq!(token, "access-2");
    assert_eq!(provider.acquires(), 2);
    assert_eq!(provider.refreshes(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_refresh_falls_back_to_acquire() {
    let provider = provider();
    let session = session(&provider);
    session.access_token().await.unwrap();

    provider.fail_refresh(IdentityError::InvalidGrant("Token is not active".into()));
    advance(Duration::from_secs(55)).await;
    let token = session.access_token().await.unwrap();

    assert_eq!(token, "access-2");
    assert_eq!(provider.refreshes(), 1);
    assert_eq!(provider.acquires(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_transport_failure_is_fatal() {
    let provider = provider();
    let session = session(&provider);
    session.access_token().await.unwrap();

    provider.fail_refresh(IdentityError::Transport("connection reset".into()));
    advance(Duration::from_secs(55)).await;
    let err = session.access_token().await.unwrap_err();

    assert!(matches!(err, Error::Auth(IdentityError::Transport(_))));
    assert_eq!(provider.acquires(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_bad_credentials_surface_as_auth_failure() {
    let provider = provider();
    provider.fail_acquire(IdentityError::InvalidClient("Invalid client secret".into()));
    let session = session(&provider);

    let err = session.get_headers().await.unwrap_err();

    assert!(matches!(err, Error::Auth(IdentityError::InvalidClient(_))));
    assert!(session.credential_expiry().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_lifetime_shorter_than_margin_is_never_reused() {
    let provider = Arc::new(FakeProvider::new(Duration::from_secs(5), REFRESH_LIFETIME));
    let session = session(&provider);

    session.access_token().await.unwrap();
    session.access_token().await.unwrap();

    assert_eq!(provider.acquires(), 1);
    assert_eq!(provider.refreshes(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_invalidate_forces_reauthentication() {
    let provider = provider();
    let session = session(&provider);
    session.access_token().await.unwrap();

    session.invalidate();
    assert!(session.credential_expiry().is_none());
    let token = session.access_token().await.unwrap();

    assert_eq!(token, "access-2");
    assert_eq!(provider.acquires(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_callers_share_one_acquire() {
    let provider = Arc::new(
        FakeProvider::new(ACCESS_LIFETIME, REFRESH_LIFETIME).with_latency(Duration::from_secs(1)),
    );
    let session = Arc::new(session(&provider));

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let session = session.clone();
        tasks.push(tokio::spawn(async move { session.access_token().await }));
    }

    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), "access-1");
    }
    assert_eq!(provider.acquires(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_callers_share_one_refresh() {
    let provider = Arc::new(
        FakeProvider::new(ACCESS_LIFETIME, REFRESH_LIFETIME).with_latency(Duration::from_secs(1)),
    );
    let session = Arc::new(session(&provider));
    session.access_token().await.unwrap();

    advance(Duration::from_secs(55)).await;
    let mut tasks = Vec::new();
    for _ in 0..8 {
        let session = session.clone();
        tasks.push(tokio::spawn(async move { session.access_token().await }));
    }

    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), "access-2");
    }
    assert_eq!(provider.refreshes(), 1);
    assert_eq!(provider.acquires(), 1);
}
