//! Session credential lifecycle.
//!
//! [`SessionManager`] hands out bearer headers and transparently refreshes or
//! re-acquires the underlying [`Credential`]. Reads go through a short-held
//! state lock; refresh and acquire are serialized behind an async gate so
//! concurrent callers never race duplicate exchanges. The state lock is never
//! held across a network call.

use super::auth::{IdentityProvider, OidcProvider};
use super::constants::headers;
use super::error::{Error, IdentityError, Result};
use super::models::{AuthFlow, Credential, Identity, TokenGrant};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::time::Instant;

/// Holds the current credential and a generation counter bumped on every write
#[derive(Debug, Default)]
pub struct TokenStore {
    credential: Option<Credential>,
    generation: u64,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Store `credential` if nothing was written since `seen_generation`.
    /// Returns false when a newer write already happened.
    pub fn replace(&mut self, credential: Credential, seen_generation: u64) -> bool {
        if self.generation != seen_generation {
            return false;
        }
        self.credential = Some(credential);
        self.generation += 1;
        true
    }

    pub fn clear(&mut self) {
        self.credential = None;
        self.generation += 1;
    }
}

/// What a header request has to do with the held credential
enum Transition {
    Reuse(String),
    Refresh { refresh_token: String, generation: u64 },
    Acquire { generation: u64 },
}

pub struct SessionManager {
    identity: Identity,
    provider: Arc<dyn IdentityProvider>,
    store: Mutex<TokenStore>,
    gate: tokio::sync::Mutex<()>,
    static_headers: HashMap<String, String>,
}

impl SessionManager {
    pub fn new(identity: Identity, provider: Arc<dyn IdentityProvider>) -> Self {
        let mut static_headers = HashMap::new();
        static_headers.insert(
            headers::ACCEPT.to_string(),
            headers::CONTENT_TYPE_JSON.to_string(),
        );
        static_headers.insert(headers::USER_AGENT.to_string(), headers::user_agent());

        Self {
            identity,
            provider,
            store: Mutex::new(TokenStore::new()),
            gate: tokio::sync::Mutex::new(()),
            static_headers,
        }
    }

    /// Session backed by the identity's OpenID Connect realm
    pub fn oidc(identity: Identity, http_client: reqwest::Client) -> Self {
        let provider = OidcProvider::new(
            http_client,
            &identity.issuer_url,
            &identity.realm,
            identity.client_id.clone(),
            identity.client_secret.clone(),
        );
        Self::new(identity, Arc::new(provider))
    }

    /// Extra headers sent with every request. `Authorization` is always
    /// overwritten by the session.
    pub fn with_static_headers(mut self, extra: HashMap<String, String>) -> Self {
        self.static_headers.extend(extra);
        self
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Headers for an outgoing call, carrying a currently valid bearer token
    pub async fn get_headers(&self) -> Result<HashMap<String, String>> {
        let token = self.access_token().await?;

        let mut result = self.static_headers.clone();
        result.insert(headers::AUTHORIZATION.to_string(), headers::bearer(&token));
        Ok(result)
    }

    /// A valid access token, refreshing or re-acquiring it first if needed
    pub async fn access_token(&self) -> Result<String> {
        if let Transition::Reuse(token) = self.plan(Instant::now()) {
            return Ok(token);
        }

        let _gate = self.gate.lock().await;

        // someone else may have refreshed while we waited on the gate
        match self.plan(Instant::now()) {
            Transition::Reuse(token) => Ok(token),
            Transition::Refresh {
                refresh_token,
                generation,
            } => self.refresh(&refresh_token, generation).await,
            Transition::Acquire { generation } => self.acquire(generation).await,
        }
    }

    /// Drop the held credential so the next call re-authenticates
    pub fn invalidate(&self) {
        log::debug!("Invalidating session credential");
        self.lock_store().clear();
    }

    /// Current (access, refresh) expiry horizons, if authenticated
    pub fn credential_expiry(&self) -> Option<(Instant, Instant)> {
        self.lock_store()
            .credential()
            .map(|c| (c.access_expiry, c.refresh_expiry))
    }

    fn plan(&self, now: Instant) -> Transition {
        let store = self.lock_store();
        let generation = store.generation();

        match store.credential() {
            Some(credential) if credential.access_valid(now) => {
                Transition::Reuse(credential.access_token.clone())
            }
            Some(credential) if credential.refresh_valid(now) => Transition::Refresh {
                refresh_token: credential.refresh_token.clone(),
                generation,
            },
            _ => Transition::Acquire { generation },
        }
    }

    async fn refresh(&self, refresh_token: &str, generation: u64) -> Result<String> {
        log::debug!("Access token expired, refreshing");
        let issued_at = Instant::now();

        match self.provider.refresh(refresh_token).await {
            Ok(grant) => Ok(self.store_grant(grant, issued_at, generation)),
            Err(IdentityError::InvalidGrant(reason)) => {
                log::warn!("Refresh token rejected ({}), re-authenticating", reason);
                self.acquire(generation).await
            }
            Err(e) => {
                log::error!("Token refresh failed: {}", e);
                Err(Error::Auth(e))
            }
        }
    }

    async fn acquire(&self, generation: u64) -> Result<String> {
        let issued_at = Instant::now();

        let grant = match self.identity.flow() {
            AuthFlow::ClientCredentials => {
                log::info!(
                    "Authenticating client {} against {}",
                    self.identity.client_id,
                    self.identity.issuer_url
                );
                let secret = self.identity.client_secret.as_deref().unwrap_or_default();
                self.provider
                    .exchange_client_credentials(&self.identity.client_id, secret)
                    .await
            }
            AuthFlow::Password => {
                log::info!(
                    "Authenticating user {} against {}",
                    self.identity.username,
                    self.identity.issuer_url
                );
                let password = self.identity.password.as_deref().unwrap_or_default();
                self.provider
                    .exchange_password(&self.identity.username, password)
                    .await
            }
        };

        match grant {
            Ok(grant) => Ok(self.store_grant(grant, issued_at, generation)),
            Err(e) => {
                log::error!("Authentication failed: {}", e);
                Err(Error::Auth(e))
            }
        }
    }

    fn store_grant(&self, grant: TokenGrant, issued_at: Instant, generation: u64) -> String {
        let credential = Credential::from_grant(grant, issued_at);
        let token = credential.access_token.clone();

        if !self.lock_store().replace(credential, generation) {
            log::debug!("Discarding credential superseded by a newer write");
        }
        token
    }

    fn lock_store(&self) -> std::sync::MutexGuard<'_, TokenStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
