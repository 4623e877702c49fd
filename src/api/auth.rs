use super::constants::{self, grants};
use super::error::IdentityError;
use super::models::TokenGrant;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

/// Token exchanges against an identity provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn exchange_client_credentials(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<TokenGrant, IdentityError>;

    async fn exchange_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<TokenGrant, IdentityError>;

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, IdentityError>;
}

/// OpenID Connect token endpoint of a realm
pub struct OidcProvider {
    client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: Option<String>,
}

impl OidcProvider {
    pub fn new(
        client: reqwest::Client,
        issuer_url: &str,
        realm: &str,
        client_id: impl Into<String>,
        client_secret: Option<String>,
    ) -> Self {
        Self {
            client,
            token_url: constants::token_endpoint(issuer_url, realm),
            client_id: client_id.into(),
            client_secret,
        }
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    async fn request_token(
        &self,
        grant_type: &str,
        params: &[(&str, &str)],
    ) -> Result<TokenGrant, IdentityError> {
        log::debug!("Requesting {} grant from {}", grant_type, self.token_url);

        let mut form: Vec<(&str, &str)> = vec![("grant_type", grant_type)];
        form.extend_from_slice(params);

        let response = self
            .client
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        let status = response.status();
        log::debug!("Token request status: {}", status);

        let body: Value = if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| IdentityError::Transport(format!("invalid token response: {}", e)))?
        } else {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &text));
        };

        parse_grant(&body)
    }
}

#[async_trait]
impl IdentityProvider for OidcProvider {
    async fn exchange_client_credentials(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<TokenGrant, IdentityError> {
        self.request_token(
            grants::CLIENT_CREDENTIALS,
            &[("client_id", client_id), ("client_secret", client_secret)],
        )
        .await
    }

    async fn exchange_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<TokenGrant, IdentityError> {
        self.request_token(
            grants::PASSWORD,
            &[
                ("client_id", self.client_id.as_str()),
                ("username", username),
                ("password", password),
            ],
        )
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, IdentityError> {
        let mut params = vec![
            ("client_id", self.client_id.as_str()),
            ("refresh_token", refresh_token),
        ];
        if let Some(secret) = &self.client_secret {
            params.push(("client_secret", secret.as_str()));
        }
        self.request_token(grants::REFRESH_TOKEN, &params).await
    }
}

/// Map a failed token response onto the identity error kinds
fn classify_failure(status: StatusCode, body: &str) -> IdentityError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let code = parsed
        .as_ref()
        .and_then(|v| v.get("error"))
        .and_then(|e| e.as_str())
        .unwrap_or_default();
    let description = parsed
        .as_ref()
        .and_then(|v| v.get("error_description"))
        .and_then(|d| d.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

    match status.as_u16() {
        400 | 401 if code == "invalid_grant" => IdentityError::InvalidGrant(description),
        400 | 401 | 403 => IdentityError::InvalidClient(description),
        _ => IdentityError::Transport(description),
    }
}

fn parse_grant(body: &Value) -> Result<TokenGrant, IdentityError> {
    let access_token = body
        .get("access_token")
        .and_then(|t| t.as_str())
        .ok_or_else(|| IdentityError::Transport("no access token in response".into()))?;

    let expires_in = body
        .get("expires_in")
        .and_then(|e| e.as_u64())
        .unwrap_or(300);
    let refresh_expires_in = body
        .get("refresh_expires_in")
        .and_then(|e| e.as_u64())
        .unwrap_or(expires_in);
    let refresh_token = body
        .get("refresh_token")
        .and_then(|t| t.as_str())
        .unwrap_or_default();

    Ok(TokenGrant {
        access_token: access_token.to_string(),
        refresh_token: refresh_token.to_string(),
        expires_in: Duration::from_secs(expires_in),
        refresh_expires_in: Duration::from_secs(refresh_expires_in),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_full_grant() {
        let grant = parse_grant(&json!({
            "access_token": "abc",
            "expires_in": 300,
            "refresh_token": "def",
            "refresh_expires_in": 1800,
        }))
        .unwrap();
        assert_eq!(grant.access_token, "abc");
        assert_eq!(grant.refresh_token, "def");
        assert_eq!(grant.expires_in, Duration::from_secs(300));
        assert_eq!(grant.refresh_expires_in, Duration::from_secs(1800));
    }

    #[test]
    fn test_parse_grant_without_refresh_token() {
        let grant = parse_grant(&json!({"access_token": "abc", "expires_in": 60})).unwrap();
        assert!(grant.refresh_token.is_empty());
        assert_eq!(grant.refresh_expires_in, Duration::from_secs(60));
    }

    #[test]
    fn test_parse_grant_missing_access_token() {
        assert!(matches!(
            parse_grant(&json!({"expires_in": 60})),
            Err(IdentityError::Transport(_))
        ));
    }

    #[test]
    fn test_failure_classification() {
        let expired = classify_failure(
            StatusCode::BAD_REQUEST,
            r#"{"error":"invalid_grant","error_description":"Token is not active"}"#,
        );
        assert_eq!(expired, IdentityError::InvalidGrant("Token is not active".into()));

        let bad_client = classify_failure(
            StatusCode::UNAUTHORIZED,
            r#"{"error":"unauthorized_client"}"#,
        );
        assert!(matches!(bad_client, IdentityError::InvalidClient(_)));

        let outage = classify_failure(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(outage, IdentityError::Transport("HTTP 502".into()));
    }

    #[test]
    fn test_token_url_from_realm() {
        let provider = OidcProvider::new(
            reqwest::Client::new(),
            "https://auth.example.com",
            "platform",
            "cli",
            None,
        );
        assert_eq!(
            provider.token_url(),
            "https://auth.example.com/realms/platform/protocol/openid-connect/token"
        );
    }
}
