use super::constants;
use super::error::FetchError;
use super::models::{ComputationStatus, ProgressSnapshot};
use super::session::SessionManager;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Read access to remote task progress and computation status
#[async_trait]
pub trait RemoteTaskClient: Send + Sync {
    async fn fetch_progress(&self, task_id: &str) -> Result<ProgressSnapshot, FetchError>;

    async fn fetch_computation(
        &self,
        computation_id: &str,
    ) -> Result<ComputationStatus, FetchError>;
}

/// Build the pooled HTTP client shared by the session and the task client
pub fn build_http_client(request_timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        .timeout(request_timeout)
        .connect_timeout(Duration::from_secs(10))
        .user_agent(constants::headers::user_agent())
        .build()
}

/// [`RemoteTaskClient`] over HTTP. Every request asks the session for fresh
/// headers first.
#[derive(Clone)]
pub struct HttpTaskClient {
    base_url: String,
    http_client: reqwest::Client,
    session: Arc<SessionManager>,
}

impl HttpTaskClient {
    pub fn new(base_url: impl Into<String>, http_client: reqwest::Client, session: Arc<SessionManager>) -> Self {
        Self {
            base_url: base_url.into(),
            http_client,
            session,
        }
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T, FetchError> {
        let headers = self
            .session
            .get_headers()
            .await
            .map_err(|e| FetchError::Unauthorized(e.to_string()))?;

        log::trace!("GET {} headers={:?}", url, sanitize_headers(&headers));

        let mut request = self.http_client.get(url);
        for (name, value) in &headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            log::debug!("GET {} returned {}", url, status);
            return Err(FetchError::from_status_code(status.as_u16(), what));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| FetchError::Transport(format!("invalid response for {}: {}", what, e)))
    }
}

#[async_trait]
impl RemoteTaskClient for HttpTaskClient {
    async fn fetch_progress(&self, task_id: &str) -> Result<ProgressSnapshot, FetchError> {
        let url = constants::task_progress_endpoint(&self.base_url, task_id);
        self.get_json(&url, &format!("task {}", task_id)).await
    }

    async fn fetch_computation(
        &self,
        computation_id: &str,
    ) -> Result<ComputationStatus, FetchError> {
        let url = constants::computation_endpoint(&self.base_url, computation_id);
        self.get_json(&url, &format!("computation {}", computation_id))
            .await
    }
}

/// Copy of a header map safe to log
pub fn sanitize_headers(headers: &HashMap<String, String>) -> HashMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            if name.eq_ignore_ascii_case(constants::headers::AUTHORIZATION) {
                (name.clone(), "Bearer ***".to_string())
            } else {
                (name.clone(), value.clone())
            }
        })
        .collect()
}
