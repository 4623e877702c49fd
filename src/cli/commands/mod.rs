//! Command handlers and the services they share

use anyhow::{Context, Result};
use compute_cli::api::{HttpTaskClient, PollingConfig, SessionManager, build_http_client};
use compute_cli::config::Config;
use std::sync::Arc;

mod login;
mod track;
mod wait;

pub use login::{LoginArgs, login_command};
pub use track::{TrackArgs, track_command};
pub use wait::{WaitArgs, wait_command};

/// Session, task client and polling defaults built once from the config
pub struct Services {
    pub session: Arc<SessionManager>,
    pub client: Arc<HttpTaskClient>,
    pub polling: PollingConfig,
}

impl Services {
    pub fn from_config(config: &Config) -> Result<Self> {
        let identity = config.identity()?;
        let http_client = build_http_client(config.request_timeout())
            .context("Failed to build HTTP client")?;

        let session = Arc::new(
            SessionManager::oidc(identity, http_client.clone())
                .with_static_headers(config.api.headers.clone()),
        );
        let client = Arc::new(HttpTaskClient::new(
            config.api_url()?,
            http_client,
            session.clone(),
        ));

        Ok(Self {
            session,
            client,
            polling: config.polling(),
        })
    }
}
