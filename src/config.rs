use crate::api::constants::polling;
use crate::api::{Identity, PollingConfig, TrackerConfig, WaitBudget};
use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_API_URL: &str = "COMPUTE_API_URL";
pub const ENV_ISSUER_URL: &str = "COMPUTE_ISSUER_URL";
pub const ENV_REALM: &str = "COMPUTE_REALM";
pub const ENV_CLIENT_ID: &str = "COMPUTE_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "COMPUTE_CLIENT_SECRET";
pub const ENV_USERNAME: &str = "COMPUTE_USERNAME";
pub const ENV_PASSWORD: &str = "COMPUTE_PASSWORD";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub polling: PollingSettings,
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub issuer_url: String,
    #[serde(default)]
    pub realm: String,
    #[serde(default)]
    pub client_id: String,
    pub client_secret: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("issuer_url", &self.issuer_url)
            .field("realm", &self.realm)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Extra headers sent with every request
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            request_timeout_secs: default_request_timeout_secs(),
            headers: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingSettings {
    #[serde(default = "default_tracker_interval_ms")]
    pub tracker_interval_ms: u64,
    #[serde(default = "default_error_tolerance")]
    pub error_tolerance: u32,
    #[serde(default = "default_not_found_backoff")]
    pub not_found_backoff: f64,
    #[serde(default = "default_wait_interval_ms")]
    pub wait_interval_ms: u64,
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
}

fn default_tracker_interval_ms() -> u64 {
    polling::TRACKER_INTERVAL.as_millis() as u64
}

fn default_error_tolerance() -> u32 {
    polling::TRACKER_ERROR_TOLERANCE
}

fn default_not_found_backoff() -> f64 {
    polling::NOT_FOUND_BACKOFF
}

fn default_wait_interval_ms() -> u64 {
    polling::WAITER_INTERVAL.as_millis() as u64
}

fn default_max_wait_secs() -> u64 {
    polling::WAITER_MAX_WAIT.as_secs()
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            tracker_interval_ms: default_tracker_interval_ms(),
            error_tolerance: default_error_tolerance(),
            not_found_backoff: default_not_found_backoff(),
            wait_interval_ms: default_wait_interval_ms(),
            max_wait_secs: default_max_wait_secs(),
        }
    }
}

impl Config {
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "linux") {
            // Use XDG config directory on Linux
            dirs::config_dir()
                .context("Failed to get XDG config directory")?
                .join("compute-cli")
        } else {
            // Use home directory with dot prefix on Windows/Mac
            dirs::home_dir()
                .context("Failed to get home directory")?
                .join(".compute-cli")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Load the config file (explicit path, or the default location when it
    /// exists), then apply environment overrides. A `.env` file in the
    /// working directory is honored.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Self::get_config_path()?;
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    info!("No config file at {:?}, using environment only", default_path);
                    Self::default()
                }
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading config from: {:?}", path);
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Override file values with whatever `lookup` returns for the
    /// `COMPUTE_*` variables
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(url) = non_empty(ENV_API_URL) {
            self.api.url = url;
        }
        if let Some(issuer_url) = non_empty(ENV_ISSUER_URL) {
            self.auth.issuer_url = issuer_url;
        }
        if let Some(realm) = non_empty(ENV_REALM) {
            self.auth.realm = realm;
        }
        if let Some(client_id) = non_empty(ENV_CLIENT_ID) {
            self.auth.client_id = client_id;
        }
        if let Some(secret) = non_empty(ENV_CLIENT_SECRET) {
            self.auth.client_secret = Some(secret);
        }
        if let Some(username) = non_empty(ENV_USERNAME) {
            self.auth.username = Some(username);
        }
        if let Some(password) = non_empty(ENV_PASSWORD) {
            self.auth.password = Some(password);
        }
    }

    /// Whether the password flow is configured but the password is missing
    pub fn needs_password(&self) -> bool {
        self.auth.client_secret.as_deref().is_none_or(str::is_empty)
            && self.auth.username.as_deref().is_some_and(|u| !u.is_empty())
            && self.auth.password.as_deref().is_none_or(str::is_empty)
    }

    pub fn identity(&self) -> Result<Identity> {
        Identity::new(
            self.auth.issuer_url.clone(),
            self.auth.realm.clone(),
            self.auth.client_id.clone(),
            self.auth.client_secret.clone(),
            self.auth.username.clone().unwrap_or_default(),
            self.auth.password.clone(),
        )
        .context("Invalid authentication settings")
    }

    pub fn api_url(&self) -> Result<&str> {
        if self.api.url.is_empty() {
            anyhow::bail!("API url is not configured (set {} or [api].url)", ENV_API_URL);
        }
        Ok(&self.api.url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    pub fn polling(&self) -> PollingConfig {
        let settings = &self.polling;
        PollingConfig {
            tracker: TrackerConfig {
                poll_interval: Duration::from_millis(settings.tracker_interval_ms),
                error_tolerance: settings.error_tolerance,
                not_found_backoff: settings.not_found_backoff,
            },
            wait: WaitBudget::new(
                Duration::from_millis(settings.wait_interval_ms),
                Duration::from_secs(settings.max_wait_secs),
            ),
        }
    }
}
