//! HTTP client configuration

use super::auth::ApiCredentials;
use crate::error::{CoreError, CoreResult};
use std::time::Duration;

/// Default service address.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000";
/// Default database name sent as `x-dbname`.
pub const DEFAULT_DB_NAME: &str = "postgres";

/// Connection settings for [`HttpWorkflowClient`](super::HttpWorkflowClient).
#[derive(Clone)]
pub struct ClientConfig {
    /// Service base URL without trailing slash
    pub base_url: String,
    /// Target database, sent with every request
    pub db_name: String,
    /// Bearer token
    pub token: Option<String>,
    /// Backend-to-backend API key
    pub api_key: Option<String>,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Delay between empty queue polls
    pub poll_interval: Duration,
    /// Buffer of each subscription channel
    pub subscription_buffer: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            db_name: DEFAULT_DB_NAME.to_string(),
            token: None,
            api_key: None,
            request_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
            subscription_buffer: 64,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::default().with_base_url(base_url)
    }

    /// Read settings from `ROCKETFLOW_URL`, `ROCKETFLOW_DB`,
    /// `ROCKETFLOW_TOKEN` and `ROCKETFLOW_API_KEY`. Unset variables keep
    /// their defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("ROCKETFLOW_URL") {
            config = config.with_base_url(url);
        }
        if let Ok(db) = std::env::var("ROCKETFLOW_DB") {
            config.db_name = db;
        }
        config.token = std::env::var("ROCKETFLOW_TOKEN").ok();
        config.api_key = std::env::var("ROCKETFLOW_API_KEY").ok();
        config
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_db_name(mut self, db_name: impl Into<String>) -> Self {
        self.db_name = db_name.into();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Check the settings before building a client.
    pub fn validate(&self) -> CoreResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(CoreError::InvalidConfiguration(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.db_name.is_empty() {
            return Err(CoreError::InvalidConfiguration(
                "db_name must not be empty".to_string(),
            ));
        }
        if self.request_timeout.is_zero() || self.poll_interval.is_zero() {
            return Err(CoreError::InvalidConfiguration(
                "timeouts must be positive".to_string(),
            ));
        }
        if self.subscription_buffer == 0 {
            return Err(CoreError::InvalidConfiguration(
                "subscription_buffer must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Credentials derived from this configuration.
    pub fn credentials(&self) -> ApiCredentials {
        ApiCredentials {
            db_name: self.db_name.clone(),
            token: self.token.clone(),
            api_key: self.api_key.clone(),
        }
    }

    /// Base URL of the workflow API.
    pub fn workflows_url(&self) -> String {
        format!("{}/api/workflows", self.base_url)
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("db_name", &self.db_name)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout", &self.request_timeout)
            .field("poll_interval", &self.poll_interval)
            .field("subscription_buffer", &self.subscription_buffer)
            .finish()
    }
}
