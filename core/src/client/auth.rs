//! Request credentials for the workflow service
//!
//! Every request carries the target database name and, when configured, a
//! bearer token and an API key.

use crate::error::{CoreError, CoreResult};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

const DB_NAME_HEADER: &str = "x-dbname";
const API_KEY_HEADER: &str = "x-api-key";

/// Credentials applied to each request.
#[derive(Clone, Default)]
pub struct ApiCredentials {
    pub db_name: String,
    pub token: Option<String>,
    pub api_key: Option<String>,
}

impl ApiCredentials {
    pub fn new(db_name: impl Into<String>) -> Self {
        Self {
            db_name: db_name.into(),
            token: None,
            api_key: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Build the default header map sent with every request.
    pub fn headers(&self) -> CoreResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static(DB_NAME_HEADER),
            header_value(&self.db_name, "database name")?,
        );
        if let Some(token) = &self.token {
            headers.insert(
                AUTHORIZATION,
                header_value(&format!("Bearer {}", token), "token")?,
            );
        }
        if let Some(api_key) = &self.api_key {
            headers.insert(
                HeaderName::from_static(API_KEY_HEADER),
                header_value(api_key, "API key")?,
            );
        }
        Ok(headers)
    }
}

fn header_value(value: &str, what: &str) -> CoreResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| CoreError::InvalidConfiguration(format!("{} is not a valid header value", what)))
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("db_name", &self.db_name)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
