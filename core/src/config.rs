//! Client configuration.
//!
//! Recognized options: `domain` (required), `secret` (sent as
//! `X-Client-Secret` on every request), `connect_timeout` and `timeout` in
//! milliseconds. Configuration can come from code, from JSON, or from
//! environment variables sharing a prefix.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ApiError;

pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2500;
pub const DEFAULT_TIMEOUT_MS: u64 = 4000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    secret: Option<String>,
    #[serde(default = "default_connect_timeout")]
    connect_timeout: u64,
    #[serde(default = "default_timeout")]
    timeout: u64,
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            domain: String::new(),
            secret: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_MS,
            timeout: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl ClientConfig {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ..Self::default()
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout.as_millis() as u64;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout.as_millis() as u64;
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }

    /// Parse a JSON document such as
    /// `{"domain": "https://api.example.com", "secret": "..."}`.
    pub fn from_json(raw: &str) -> Result<Self, ApiError> {
        serde_json::from_str(raw).map_err(|e| ApiError::Config(e.to_string()))
    }

    /// Read `<PREFIX>_DOMAIN`, `<PREFIX>_SECRET`, `<PREFIX>_CONNECT_TIMEOUT`
    /// and `<PREFIX>_TIMEOUT`.
    pub fn from_env(prefix: &str) -> Result<Self, ApiError> {
        let var = |name: &str| std::env::var(format!("{prefix}_{name}")).ok();

        let domain = var("DOMAIN").ok_or_else(|| ApiError::Config(format!("{prefix}_DOMAIN is not set")))?;
        let mut config = Self::new(domain);
        config.secret = var("SECRET").filter(|s| !s.is_empty());
        if let Some(raw) = var("CONNECT_TIMEOUT") {
            config.connect_timeout = parse_millis(&format!("{prefix}_CONNECT_TIMEOUT"), &raw)?;
        }
        if let Some(raw) = var("TIMEOUT") {
            config.timeout = parse_millis(&format!("{prefix}_TIMEOUT"), &raw)?;
        }
        Ok(config)
    }

    /// Check that `domain` is present and is an absolute URL.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.domain.trim().is_empty() {
            return Err(ApiError::Config("domain is required".to_string()));
        }
        Url::parse(&self.domain)
            .map_err(|e| ApiError::Config(format!("invalid domain `{}`: {e}", self.domain)))?;
        Ok(())
    }
}

fn parse_millis(name: &str, raw: &str) -> Result<u64, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::Config(format!("{name} must be a whole number of milliseconds, got `{raw}`")))
}
