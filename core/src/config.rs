//! Client configuration.
//!
//! A `ClientConfig` is assembled once, either explicitly through the builder
//! methods or from the environment, and is never mutated after the client
//! takes ownership of it.

use std::env;
use std::fmt;
use std::time::Duration;

use tracing::warn;

use crate::error::ConfigError;

/// Production partner API root.
pub const DEFAULT_BASE_URL: &str = "https://partner.instinctvet.com/v1/";

/// Applied to the token exchange and every request alike.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// What happens to the held token when an authenticated request comes back
/// with HTTP 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReauthPolicy {
    /// Keep the token until the process ends or `clear_token` is called.
    Retain,
    /// Drop the token so the next call performs a fresh exchange. The call
    /// that saw the 401 still returns it unchanged.
    #[default]
    ClearOnUnauthorized,
}

#[derive(Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub timeout: Duration,
    pub reauth_policy: ReauthPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            client_id: None,
            client_secret: None,
            timeout: DEFAULT_TIMEOUT,
            reauth_policy: ReauthPolicy::default(),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("reauth_policy", &self.reauth_policy)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self::default().with_credentials(client_id, client_secret)
    }

    /// Create configuration from environment variables
    ///
    /// Reads the following environment variables:
    /// - `INSTINCT_BASE_URL`: API root (defaults to production)
    /// - `INSTINCT_CLIENT_ID`, `INSTINCT_CLIENT_SECRET`: OAuth2 client credentials
    /// - `INSTINCT_TIMEOUT_SECS`: request timeout in seconds
    ///
    /// Never fails. Missing credentials stay `None`, so every authenticated
    /// call will resolve to no result until they are supplied.
    pub fn from_env() -> Self {
        let base_url = env::var("INSTINCT_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let client_id = env::var("INSTINCT_CLIENT_ID").ok();
        let client_secret = env::var("INSTINCT_CLIENT_SECRET").ok();

        let timeout = match env::var("INSTINCT_TIMEOUT_SECS") {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) => Duration::from_secs(secs),
                Err(_) => {
                    warn!(value = %raw, "ignoring unparseable INSTINCT_TIMEOUT_SECS");
                    DEFAULT_TIMEOUT
                }
            },
            Err(_) => DEFAULT_TIMEOUT,
        };

        if client_id.is_none() || client_secret.is_none() {
            warn!("partner API credentials not found in environment");
        }

        Self {
            base_url,
            client_id,
            client_secret,
            timeout,
            reauth_policy: ReauthPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(client_secret.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_reauth_policy(mut self, policy: ReauthPolicy) -> Self {
        self.reauth_policy = policy;
        self
    }

    /// Both the client id and the secret are present and non-empty.
    pub fn has_credentials(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        present(&self.client_id) && present(&self.client_secret)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::InvalidBaseUrl(self.base_url.clone()));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}
