//! Configuration management
//!
//! Plain data structures; loading from the environment or a file lives in
//! `authgate-infra`.

use std::time::Duration;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::constants::{
    CALLBACK_PATH, DEFAULT_AUTHORITY, DEFAULT_GRAPH_BASE_URL, DEFAULT_HANDOFF_TTL_SECS,
    DEFAULT_HOST, DEFAULT_PKCE_CAPACITY, DEFAULT_PKCE_TTL_SECS, DEFAULT_PORT, DEFAULT_PUBLIC_URL,
    DEFAULT_REFRESH_THRESHOLD_SECS, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SCOPES, DEFAULT_SESSION_CAPACITY,
    DEFAULT_SHUTDOWN_GRACE_SECS, DEFAULT_SWEEP_INTERVAL_SECS, DEFAULT_TENANT,
    DEFAULT_USER_CAPACITY, DEFAULT_USER_TTL_SECS, MAX_TTL_SECS,
};
use crate::errors::{AuthGateError, Result};

/// Gateway configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub cache: CacheConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Externally visible base URL, used to build the redirect URI.
    pub public_url: String,
    /// Where a completed flow lands when the caller supplied no `return_url`.
    pub default_return_url: Option<String>,
    /// Consumer origins (`scheme://host[:port]`) absolute redirects may
    /// target, besides `public_url` itself.
    pub allowed_return_origins: Vec<String>,
    pub shutdown_grace_seconds: u64,
}

/// Identity provider configuration (public client, no secret)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub client_id: String,
    pub tenant: String,
    pub authority: String,
    pub graph_base_url: String,
    pub scopes: Vec<String>,
    pub request_timeout_seconds: u64,
    pub refresh_threshold_seconds: u64,
}

/// Lifetimes and capacity bounds for the in-memory stores
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub pkce_ttl_seconds: u64,
    pub pkce_capacity: usize,
    pub user_ttl_seconds: u64,
    pub user_capacity: usize,
    pub session_capacity: usize,
    /// Lifetime of a single-use session handoff code
    pub handoff_ttl_seconds: u64,
    pub sweep_interval_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            public_url: DEFAULT_PUBLIC_URL.to_string(),
            default_return_url: None,
            allowed_return_origins: Vec::new(),
            shutdown_grace_seconds: DEFAULT_SHUTDOWN_GRACE_SECS,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            tenant: DEFAULT_TENANT.to_string(),
            authority: DEFAULT_AUTHORITY.to_string(),
            graph_base_url: DEFAULT_GRAPH_BASE_URL.to_string(),
            scopes: DEFAULT_SCOPES.iter().map(ToString::to_string).collect(),
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECS,
            refresh_threshold_seconds: DEFAULT_REFRESH_THRESHOLD_SECS,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            pkce_ttl_seconds: DEFAULT_PKCE_TTL_SECS,
            pkce_capacity: DEFAULT_PKCE_CAPACITY,
            user_ttl_seconds: DEFAULT_USER_TTL_SECS,
            user_capacity: DEFAULT_USER_CAPACITY,
            session_capacity: DEFAULT_SESSION_CAPACITY,
            handoff_ttl_seconds: DEFAULT_HANDOFF_TTL_SECS,
            sweep_interval_seconds: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

impl GatewayConfig {
    /// Config with defaults everywhere except the client id.
    #[must_use]
    pub fn for_client(client_id: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.provider.client_id = client_id.into();
        config
    }

    /// Reject configurations the gateway cannot run with.
    ///
    /// # Errors
    /// Returns [`AuthGateError::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.provider.client_id.trim().is_empty() {
            return Err(config_error("provider.client_id must not be empty"));
        }
        if self.server.port == 0 {
            return Err(config_error("server.port must be non-zero"));
        }
        if !is_http_url(&self.server.public_url) {
            return Err(config_error("server.public_url must be an http(s) URL"));
        }
        if let Some(origin) =
            self.server.allowed_return_origins.iter().find(|origin| !is_http_url(origin))
        {
            return Err(config_error(&format!(
                "server.allowed_return_origins entry {origin} must be an http(s) URL"
            )));
        }
        if !is_http_url(&self.provider.authority) {
            return Err(config_error("provider.authority must be an http(s) URL"));
        }
        if !is_http_url(&self.provider.graph_base_url) {
            return Err(config_error("provider.graph_base_url must be an http(s) URL"));
        }
        if self.provider.scopes.is_empty() {
            return Err(config_error("provider.scopes must not be empty"));
        }
        if self.provider.request_timeout_seconds == 0 {
            return Err(config_error("provider.request_timeout_seconds must be non-zero"));
        }

        let ttls = [
            ("cache.pkce_ttl_seconds", self.cache.pkce_ttl_seconds),
            ("cache.user_ttl_seconds", self.cache.user_ttl_seconds),
            ("cache.handoff_ttl_seconds", self.cache.handoff_ttl_seconds),
            ("cache.sweep_interval_seconds", self.cache.sweep_interval_seconds),
        ];
        for (field, value) in ttls {
            if value == 0 || value > MAX_TTL_SECS {
                return Err(config_error(&format!("{field} must be between 1 and {MAX_TTL_SECS}")));
            }
        }

        if self.provider.refresh_threshold_seconds > MAX_TTL_SECS {
            return Err(config_error(&format!(
                "provider.refresh_threshold_seconds must be at most {MAX_TTL_SECS}"
            )));
        }

        let capacities = [
            ("cache.pkce_capacity", self.cache.pkce_capacity),
            ("cache.user_capacity", self.cache.user_capacity),
            ("cache.session_capacity", self.cache.session_capacity),
        ];
        for (field, value) in capacities {
            if value == 0 {
                return Err(config_error(&format!("{field} must be non-zero")));
            }
        }

        Ok(())
    }
}

impl ServerConfig {
    /// `host:port` string for binding the listener.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    #[must_use]
    pub fn redirect_uri(&self) -> String {
        format!("{}{CALLBACK_PATH}", self.public_url.trim_end_matches('/'))
    }

    #[must_use]
    pub const fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_seconds)
    }
}

impl ProviderConfig {
    fn tenant_base(&self) -> String {
        format!("{}/{}", self.authority.trim_end_matches('/'), self.tenant)
    }

    #[must_use]
    pub fn authorization_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/authorize", self.tenant_base())
    }

    #[must_use]
    pub fn token_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/token", self.tenant_base())
    }

    #[must_use]
    pub fn admin_consent_endpoint(&self) -> String {
        format!("{}/adminconsent", self.tenant_base())
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    #[must_use]
    pub fn refresh_threshold(&self) -> TimeDelta {
        seconds(self.refresh_threshold_seconds)
    }
}

impl CacheConfig {
    #[must_use]
    pub fn pkce_ttl(&self) -> TimeDelta {
        seconds(self.pkce_ttl_seconds)
    }

    #[must_use]
    pub fn user_ttl(&self) -> TimeDelta {
        seconds(self.user_ttl_seconds)
    }

    #[must_use]
    pub fn handoff_ttl(&self) -> TimeDelta {
        seconds(self.handoff_ttl_seconds)
    }

    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}

/// Saturating conversion from a second count to a [`TimeDelta`].
#[must_use]
pub fn seconds(value: u64) -> TimeDelta {
    i64::try_from(value).ok().and_then(TimeDelta::try_seconds).unwrap_or(TimeDelta::MAX)
}

fn config_error(message: &str) -> AuthGateError {
    AuthGateError::Config(message.to_string())
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}
