//! OAuth 2.0 types and structures
//!
//! Token sets, raw token endpoint responses, the provider error body and the
//! caller context carried from the start of a flow to its callback.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::privacy::redact;
use crate::time::expires_after;

/// OAuth 2.0 access and refresh tokens with metadata
///
/// `Debug` output redacts every credential, so a `TokenSet` can appear in
/// tracing fields without leaking bearer material.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    /// Bearer access token for resource API calls
    pub access_token: String,

    /// Refresh token; optional because not every grant issues one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// ID token (OpenID Connect), kept opaque
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    /// Token type (always "Bearer" for OAuth 2.0)
    pub token_type: String,

    /// Access token lifetime in seconds, as issued
    pub expires_in: i64,

    /// Absolute expiration timestamp computed at issue time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Granted scopes (space-separated)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl TokenSet {
    /// Create a new `TokenSet` issued at `issued_at`
    ///
    /// A non-positive `expires_in` leaves `expires_at` unset, meaning the
    /// token is treated as non-expiring. Lifetimes past the representable
    /// range saturate at the latest instant.
    #[must_use]
    pub fn new(
        access_token: String,
        refresh_token: Option<String>,
        id_token: Option<String>,
        expires_in: i64,
        scope: Option<String>,
        issued_at: DateTime<Utc>,
    ) -> Self {
        let expires_at = if expires_in > 0 {
            let lifetime = TimeDelta::try_seconds(expires_in).unwrap_or(TimeDelta::MAX);
            Some(expires_after(issued_at, lifetime))
        } else {
            None
        };

        Self {
            access_token,
            refresh_token,
            id_token,
            token_type: "Bearer".to_string(),
            expires_in,
            expires_at,
            scope,
        }
    }

    /// Build a token set from a token endpoint response
    #[must_use]
    pub fn from_response(response: TokenResponse, issued_at: DateTime<Utc>) -> Self {
        let mut tokens = Self::new(
            response.access_token,
            response.refresh_token,
            response.id_token,
            response.expires_in,
            response.scope,
            issued_at,
        );
        if let Some(token_type) = response.token_type {
            tokens.token_type = token_type;
        }
        tokens
    }

    /// `true` once `now` has reached `expires_at`
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }

    /// `true` when the token expires within `threshold` of `now`
    #[must_use]
    pub fn needs_refresh(&self, now: DateTime<Utc>, threshold: TimeDelta) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_after(now, threshold) >= expires_at)
    }

    /// Seconds left until expiry, or `None` when no expiry is set
    #[must_use]
    pub fn seconds_until_expiry(&self, now: DateTime<Utc>) -> Option<i64> {
        self.expires_at.map(|expires_at| (expires_at - now).num_seconds())
    }

    /// Granted scopes as a set
    #[must_use]
    pub fn scopes(&self) -> BTreeSet<String> {
        self.scope
            .as_deref()
            .map(|scope| scope.split_whitespace().map(ToString::to_string).collect())
            .unwrap_or_default()
    }

    /// Carry the previous refresh token forward when a refresh response
    /// omitted a new one
    #[must_use]
    pub fn inherit_refresh_token(mut self, previous: &Self) -> Self {
        if self.refresh_token.is_none() {
            self.refresh_token.clone_from(&previous.refresh_token);
        }
        if self.scope.is_none() {
            self.scope.clone_from(&previous.scope);
        }
        self
    }
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &self.refresh_token.as_deref().map(redact))
            .field("id_token", &self.id_token.as_ref().map(|_| "<present>"))
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .finish()
    }
}

/// OAuth token response from authorization server
///
/// Standard OAuth 2.0 token response format (RFC 6749).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: i64,
    pub scope: Option<String>,
}

/// OAuth error response from authorization server
///
/// Standard OAuth 2.0 error response format (RFC 6749 §5.2).
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthError {
    pub error: String,
    pub error_description: Option<String>,
}

impl fmt::Display for OAuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_description {
            Some(desc) => write!(f, "{}: {}", self.error, desc),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for OAuthError {}

/// Caller context recorded when a flow starts and handed back on callback
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationContext {
    /// Where to send the browser once the flow completes
    pub return_url: Option<String>,
    /// Consumer session that started the flow; only this value may redeem
    /// the session handoff issued at callback
    pub requester: Option<String>,
}
