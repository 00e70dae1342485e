//! Error types used throughout the gateway

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for AuthGate
///
/// Every layer above `authgate-common` converts its module-level errors into
/// this enum before crossing a crate boundary. The HTTP layer maps variants to
/// status codes; [`AuthGateError::NotAuthenticated`] is a control-flow signal
/// ("send the user to the start endpoint"), not a fault.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum AuthGateError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing, expired or already-consumed PKCE binding.
    #[error("Invalid or expired state: {0}")]
    InvalidState(String),

    #[error("State already in use: {0}")]
    DuplicateState(String),

    /// The identity provider reported an error on the redirect, or the
    /// callback arrived without a code.
    #[error("Authorization failed: {0}")]
    AuthorizationFailed(String),

    /// The token endpoint rejected the code or returned a malformed body.
    #[error("Token exchange failed: {0}")]
    ExchangeFailed(String),

    /// Transport failure or timeout talking to the identity provider.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    /// Resource API error for an otherwise valid token.
    #[error("Upstream error ({status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthGateError {
    /// Short machine-readable label used in logs and failure pages.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::InvalidState(_) => "invalid_state",
            Self::DuplicateState(_) => "duplicate_state",
            Self::AuthorizationFailed(_) => "provider_error",
            Self::ExchangeFailed(_) => "exchange_failed",
            Self::Network(_) => "network_error",
            Self::NotAuthenticated => "not_authenticated",
            Self::Upstream { .. } => "upstream_error",
            Self::NotFound(_) => "not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::Internal(_) => "internal",
        }
    }

    /// Whether restarting the flow could succeed without operator action.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::DuplicateState(_))
    }

    #[must_use]
    pub const fn requires_authentication(&self) -> bool {
        matches!(self, Self::NotAuthenticated)
    }
}

/// Result type alias for AuthGate operations
pub type Result<T> = std::result::Result<T, AuthGateError>;
