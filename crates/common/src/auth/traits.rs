//! Traits for OAuth token operations
//!
//! The identity provider's token endpoint sits behind [`TokenEndpoint`] so
//! the token manager can be exercised against mocks and so a deployment can
//! swap the HTTP implementation.

use async_trait::async_trait;
use thiserror::Error;

use super::types::TokenResponse;
use crate::error::{ErrorClassification, ErrorSeverity};

/// Failure talking to the token endpoint
///
/// `Clone` because a single refresh result is shared by every caller waiting
/// on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenEndpointError {
    /// Provider answered with a non-success status
    #[error("token endpoint rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Provider answered 2xx with a body that is not a token response
    #[error("malformed token response: {0}")]
    Malformed(String),

    /// Transport failure or timeout
    #[error("network error: {0}")]
    Network(String),
}

impl ErrorClassification for TokenEndpointError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Network(_) => ErrorSeverity::Warning,
            Self::Rejected { .. } | Self::Malformed(_) => ErrorSeverity::Error,
        }
    }
}

/// Trait for token endpoint operations
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// Exchange an authorization code (authorization_code grant + PKCE
    /// verifier) for tokens
    ///
    /// # Errors
    /// `Rejected`/`Malformed` when the provider refuses or garbles the
    /// response, `Network` on transport failure. Implementations must not
    /// retry.
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        scopes: &[String],
    ) -> Result<TokenResponse, TokenEndpointError>;

    /// Obtain a new access token with a refresh token (refresh_token grant)
    ///
    /// # Errors
    /// Same classification as [`TokenEndpoint::exchange_code`].
    async fn refresh(
        &self,
        refresh_token: &str,
        scopes: &[String],
    ) -> Result<TokenResponse, TokenEndpointError>;
}
