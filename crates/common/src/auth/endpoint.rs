//! HTTP token endpoint client
//!
//! Posts form-encoded grants to the provider's token URL. Every request is
//! bounded by the client timeout; a timeout surfaces as
//! [`TokenEndpointError::Network`], never as a rejection.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::{debug, warn};

use super::traits::{TokenEndpoint, TokenEndpointError};
use super::types::{OAuthError, TokenResponse};

/// Token endpoint settings for a public (secretless) client
#[derive(Debug, Clone)]
pub struct TokenEndpointConfig {
    pub token_url: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub timeout: Duration,
}

/// reqwest-backed [`TokenEndpoint`]
#[derive(Debug, Clone)]
pub struct HttpTokenEndpoint {
    client: Client,
    config: TokenEndpointConfig,
}

impl HttpTokenEndpoint {
    /// Build the endpoint client with the configured timeout
    ///
    /// # Errors
    /// Returns [`TokenEndpointError::Network`] if the HTTP client cannot be
    /// constructed (TLS backend initialisation).
    pub fn new(config: TokenEndpointConfig) -> Result<Self, TokenEndpointError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TokenEndpointError::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    #[must_use]
    pub fn token_url(&self) -> &str {
        &self.config.token_url
    }

    async fn post_grant(
        &self,
        grant: &'static str,
        form: &[(&str, &str)],
    ) -> Result<TokenResponse, TokenEndpointError> {
        debug!(grant, url = %self.config.token_url, "posting token grant");

        let response = self
            .client
            .post(&self.config.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| map_transport_error(&e))?;

        parse_token_response(grant, response).await
    }
}

#[async_trait]
impl TokenEndpoint for HttpTokenEndpoint {
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        scopes: &[String],
    ) -> Result<TokenResponse, TokenEndpointError> {
        let scope = scopes.join(" ");
        let form = [
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("code_verifier", code_verifier),
            ("scope", scope.as_str()),
        ];

        self.post_grant("authorization_code", &form).await
    }

    async fn refresh(
        &self,
        refresh_token: &str,
        scopes: &[String],
    ) -> Result<TokenResponse, TokenEndpointError> {
        let scope = scopes.join(" ");
        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("refresh_token", refresh_token),
            ("scope", scope.as_str()),
        ];

        self.post_grant("refresh_token", &form).await
    }
}

fn map_transport_error(error: &reqwest::Error) -> TokenEndpointError {
    if error.is_timeout() {
        TokenEndpointError::Network("token endpoint timed out".to_string())
    } else {
        TokenEndpointError::Network(error.to_string())
    }
}

async fn parse_token_response(
    grant: &'static str,
    response: Response,
) -> Result<TokenResponse, TokenEndpointError> {
    let status = response.status();
    let body = response.text().await.map_err(|e| map_transport_error(&e))?;

    if !status.is_success() {
        let message = serde_json::from_str::<OAuthError>(&body)
            .map_or_else(|_| truncate_body(&body), |err| err.to_string());
        warn!(grant, status = status.as_u16(), "token endpoint rejected grant");
        return Err(TokenEndpointError::Rejected { status: status.as_u16(), message });
    }

    serde_json::from_str::<TokenResponse>(&body)
        .map_err(|e| TokenEndpointError::Malformed(e.to_string()))
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 256;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let cut = (0..=MAX).rev().find(|i| body.is_char_boundary(*i)).unwrap_or(0);
        format!("{}...", &body[..cut])
    }
}
