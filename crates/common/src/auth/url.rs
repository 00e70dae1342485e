//! Authorization URL builder
//!
//! Pure and deterministic: the same inputs always produce the same URL, with
//! parameters in a fixed order.

use super::pkce::CHALLENGE_METHOD;

/// Builds provider authorization-request URLs for one client registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUrlBuilder {
    authorization_endpoint: String,
    client_id: String,
    redirect_uri: String,
    scopes: Vec<String>,
}

impl AuthUrlBuilder {
    #[must_use]
    pub fn new(
        authorization_endpoint: impl Into<String>,
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            authorization_endpoint: authorization_endpoint.into(),
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            scopes,
        }
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Authorization URL for a stored challenge
    #[must_use]
    pub fn build(&self, code_challenge: &str, state: &str) -> String {
        build_authorization_url(
            &self.authorization_endpoint,
            &self.client_id,
            &self.redirect_uri,
            &self.scopes,
            code_challenge,
            state,
        )
    }
}

/// Build the authorization URL
///
/// Parameter order: `client_id, response_type=code, redirect_uri, scope,
/// response_mode=query, code_challenge, code_challenge_method, state`.
#[must_use]
pub fn build_authorization_url(
    authorization_endpoint: &str,
    client_id: &str,
    redirect_uri: &str,
    scopes: &[String],
    code_challenge: &str,
    state: &str,
) -> String {
    let scope = scopes.join(" ");
    let params = [
        ("client_id", client_id),
        ("response_type", "code"),
        ("redirect_uri", redirect_uri),
        ("scope", scope.as_str()),
        ("response_mode", "query"),
        ("code_challenge", code_challenge),
        ("code_challenge_method", CHALLENGE_METHOD),
        ("state", state),
    ];

    let query = params
        .iter()
        .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&");

    let separator = if authorization_endpoint.contains('?') { '&' } else { '?' };
    format!("{authorization_endpoint}{separator}{query}")
}
