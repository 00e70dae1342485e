//! OAuth client: token manager plus resource fetcher behind single calls
//!
//! `authenticate_with_code` is the only transition from unauthenticated to
//! authenticated; `get_user_data` is "valid token, then fetch".

use std::sync::Arc;

use authgate_common::auth::{
    PkceStoreError, TokenEndpointError, TokenManager, TokenManagerError, TokenSet,
};
use authgate_domain::{AuthGateError, DataKind, Result};
use serde_json::Value;
use tracing::{debug, info};

use super::ports::ResourceFetcher;

/// Shared OAuth client, constructed once at startup and passed explicitly
pub struct OAuthClient {
    tokens: Arc<TokenManager>,
    fetcher: Arc<dyn ResourceFetcher>,
}

impl OAuthClient {
    #[must_use]
    pub fn new(tokens: Arc<TokenManager>, fetcher: Arc<dyn ResourceFetcher>) -> Self {
        Self { tokens, fetcher }
    }

    #[must_use]
    pub fn token_manager(&self) -> &TokenManager {
        &self.tokens
    }

    /// Exchange an authorization code for tokens
    ///
    /// # Errors
    /// `ExchangeFailed` when the provider rejects the code, `Network` on
    /// transport failure.
    pub async fn authenticate_with_code(
        &self,
        code: &str,
        scopes: &[String],
        pkce_verifier: &str,
    ) -> Result<TokenSet> {
        self.tokens.exchange_code(code, pkce_verifier, scopes).await.map_err(map_token_error)
    }

    /// Bind freshly exchanged tokens to a resolved account
    pub fn adopt_tokens(&self, account: &str, tokens: TokenSet) {
        self.tokens.store_tokens(account, tokens);
    }

    /// Valid (possibly refreshed) token for `account`
    pub async fn get_valid_token(&self, account: &str) -> Option<TokenSet> {
        self.tokens.get_valid_token(account).await
    }

    /// Fetch a resource with an explicit token set
    ///
    /// Used right after the code exchange, before the account is known.
    ///
    /// # Errors
    /// Propagates the fetcher's `Upstream`/`Network` errors.
    pub async fn fetch_with_token(&self, kind: DataKind, tokens: &TokenSet) -> Result<Value> {
        debug!(kind = %kind, "fetching provider resource");
        self.fetcher.fetch(kind, &tokens.access_token).await
    }

    /// Fetch a resource for `account` using its current valid token
    ///
    /// # Errors
    /// `NotAuthenticated` if the account has no valid token; otherwise the
    /// fetcher's `Upstream`/`Network` errors.
    pub async fn get_user_data(&self, account: &str, kind: DataKind) -> Result<Value> {
        let tokens =
            self.get_valid_token(account).await.ok_or(AuthGateError::NotAuthenticated)?;
        self.fetch_with_token(kind, &tokens).await
    }

    /// Drop the account's tokens. Idempotent.
    pub fn logout(&self, account: &str) {
        self.tokens.revoke(account);
        info!(account, "logged out of provider session");
    }
}

/// Map token manager failures onto the gateway taxonomy
#[must_use]
pub fn map_token_error(error: TokenManagerError) -> AuthGateError {
    match error {
        TokenManagerError::Pkce(PkceStoreError::DuplicateState) => {
            AuthGateError::DuplicateState("state already has a live challenge".to_string())
        }
        TokenManagerError::Pkce(PkceStoreError::EmptyState) => {
            AuthGateError::InvalidInput("state must not be empty".to_string())
        }
        TokenManagerError::Exchange(endpoint) => map_endpoint_error(endpoint),
    }
}

/// Map token endpoint failures onto the gateway taxonomy
#[must_use]
pub fn map_endpoint_error(error: TokenEndpointError) -> AuthGateError {
    match error {
        TokenEndpointError::Rejected { status, message } => {
            AuthGateError::ExchangeFailed(format!("provider returned {status}: {message}"))
        }
        TokenEndpointError::Malformed(message) => AuthGateError::ExchangeFailed(message),
        TokenEndpointError::Network(message) => AuthGateError::Network(message),
    }
}

#[cfg(test)]
mod tests {
    use authgate_common::auth::PkceStore;
    use authgate_common::testing::{token_response, MockTokenEndpoint};
    use authgate_common::time::{Clock, MockClock};
    use chrono::TimeDelta;

    use super::*;
    use crate::testing::{sample_profile, MockResourceFetcher};

    fn client() -> (OAuthClient, Arc<MockTokenEndpoint>, Arc<MockResourceFetcher>, MockClock) {
        let clock = MockClock::new();
        let endpoint = Arc::new(MockTokenEndpoint::new());
        let fetcher = Arc::new(MockResourceFetcher::new());
        let manager = TokenManager::new(
            endpoint.clone(),
            PkceStore::new(TimeDelta::minutes(10), 16, Arc::new(clock.clone())),
            vec!["User.Read".to_string()],
            TimeDelta::seconds(60),
            Arc::new(clock.clone()),
        );
        (OAuthClient::new(Arc::new(manager), fetcher.clone()), endpoint, fetcher, clock)
    }

    #[tokio::test]
    async fn get_user_data_requires_tokens() {
        let (client, _, fetcher, _) = client();

        let err = client.get_user_data("ada", DataKind::Profile).await.expect_err("no token");
        assert_eq!(err, AuthGateError::NotAuthenticated);
        assert_eq!(fetcher.calls(DataKind::Profile), 0);
    }

    #[tokio::test]
    async fn get_user_data_uses_account_token() {
        let (client, _, fetcher, clock) = client();
        let tokens = TokenSet::new("at-ada".into(), None, None, 3600, None, clock.now());
        client.adopt_tokens("ada", tokens);
        fetcher.set_response(DataKind::Emails, Ok(serde_json::json!({ "value": [] })));

        let emails = client.get_user_data("ada", DataKind::Emails).await.expect("emails");
        assert_eq!(emails, serde_json::json!({ "value": [] }));
        assert_eq!(fetcher.last_token().as_deref(), Some("at-ada"));
    }

    #[tokio::test]
    async fn upstream_errors_pass_through() {
        let (client, _, fetcher, clock) = client();
        client.adopt_tokens("ada", TokenSet::new("at".into(), None, None, 3600, None, clock.now()));
        fetcher.set_response(
            DataKind::Files,
            Err(AuthGateError::Upstream { status: 403, body: "Forbidden".into() }),
        );

        let err = client.get_user_data("ada", DataKind::Files).await.expect_err("upstream");
        assert_eq!(err, AuthGateError::Upstream { status: 403, body: "Forbidden".into() });
    }

    #[tokio::test]
    async fn authenticate_maps_rejection_to_exchange_failed() {
        let (client, endpoint, _, _) = client();
        endpoint.set_exchange_response(Err(TokenEndpointError::Rejected {
            status: 400,
            message: "invalid_grant".into(),
        }));

        let err = client.authenticate_with_code("ABC", &[], "v").await.expect_err("rejected");
        assert!(matches!(err, AuthGateError::ExchangeFailed(_)));
    }

    #[tokio::test]
    async fn authenticate_then_fetch_profile() {
        let (client, endpoint, fetcher, _) = client();
        endpoint.set_exchange_response(Ok(token_response("at-1", None, 3600, None)));
        fetcher.set_response(DataKind::Profile, Ok(sample_profile("ada@contoso.com", "Ada")));

        let tokens = client.authenticate_with_code("ABC", &[], "v").await.expect("tokens");
        let profile = client.fetch_with_token(DataKind::Profile, &tokens).await.expect("profile");

        assert_eq!(profile["displayName"], "Ada");
        assert_eq!(fetcher.last_token().as_deref(), Some("at-1"));
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let (client, _, _, clock) = client();
        client.adopt_tokens("ada", TokenSet::new("at".into(), None, None, 3600, None, clock.now()));

        client.logout("ada");
        client.logout("ada");

        assert!(client.get_valid_token("ada").await.is_none());
    }

    #[test]
    fn endpoint_errors_map_to_taxonomy() {
        assert_eq!(
            map_endpoint_error(TokenEndpointError::Network("timeout".into())),
            AuthGateError::Network("timeout".into())
        );
        assert!(matches!(
            map_token_error(TokenManagerError::Pkce(PkceStoreError::DuplicateState)),
            AuthGateError::DuplicateState(_)
        ));
    }
}
