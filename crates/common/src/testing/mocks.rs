//! Mock implementations of common traits
//!
//! Provides mock objects for testing purposes.

// Mocks are intentionally simple; errors are visible in their return types.
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::auth::{TokenEndpoint, TokenEndpointError, TokenResponse};

type Scripted = Mutex<Result<TokenResponse, TokenEndpointError>>;

/// Build a token endpoint response for tests
#[must_use]
pub fn token_response(
    access_token: &str,
    refresh_token: Option<&str>,
    expires_in: i64,
    scope: Option<&str>,
) -> TokenResponse {
    TokenResponse {
        access_token: access_token.to_string(),
        refresh_token: refresh_token.map(ToString::to_string),
        id_token: None,
        token_type: Some("Bearer".to_string()),
        expires_in,
        scope: scope.map(ToString::to_string),
    }
}

/// Scriptable [`TokenEndpoint`]
///
/// Returns the configured result for every call and counts invocations. An
/// optional delay is applied before answering, to widen race windows in
/// concurrency tests.
///
/// # Examples
///
/// ```
/// use authgate_common::testing::{token_response, MockTokenEndpoint};
///
/// let endpoint = MockTokenEndpoint::new();
/// endpoint.set_refresh_response(Ok(token_response("fresh", None, 3600, None)));
/// assert_eq!(endpoint.refresh_calls(), 0);
/// ```
#[derive(Debug)]
pub struct MockTokenEndpoint {
    exchange_response: Scripted,
    refresh_response: Scripted,
    delay: Mutex<Option<Duration>>,
    exchange_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    last_exchange: Mutex<Option<(String, String)>>,
}

impl MockTokenEndpoint {
    #[must_use]
    pub fn new() -> Self {
        Self {
            exchange_response: Mutex::new(Ok(token_response(
                "mock-access-token",
                Some("mock-refresh-token"),
                3600,
                Some("User.Read Mail.Read Files.Read offline_access"),
            ))),
            refresh_response: Mutex::new(Ok(token_response(
                "mock-refreshed-token",
                Some("mock-refresh-token-2"),
                3600,
                None,
            ))),
            delay: Mutex::new(None),
            exchange_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            last_exchange: Mutex::new(None),
        }
    }

    pub fn set_exchange_response(&self, response: Result<TokenResponse, TokenEndpointError>) {
        *self.exchange_response.lock() = response;
    }

    pub fn set_refresh_response(&self, response: Result<TokenResponse, TokenEndpointError>) {
        *self.refresh_response.lock() = response;
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    #[must_use]
    pub fn exchange_calls(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// `(code, code_verifier)` of the most recent exchange
    #[must_use]
    pub fn last_exchange(&self) -> Option<(String, String)> {
        self.last_exchange.lock().clone()
    }

    async fn pause(&self) {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for MockTokenEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenEndpoint for MockTokenEndpoint {
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        _scopes: &[String],
    ) -> Result<TokenResponse, TokenEndpointError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_exchange.lock() = Some((code.to_string(), code_verifier.to_string()));
        self.pause().await;
        self.exchange_response.lock().clone()
    }

    async fn refresh(
        &self,
        _refresh_token: &str,
        _scopes: &[String],
    ) -> Result<TokenResponse, TokenEndpointError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.refresh_response.lock().clone()
    }
}
