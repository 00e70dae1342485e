//! Token manager with de-duplicated refresh
//!
//! Manages OAuth token lifecycle for one client registration:
//! - PKCE challenge lifecycle (owns the [`PkceStore`])
//! - Authorization code exchange
//! - Per-account token slots with refresh-on-expiry
//! - Revocation
//!
//! Refresh is single-flight per account. The first caller that observes a
//! token inside the refresh window installs a shared in-flight future in the
//! account slot; concurrent callers await that same future instead of issuing
//! their own grant. No lock is held across the network call: the slot mutex
//! guards only the install and the apply, and a generation counter discards
//! results that lost a race with `store_tokens` or `revoke`.

use std::sync::Arc;

use chrono::TimeDelta;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, error, info, warn, Level};

use super::pkce::{generate_state, PKCEChallenge};
use super::pkce_store::{PendingAuthorization, PkceStore, PkceStoreError};
use super::traits::{TokenEndpoint, TokenEndpointError};
use super::types::{AuthorizationContext, TokenResponse, TokenSet};
use crate::error::{ErrorClassification, ErrorSeverity};
use crate::privacy::Redacted;
use crate::time::SharedClock;

/// Attempts at drawing a fresh random state before giving up
const STATE_ATTEMPTS: usize = 3;

/// Error type for token manager operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenManagerError {
    #[error("PKCE store error: {0}")]
    Pkce(#[from] PkceStoreError),

    #[error("token exchange failed: {0}")]
    Exchange(#[from] TokenEndpointError),
}

impl ErrorClassification for TokenManagerError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Pkce(e) => e.is_retryable(),
            Self::Exchange(e) => e.is_retryable(),
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Pkce(e) => e.severity(),
            Self::Exchange(e) => e.severity(),
        }
    }
}

/// Log level for a failed refresh, driven by the endpoint error's severity
fn refresh_failure_level(failure: &TokenEndpointError) -> Level {
    match failure.severity() {
        ErrorSeverity::Info => Level::INFO,
        ErrorSeverity::Warning => Level::WARN,
        ErrorSeverity::Error | ErrorSeverity::Critical => Level::ERROR,
    }
}

fn log_refresh_failure(account: &str, failure: &TokenEndpointError) {
    let retryable = failure.is_retryable();
    let level = refresh_failure_level(failure);
    if level == Level::ERROR {
        error!(account, retryable, error = %failure, "token refresh failed, clearing tokens");
    } else if level == Level::WARN {
        warn!(account, retryable, error = %failure, "token refresh failed, clearing tokens");
    } else {
        info!(account, retryable, error = %failure, "token refresh failed, clearing tokens");
    }
}

type RefreshFuture = Shared<BoxFuture<'static, Result<TokenResponse, TokenEndpointError>>>;

#[derive(Default)]
struct AccountSlot {
    tokens: Option<TokenSet>,
    generation: u64,
    in_flight: Option<RefreshFuture>,
}

impl AccountSlot {
    fn replace(&mut self, tokens: Option<TokenSet>) {
        self.tokens = tokens;
        self.generation = self.generation.wrapping_add(1);
        self.in_flight = None;
    }
}

enum Lookup {
    Ready(Option<TokenSet>),
    Await(RefreshFuture, u64),
}

/// Token manager for one client/tenant
pub struct TokenManager {
    endpoint: Arc<dyn TokenEndpoint>,
    pkce: PkceStore,
    clock: SharedClock,
    scopes: Vec<String>,
    refresh_threshold: TimeDelta,
    accounts: DashMap<String, Arc<Mutex<AccountSlot>>>,
}

impl TokenManager {
    /// Create a token manager
    ///
    /// # Arguments
    /// * `endpoint` - Token endpoint used for exchange and refresh
    /// * `pkce` - Store for outstanding challenges
    /// * `scopes` - Scopes requested on every grant
    /// * `refresh_threshold` - Refresh tokens this long before expiry
    /// * `clock` - Time source for expiry decisions
    #[must_use]
    pub fn new(
        endpoint: Arc<dyn TokenEndpoint>,
        pkce: PkceStore,
        scopes: Vec<String>,
        refresh_threshold: TimeDelta,
        clock: SharedClock,
    ) -> Self {
        Self { endpoint, pkce, clock, scopes, refresh_threshold, accounts: DashMap::new() }
    }

    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    #[must_use]
    pub const fn pkce_store(&self) -> &PkceStore {
        &self.pkce
    }

    /// Register a challenge under a freshly generated state
    ///
    /// A collision with a live state is retried with a new random value.
    ///
    /// # Errors
    /// [`PkceStoreError::DuplicateState`] if every attempt collided.
    pub fn begin_authorization(
        &self,
        context: AuthorizationContext,
    ) -> Result<PKCEChallenge, PkceStoreError> {
        let mut last_error = PkceStoreError::DuplicateState;
        for _ in 0..STATE_ATTEMPTS {
            match self.pkce.create(&generate_state(), context.clone()) {
                Ok(challenge) => return Ok(challenge),
                Err(e @ PkceStoreError::DuplicateState) => last_error = e,
                Err(e) => return Err(e),
            }
        }
        Err(last_error)
    }

    /// Register a challenge under a caller-chosen state
    ///
    /// # Errors
    /// See [`PkceStore::create`].
    pub fn create_challenge(
        &self,
        state: &str,
        context: AuthorizationContext,
    ) -> Result<PKCEChallenge, PkceStoreError> {
        self.pkce.create(state, context)
    }

    /// Take the challenge for `state` (single use)
    pub fn consume_challenge(&self, state: &str) -> Option<PendingAuthorization> {
        self.pkce.consume(state)
    }

    /// Exchange an authorization code for tokens
    ///
    /// The returned tokens are not stored; bind them to an account with
    /// [`TokenManager::store_tokens`] once the account is known. When the
    /// provider omits `scope`, the requested scopes are recorded instead.
    ///
    /// # Errors
    /// [`TokenManagerError::Exchange`] with the endpoint's classification.
    /// No retry happens here.
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        scopes: &[String],
    ) -> Result<TokenSet, TokenManagerError> {
        let response = self.endpoint.exchange_code(code, code_verifier, scopes).await?;
        let mut tokens = TokenSet::from_response(response, self.clock.now());
        if tokens.scope.is_none() {
            tokens.scope = Some(scopes.join(" "));
        }

        debug!(
            code = %Redacted(code),
            expires_in = tokens.expires_in,
            has_refresh_token = tokens.refresh_token.is_some(),
            "exchanged authorization code"
        );
        Ok(tokens)
    }

    /// Store tokens for an account, replacing any previous set
    pub fn store_tokens(&self, account: &str, tokens: TokenSet) {
        let slot = Arc::clone(self.accounts.entry(account.to_string()).or_default().value());
        slot.lock().replace(Some(tokens));
        debug!(account, "stored tokens");
    }

    /// Current valid token for `account`, refreshing if needed
    ///
    /// - Outside the refresh window: returns the stored token.
    /// - Inside the window with a refresh token: refreshes (shared with any
    ///   concurrent caller), stores and returns the new token.
    /// - Refresh failure, or expiry without a refresh token: clears the slot
    ///   and returns `None`.
    /// - Inside the window but not yet expired, without a refresh token:
    ///   returns the stored token.
    ///
    /// At most one refresh request is issued per call.
    pub async fn get_valid_token(&self, account: &str) -> Option<TokenSet> {
        let slot = self.accounts.get(account).map(|entry| Arc::clone(entry.value()))?;

        let (refresh, generation) = match self.lookup(&slot, account) {
            Lookup::Ready(tokens) => return tokens,
            Lookup::Await(refresh, generation) => (refresh, generation),
        };

        let outcome = refresh.await;

        let mut guard = slot.lock();
        if guard.generation == generation {
            match outcome {
                Ok(response) => {
                    let fresh = TokenSet::from_response(response, self.clock.now());
                    let fresh = match guard.tokens.as_ref() {
                        Some(previous) => fresh.inherit_refresh_token(previous),
                        None => fresh,
                    };
                    info!(account, expires_in = fresh.expires_in, "refreshed access token");
                    guard.replace(Some(fresh));
                }
                Err(error) => {
                    log_refresh_failure(account, &error);
                    guard.replace(None);
                }
            }
        }
        guard.tokens.clone()
    }

    fn lookup(&self, slot: &Mutex<AccountSlot>, account: &str) -> Lookup {
        let mut guard = slot.lock();
        let Some(tokens) = guard.tokens.clone() else {
            return Lookup::Ready(None);
        };

        let now = self.clock.now();
        if !tokens.needs_refresh(now, self.refresh_threshold) {
            return Lookup::Ready(Some(tokens));
        }

        if let Some(in_flight) = guard.in_flight.clone() {
            debug!(account, "joining in-flight token refresh");
            return Lookup::Await(in_flight, guard.generation);
        }

        match tokens.refresh_token {
            Some(refresh_token) => {
                debug!(account, "starting token refresh");
                let refresh = self.refresh_future(refresh_token);
                guard.in_flight = Some(refresh.clone());
                Lookup::Await(refresh, guard.generation)
            }
            None if tokens.is_expired_at(now) => {
                info!(account, "access token expired without refresh token, clearing");
                guard.replace(None);
                Lookup::Ready(None)
            }
            None => Lookup::Ready(Some(tokens)),
        }
    }

    fn refresh_future(&self, refresh_token: String) -> RefreshFuture {
        let endpoint = Arc::clone(&self.endpoint);
        let scopes = self.scopes.clone();
        async move { endpoint.refresh(&refresh_token, &scopes).await }.boxed().shared()
    }

    /// Drop stored tokens for `account`. Idempotent.
    ///
    /// A refresh in flight for the account completes but its result is
    /// discarded.
    pub fn revoke(&self, account: &str) {
        if let Some((_, slot)) = self.accounts.remove(account) {
            slot.lock().replace(None);
            info!(account, "revoked tokens");
        }
    }

    /// Whether `account` currently has stored tokens (no refresh attempted)
    #[must_use]
    pub fn has_tokens(&self, account: &str) -> bool {
        self.accounts
            .get(account)
            .map(|entry| Arc::clone(entry.value()))
            .is_some_and(|slot| slot.lock().tokens.is_some())
    }

    /// Remove slots left empty by failed refreshes, returning how many
    pub fn purge_inactive(&self) -> usize {
        let before = self.accounts.len();
        self.accounts.retain(|_, slot| {
            let guard = slot.lock();
            guard.tokens.is_some() || guard.in_flight.is_some()
        });
        before.saturating_sub(self.accounts.len())
    }

    #[must_use]
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("pkce", &self.pkce)
            .field("scopes", &self.scopes)
            .field("refresh_threshold", &self.refresh_threshold)
            .field("accounts", &self.accounts.len())
            .finish_non_exhaustive()
    }
}
