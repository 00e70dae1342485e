//! Gateway service: sequences PKCE, token exchange, profile fetch and caching
//!
//! Every HTTP endpoint of the gateway is a thin adapter over one method here.

use std::sync::Arc;

use authgate_common::auth::{generate_session_token, AuthUrlBuilder, AuthorizationContext};
use authgate_common::privacy::redact;
use authgate_domain::{
    AuthGateError, DataKind, FlowState, ProfileIdentity, Result, UserListing, UserRecord,
};
use tracing::{debug, info};

use super::flow::{
    is_absolute, with_handoff, CallbackOutcome, CallbackParams, Dashboard, DebugSnapshot,
    FlowStart, FlowTrace, ReturnUrlPolicy, SessionHandoff, SweepReport,
};
use super::ports::IdentityHelper;
use super::stats::GatewayStats;
use crate::oauth::{map_token_error, OAuthClient};
use crate::session::{HandoffStore, SessionBindings};
use crate::user::UserCache;

pub struct GatewayService {
    client: Arc<OAuthClient>,
    urls: AuthUrlBuilder,
    users: Arc<UserCache>,
    sessions: Arc<SessionBindings>,
    handoffs: Arc<HandoffStore>,
    identity: Arc<dyn IdentityHelper>,
    return_policy: ReturnUrlPolicy,
    default_return_url: Option<String>,
    stats: GatewayStats,
}

impl GatewayService {
    #[must_use]
    pub fn new(
        client: Arc<OAuthClient>,
        urls: AuthUrlBuilder,
        users: Arc<UserCache>,
        sessions: Arc<SessionBindings>,
        handoffs: Arc<HandoffStore>,
        identity: Arc<dyn IdentityHelper>,
    ) -> Self {
        Self {
            client,
            urls,
            users,
            sessions,
            handoffs,
            identity,
            return_policy: ReturnUrlPolicy::default(),
            default_return_url: None,
            stats: GatewayStats::default(),
        }
    }

    /// Fallback redirect target after a callback with no `return_url`
    #[must_use]
    pub fn with_default_return_url(mut self, url: Option<String>) -> Self {
        self.default_return_url = url;
        self
    }

    /// Origins absolute `return_url` values may point at; relative paths are
    /// always accepted
    #[must_use]
    pub fn with_return_policy(mut self, policy: ReturnUrlPolicy) -> Self {
        self.return_policy = policy;
        self
    }

    #[must_use]
    pub fn client(&self) -> &OAuthClient {
        &self.client
    }

    #[must_use]
    pub fn users(&self) -> &UserCache {
        &self.users
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionBindings {
        &self.sessions
    }

    #[must_use]
    pub fn handoffs(&self) -> &HandoffStore {
        &self.handoffs
    }

    #[must_use]
    pub fn stats(&self) -> &GatewayStats {
        &self.stats
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        self.identity.client_id()
    }

    #[must_use]
    pub fn admin_consent_url(&self) -> String {
        self.identity.admin_consent_url()
    }

    /// Register a PKCE challenge and build the provider authorization URL
    ///
    /// `return_url` and the `requester` session travel with the challenge to
    /// the callback. The requester is never bound itself; it only gates the
    /// handoff of the session the callback mints.
    ///
    /// # Errors
    /// `InvalidInput` for an unacceptable `return_url`; `DuplicateState` if no
    /// unique state could be generated.
    pub fn start_flow(
        &self,
        return_url: Option<&str>,
        requester: Option<&str>,
    ) -> Result<FlowStart> {
        let return_url =
            return_url.map(|candidate| self.return_policy.validate(candidate)).transpose()?;
        let context = AuthorizationContext {
            return_url,
            requester: requester.filter(|value| !value.is_empty()).map(str::to_string),
        };

        let challenge = self
            .client
            .token_manager()
            .begin_authorization(context)
            .map_err(|error| map_token_error(error.into()))?;
        let authorization_url = self.urls.build(&challenge.code_challenge, &challenge.state);

        self.stats.flow_started();
        info!(flow = %redact(&challenge.state), to = %FlowState::Initiated, "flow started");
        Ok(FlowStart { authorization_url, state: challenge.state })
    }

    /// Complete a flow from the provider's callback parameters
    ///
    /// No token exchange is attempted and no cache entry is written unless
    /// the `state` consumes a live PKCE challenge.
    ///
    /// # Errors
    /// `AuthorizationFailed` for provider errors or a missing code,
    /// `InvalidState` for a missing, unknown, expired or replayed state,
    /// `ExchangeFailed`/`Network` from the code exchange and
    /// `Upstream`/`Network` from the profile fetch.
    pub async fn handle_callback(&self, params: CallbackParams) -> Result<CallbackOutcome> {
        let result = self.run_callback(params).await;
        match &result {
            Ok(_) => self.stats.callback_completed(),
            Err(_) => self.stats.callback_failed(),
        }
        result
    }

    async fn run_callback(&self, params: CallbackParams) -> Result<CallbackOutcome> {
        let flow_key = params.state.clone().unwrap_or_default();
        let mut trace = FlowTrace::new(&flow_key, FlowState::Initiated);
        trace.advance(FlowState::CallbackReceived);

        if let Some(error) = params.error {
            let reason = params.error_description.unwrap_or_else(|| error.clone());
            return Err(trace.fail(AuthGateError::AuthorizationFailed(reason)));
        }

        let Some(state) = params.state.filter(|value| !value.is_empty()) else {
            return Err(trace.fail(AuthGateError::InvalidState("missing state".to_string())));
        };
        let Some(code) = params.code.filter(|value| !value.is_empty()) else {
            return Err(trace.fail(AuthGateError::AuthorizationFailed(
                "missing authorization code".to_string(),
            )));
        };

        let manager = self.client.token_manager();
        let Some(pending) = manager.consume_challenge(&state) else {
            return Err(trace.fail(AuthGateError::InvalidState(
                "state is unknown, expired or already used".to_string(),
            )));
        };

        let tokens = match self
            .client
            .authenticate_with_code(&code, manager.scopes(), &pending.challenge.code_verifier)
            .await
        {
            Ok(tokens) => tokens,
            Err(error) => return Err(trace.fail(error)),
        };
        trace.advance(FlowState::Exchanged);

        let profile = match self.client.fetch_with_token(DataKind::Profile, &tokens).await {
            Ok(profile) => profile,
            Err(error) => return Err(trace.fail(error)),
        };
        let Some(identity) = ProfileIdentity::from_profile(&profile) else {
            return Err(trace.fail(AuthGateError::AuthorizationFailed(
                "provider profile carries no user identifier".to_string(),
            )));
        };
        trace.advance(FlowState::ProfileFetched);

        let user = self.users.store(&identity.id, profile, &tokens);
        self.client.adopt_tokens(&identity.id, tokens);
        let session = generate_session_token();
        self.sessions.bind(&session, &identity.id);
        trace.advance(FlowState::Complete);

        let redirect = pending
            .context
            .return_url
            .or_else(|| {
                params.return_url.and_then(|url| self.return_policy.validate(&url).ok())
            })
            .or_else(|| self.default_return_url.clone())
            .map(|target| match pending.context.requester.as_deref() {
                Some(requester) if is_absolute(&target) => {
                    let code = self.handoffs.issue(&session, requester);
                    self.stats.handoff_issued();
                    with_handoff(&target, &code)
                }
                _ => target,
            });

        Ok(CallbackOutcome { user, redirect, session })
    }

    /// Trade a handoff code for the session it names
    ///
    /// `presented` must be the consumer session that started the flow. The
    /// code is single-use whether or not the redemption succeeds.
    ///
    /// # Errors
    /// `NotAuthenticated` for an unknown, expired, reused or mismatched code,
    /// and as [`Self::exchange_session`] for the session it names.
    pub async fn redeem_handoff(&self, code: &str, presented: &str) -> Result<SessionHandoff> {
        let Some(session) = self.handoffs.redeem(code, presented) else {
            self.stats.exchange_auth_required();
            return Err(AuthGateError::NotAuthenticated);
        };
        let user = self.exchange_session(&session).await?;
        self.stats.handoff_redeemed();
        info!(user = %redact(&user.id), "session handed off to consumer");
        Ok(SessionHandoff { session_token: session, user })
    }

    /// Resolve a consumer session to its user record
    ///
    /// A cache miss with a still-valid token for the bound user re-fetches
    /// the profile and caches it again.
    ///
    /// # Errors
    /// `NotAuthenticated` when the session is unbound or the bound user has
    /// no valid token; `Upstream`/`Network` if the backfill fetch fails.
    pub async fn exchange_session(&self, session: &str) -> Result<UserRecord> {
        let Some(user_id) = self.sessions.resolve(session) else {
            self.stats.exchange_auth_required();
            debug!(session = %redact(session), "session not bound");
            return Err(AuthGateError::NotAuthenticated);
        };

        if let Some(user) = self.users.lookup(&user_id) {
            self.stats.exchange_hit();
            return Ok(user);
        }

        let Some(tokens) = self.client.get_valid_token(&user_id).await else {
            self.stats.exchange_auth_required();
            self.sessions.unbind(session);
            debug!(session = %redact(session), "bound user has no valid token");
            return Err(AuthGateError::NotAuthenticated);
        };

        let profile = self.client.fetch_with_token(DataKind::Profile, &tokens).await?;
        let user = self.users.store(&user_id, profile, &tokens);

        // A logout may have run while the profile was in flight.
        let still_bound = self.sessions.resolve(session).as_deref() == Some(user_id.as_str());
        if !still_bound || !self.client.token_manager().has_tokens(&user_id) {
            self.users.remove(&user_id);
            self.stats.exchange_auth_required();
            debug!(user = %redact(&user_id), "discarded backfill for a logged out user");
            return Err(AuthGateError::NotAuthenticated);
        }
        self.stats.exchange_backfill();
        info!(user = %redact(&user_id), "user record backfilled from token");
        Ok(user)
    }

    /// Provider data for the user bound to `session`
    ///
    /// # Errors
    /// `NotAuthenticated` for an unbound session or missing token; otherwise
    /// the fetch error.
    pub async fn user_data_for_session(
        &self,
        session: &str,
        kind: DataKind,
    ) -> Result<serde_json::Value> {
        let user_id = self.sessions.resolve(session).ok_or(AuthGateError::NotAuthenticated)?;
        self.client.get_user_data(&user_id, kind).await
    }

    /// Profile, mail and files for the user bound to `session`
    ///
    /// # Errors
    /// As [`Self::exchange_session`] and [`Self::user_data_for_session`].
    pub async fn dashboard(&self, session: &str) -> Result<Dashboard> {
        let user = self.exchange_session(session).await?;
        let (profile, emails, files) = futures::try_join!(
            self.client.get_user_data(&user.id, DataKind::Profile),
            self.client.get_user_data(&user.id, DataKind::Emails),
            self.client.get_user_data(&user.id, DataKind::Files),
        )?;
        Ok(Dashboard { user, profile, emails, files })
    }

    /// Cached record by user id
    ///
    /// # Errors
    /// `NotFound` when absent or expired.
    pub fn get_user(&self, user_id: &str) -> Result<UserRecord> {
        self.users
            .lookup(user_id)
            .ok_or_else(|| AuthGateError::NotFound("User not found or expired".to_string()))
    }

    #[must_use]
    pub fn list_users(&self) -> UserListing {
        self.users.listing()
    }

    /// Log a user out everywhere: session bindings, tokens and cache entry
    ///
    /// Bindings go first so no new exchange can start a backfill for the
    /// user. Idempotent; returns whether a cache entry existed.
    pub fn logout_user(&self, user_id: &str) -> bool {
        let sessions = self.sessions.unbind_user(user_id);
        self.client.logout(user_id);
        let removed = self.users.remove(user_id);
        info!(user = %redact(user_id), removed, sessions, "user logged out");
        removed
    }

    /// Log out whichever user `session` is bound to
    pub fn logout_session(&self, session: &str) -> Option<String> {
        let user_id = self.sessions.resolve(session);
        match &user_id {
            Some(user_id) => {
                self.logout_user(user_id);
            }
            None => {
                self.sessions.unbind(session);
                debug!(session = %redact(session), "logout for unbound session");
            }
        }
        user_id
    }

    /// Outstanding PKCE states (redacted) and flow counters
    #[must_use]
    pub fn debug_snapshot(&self) -> DebugSnapshot {
        let store = self.client.token_manager().pkce_store();
        let challenge_states: Vec<String> =
            store.live_states().iter().map(|state| redact(state)).collect();
        DebugSnapshot {
            stored_challenges: challenge_states.len(),
            challenge_states,
            stats: self.stats.snapshot(),
        }
    }

    /// Drop expired challenges, users, session bindings, handoffs and token slots
    pub fn purge_expired(&self) -> SweepReport {
        let manager = self.client.token_manager();
        let report = SweepReport {
            challenges: manager.pkce_store().purge_expired(),
            users: self.users.purge_expired(),
            sessions: self.sessions.purge_expired(),
            handoffs: self.handoffs.purge_expired(),
            token_slots: manager.purge_inactive(),
        };
        if report.total() > 0 {
            debug!(
                challenges = report.challenges,
                users = report.users,
                sessions = report.sessions,
                handoffs = report.handoffs,
                token_slots = report.token_slots,
                "swept expired entries"
            );
        }
        report
    }
}

impl std::fmt::Debug for GatewayService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayService")
            .field("client_id", &self.identity.client_id())
            .field("cached_users", &self.users.len())
            .field("sessions", &self.sessions.len())
            .finish_non_exhaustive()
    }
}
