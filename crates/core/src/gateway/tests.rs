//! Flow-level tests for [`GatewayService`]

use std::sync::Arc;
use std::time::Duration;

use authgate_common::auth::{AuthUrlBuilder, PkceStore, TokenEndpointError, TokenManager};
use authgate_common::testing::{token_response, MockTokenEndpoint};
use authgate_common::time::MockClock;
use authgate_domain::{AuthGateError, DataKind, HANDOFF_PARAM};
use chrono::TimeDelta;
use url::Url;

use super::*;
use crate::oauth::OAuthClient;
use crate::session::{HandoffStore, SessionBindings};
use crate::testing::{sample_profile, MockResourceFetcher, StaticIdentity};
use crate::user::UserCache;

const ADA: &str = "ada@contoso.com";
const APP: &str = "http://app.local";

struct Harness {
    service: Arc<GatewayService>,
    endpoint: Arc<MockTokenEndpoint>,
    fetcher: Arc<MockResourceFetcher>,
    clock: MockClock,
}

fn harness() -> Harness {
    let clock = MockClock::new();
    let shared = Arc::new(clock.clone());
    let endpoint = Arc::new(MockTokenEndpoint::new());
    let fetcher = Arc::new(MockResourceFetcher::new());
    fetcher.set_response(DataKind::Profile, Ok(sample_profile(ADA, "Ada Lovelace")));

    let scopes = vec!["User.Read".to_string(), "Mail.Read".to_string()];
    let manager = TokenManager::new(
        endpoint.clone(),
        PkceStore::new(TimeDelta::minutes(10), 100, shared.clone()),
        scopes.clone(),
        TimeDelta::seconds(60),
        shared.clone(),
    );
    let client = Arc::new(OAuthClient::new(Arc::new(manager), fetcher.clone()));
    let urls = AuthUrlBuilder::new(
        "https://login.example.com/common/oauth2/v2.0/authorize",
        "client-123",
        "http://localhost:8080/callback",
        scopes,
    );
    let service = GatewayService::new(
        client,
        urls,
        Arc::new(UserCache::new(TimeDelta::hours(8), 100, shared.clone())),
        Arc::new(SessionBindings::new(TimeDelta::hours(8), 100, shared.clone())),
        Arc::new(HandoffStore::new(TimeDelta::minutes(2), 100, shared)),
        Arc::new(StaticIdentity::new("client-123")),
    )
    .with_return_policy(ReturnUrlPolicy::new([APP]));

    Harness { service: Arc::new(service), endpoint, fetcher, clock }
}

fn callback(code: &str, state: &str) -> CallbackParams {
    CallbackParams {
        code: Some(code.to_string()),
        state: Some(state.to_string()),
        ..CallbackParams::default()
    }
}

/// Complete one flow without a requester and return the bound session
async fn sign_in(h: &Harness) -> String {
    let start = h.service.start_flow(None, None).expect("flow starts");
    h.service.handle_callback(callback("ABC", &start.state)).await.expect("callback").session
}

fn query_param(url: &str, name: &str) -> Option<String> {
    Url::parse(url)
        .expect("authorization url parses")
        .query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Validates the complete browser flow from start to cached user.
///
/// Assertions:
/// - The authorization URL carries the issued state
/// - The provider receives the stored verifier with code `ABC`
/// - The user is cached under the resolved UPN
/// - A freshly minted session is bound, never the requester's value
/// - The browser is redirected to the stored `return_url` without a handoff
#[tokio::test]
async fn start_then_callback_caches_user_and_redirects() {
    let h = harness();

    let start = h.service.start_flow(Some("/dashboard"), Some("sess-1")).expect("flow starts");
    assert_eq!(query_param(&start.authorization_url, "state").as_deref(), Some(&*start.state));
    assert_eq!(query_param(&start.authorization_url, "client_id").as_deref(), Some("client-123"));

    let outcome = h.service.handle_callback(callback("ABC", &start.state)).await.expect("callback");

    let (code, verifier) = h.endpoint.last_exchange().expect("exchange attempted");
    assert_eq!(code, "ABC");
    assert_eq!(verifier.len(), 43);
    assert_eq!(outcome.user.id, ADA);
    assert_eq!(outcome.redirect.as_deref(), Some("/dashboard"));
    assert_ne!(outcome.session, "sess-1");
    assert!(h.service.users().lookup(ADA).is_some());
    assert_eq!(h.service.sessions().resolve(&outcome.session).as_deref(), Some(ADA));
    assert!(h.service.sessions().resolve("sess-1").is_none());
    assert!(h.service.handoffs().is_empty());
    assert_eq!(h.service.stats().snapshot().callbacks_completed, 1);
}

/// Validates the CSRF/replay defense on an unknown state.
///
/// Assertions:
/// - The callback fails with `InvalidState`
/// - No token exchange is attempted
/// - The user cache stays empty
#[tokio::test]
async fn unknown_state_is_rejected_without_exchange() {
    let h = harness();
    h.service.start_flow(Some("/dashboard"), None).expect("flow starts");

    let err = h.service.handle_callback(callback("ABC", "not-issued")).await.expect_err("invalid");

    assert!(matches!(err, AuthGateError::InvalidState(_)));
    assert_eq!(h.endpoint.exchange_calls(), 0);
    assert!(h.service.users().is_empty());
    assert_eq!(h.service.stats().snapshot().callbacks_failed, 1);
}

#[tokio::test]
async fn replayed_state_is_rejected() {
    let h = harness();
    let start = h.service.start_flow(None, None).expect("flow starts");

    h.service.handle_callback(callback("ABC", &start.state)).await.expect("first callback");
    let err =
        h.service.handle_callback(callback("ABC", &start.state)).await.expect_err("replay");

    assert!(matches!(err, AuthGateError::InvalidState(_)));
    assert_eq!(h.endpoint.exchange_calls(), 1);
}

#[tokio::test]
async fn expired_state_is_rejected() {
    let h = harness();
    let start = h.service.start_flow(None, None).expect("flow starts");

    h.clock.advance(TimeDelta::minutes(11));
    let err = h.service.handle_callback(callback("ABC", &start.state)).await.expect_err("expired");

    assert!(matches!(err, AuthGateError::InvalidState(_)));
    assert_eq!(h.endpoint.exchange_calls(), 0);
}

/// Validates that a provider error short-circuits before PKCE consumption.
///
/// Assertions:
/// - The callback fails with `AuthorizationFailed` carrying the description
/// - The issued state stays live
#[tokio::test]
async fn provider_error_does_not_consume_state() {
    let h = harness();
    let start = h.service.start_flow(None, None).expect("flow starts");

    let err = h
        .service
        .handle_callback(CallbackParams {
            state: Some(start.state.clone()),
            error: Some("access_denied".to_string()),
            error_description: Some("User declined consent".to_string()),
            ..CallbackParams::default()
        })
        .await
        .expect_err("provider error");

    assert_eq!(err, AuthGateError::AuthorizationFailed("User declined consent".to_string()));
    assert_eq!(h.service.debug_snapshot().stored_challenges, 1);
}

#[tokio::test]
async fn missing_code_fails_flow() {
    let h = harness();
    let start = h.service.start_flow(None, None).expect("flow starts");

    let err = h
        .service
        .handle_callback(CallbackParams { state: Some(start.state), ..CallbackParams::default() })
        .await
        .expect_err("missing code");

    assert!(matches!(err, AuthGateError::AuthorizationFailed(_)));
    assert_eq!(h.endpoint.exchange_calls(), 0);
}

#[tokio::test]
async fn rejected_code_leaves_cache_empty() {
    let h = harness();
    h.endpoint.set_exchange_response(Err(TokenEndpointError::Rejected {
        status: 400,
        message: "invalid_grant".to_string(),
    }));
    let start = h.service.start_flow(None, Some("sess-1")).expect("flow starts");

    let err = h.service.handle_callback(callback("ABC", &start.state)).await.expect_err("rejected");

    assert!(matches!(err, AuthGateError::ExchangeFailed(_)));
    assert!(h.service.users().is_empty());
    assert!(h.service.sessions().is_empty());
}

#[tokio::test]
async fn profile_fetch_failure_fails_flow() {
    let h = harness();
    h.fetcher.set_response(
        DataKind::Profile,
        Err(AuthGateError::Upstream { status: 401, body: "InvalidAuthenticationToken".into() }),
    );
    let start = h.service.start_flow(None, None).expect("flow starts");

    let err = h.service.handle_callback(callback("ABC", &start.state)).await.expect_err("profile");

    assert!(matches!(err, AuthGateError::Upstream { status: 401, .. }));
    assert!(h.service.users().is_empty());
}

#[tokio::test]
async fn callback_return_url_falls_back_to_query_then_default() {
    let h = harness();
    let start = h.service.start_flow(None, None).expect("flow starts");
    let outcome = h
        .service
        .handle_callback(CallbackParams {
            return_url: Some("/inbox".to_string()),
            ..callback("ABC", &start.state)
        })
        .await
        .expect("callback");
    assert_eq!(outcome.redirect.as_deref(), Some("/inbox"));

    let start = h.service.start_flow(None, None).expect("flow starts");
    let outcome = h.service.handle_callback(callback("DEF", &start.state)).await.expect("callback");
    assert_eq!(outcome.redirect, None, "no default configured renders the success page");
}

#[test]
fn start_flow_rejects_unsafe_return_url() {
    let h = harness();

    let err = h.service.start_flow(Some("//evil.example"), None).expect_err("unsafe");

    assert!(matches!(err, AuthGateError::InvalidInput(_)));
    assert_eq!(h.service.debug_snapshot().stored_challenges, 0);
}

/// Validates that only one of two racing callbacks for a state succeeds.
///
/// Assertions:
/// - Exactly one callback completes
/// - The other fails with `InvalidState`
/// - Exactly one code exchange reaches the provider
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callbacks_for_one_state_single_winner() {
    let h = harness();
    h.endpoint.set_delay(Duration::from_millis(20));
    let start = h.service.start_flow(None, None).expect("flow starts");

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let service = h.service.clone();
            let params = callback("ABC", &start.state);
            tokio::spawn(async move { service.handle_callback(params).await })
        })
        .collect();

    let mut completed = 0;
    let mut invalid = 0;
    for task in tasks {
        match task.await.expect("task joins") {
            Ok(_) => completed += 1,
            Err(AuthGateError::InvalidState(_)) => invalid += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(completed, 1);
    assert_eq!(invalid, 7);
    assert_eq!(h.endpoint.exchange_calls(), 1);
}

/// Validates the exchange endpoint's "go authenticate" signal.
///
/// Assertions:
/// - An unknown session yields `NotAuthenticated`, not a fault
/// - No provider call is made
#[tokio::test]
async fn exchange_unknown_session_requires_authentication() {
    let h = harness();

    let err = h.service.exchange_session("never-seen").await.expect_err("auth required");

    assert_eq!(err, AuthGateError::NotAuthenticated);
    assert_eq!(h.fetcher.total_calls(), 0);
    assert_eq!(h.service.stats().snapshot().exchange_auth_required, 1);
}

#[tokio::test]
async fn exchange_returns_cached_user() {
    let h = harness();
    let session = sign_in(&h).await;
    let calls_after_login = h.fetcher.calls(DataKind::Profile);

    let user = h.service.exchange_session(&session).await.expect("cache hit");

    assert_eq!(user.id, ADA);
    assert!(user.has_mail_access);
    assert_eq!(h.fetcher.calls(DataKind::Profile), calls_after_login);
    assert_eq!(h.service.stats().snapshot().exchange_hits, 1);
}

/// Validates lazy backfill after the cache entry disappears.
///
/// Assertions:
/// - A miss with a valid token re-fetches the profile once
/// - The record is cached again
#[tokio::test]
async fn exchange_backfills_from_valid_token() {
    let h = harness();
    let session = sign_in(&h).await;
    h.service.users().remove(ADA);

    let user = h.service.exchange_session(&session).await.expect("backfilled");

    assert_eq!(user.id, ADA);
    assert_eq!(h.fetcher.calls(DataKind::Profile), 2);
    assert!(h.service.users().lookup(ADA).is_some());
    assert_eq!(h.service.stats().snapshot().exchange_backfills, 1);
}

#[tokio::test]
async fn exchange_without_token_requires_authentication() {
    let h = harness();
    let session = sign_in(&h).await;
    h.service.users().remove(ADA);
    h.service.client().logout(ADA);

    let err = h.service.exchange_session(&session).await.expect_err("auth required");

    assert_eq!(err, AuthGateError::NotAuthenticated);
}

/// Validates logout removes the user everywhere before the TTL elapses.
///
/// Assertions:
/// - Lookup misses right after logout
/// - Tokens are revoked and session bindings dropped
/// - A second logout is a no-op
#[tokio::test]
async fn logout_user_clears_cache_tokens_and_sessions() {
    let h = harness();
    let session = sign_in(&h).await;

    assert!(h.service.logout_user(ADA));

    assert!(h.service.users().lookup(ADA).is_none());
    assert!(!h.service.client().token_manager().has_tokens(ADA));
    assert!(h.service.sessions().resolve(&session).is_none());
    assert!(!h.service.logout_user(ADA));
    assert!(matches!(h.service.get_user(ADA), Err(AuthGateError::NotFound(_))));
}

#[tokio::test]
async fn logout_session_resolves_bound_user() {
    let h = harness();
    let session = sign_in(&h).await;

    assert_eq!(h.service.logout_session(&session).as_deref(), Some(ADA));
    assert_eq!(h.service.logout_session(&session), None);
}

#[tokio::test]
async fn user_data_follows_session_binding() {
    let h = harness();
    h.fetcher.set_response(DataKind::Emails, Ok(serde_json::json!({ "value": [{ "id": "m1" }] })));
    let session = sign_in(&h).await;

    let emails =
        h.service.user_data_for_session(&session, DataKind::Emails).await.expect("emails");
    assert_eq!(emails["value"][0]["id"], "m1");

    let err = h
        .service
        .user_data_for_session("other", DataKind::Emails)
        .await
        .expect_err("unbound session");
    assert_eq!(err, AuthGateError::NotAuthenticated);
}

#[tokio::test]
async fn dashboard_collects_all_kinds() {
    let h = harness();
    h.fetcher.set_response(DataKind::Emails, Ok(serde_json::json!({ "value": [] })));
    h.fetcher.set_response(DataKind::Files, Ok(serde_json::json!({ "value": [] })));
    let session = sign_in(&h).await;

    let dashboard = h.service.dashboard(&session).await.expect("dashboard");

    assert_eq!(dashboard.user.id, ADA);
    assert_eq!(dashboard.profile["displayName"], "Ada Lovelace");
    assert_eq!(dashboard.files, serde_json::json!({ "value": [] }));
}

#[test]
fn debug_snapshot_exposes_only_redacted_states() {
    let h = harness();
    let start = h.service.start_flow(None, None).expect("flow starts");

    let snapshot = h.service.debug_snapshot();

    assert_eq!(snapshot.stored_challenges, 1);
    assert_eq!(snapshot.challenge_states, vec![format!("{}...", &start.state[..8])]);
    assert_eq!(snapshot.stats.flows_started, 1);
}

#[tokio::test]
async fn purge_expired_sweeps_every_store() {
    let h = harness();
    let start = h
        .service
        .start_flow(Some("http://app.local/reports"), Some("consumer-1"))
        .expect("flow starts");
    h.service.handle_callback(callback("ABC", &start.state)).await.expect("callback");
    h.service.start_flow(None, None).expect("abandoned flow");

    h.clock.advance(TimeDelta::hours(9));
    let report = h.service.purge_expired();

    assert_eq!(report.challenges, 1);
    assert_eq!(report.users, 1);
    assert_eq!(report.sessions, 1);
    assert_eq!(report.handoffs, 1);
    assert!(h.service.list_users().users.is_empty());
}

#[test]
fn admin_consent_comes_from_identity_helper() {
    let h = harness();

    assert_eq!(h.service.client_id(), "client-123");
    assert!(h.service.admin_consent_url().contains("client_id=client-123"));
}

/// Validates that a session value chosen before login never becomes
/// authenticated.
///
/// Assertions:
/// - The value carried into the flow resolves to nothing after the callback
/// - Exchanging it asks for authentication
/// - The handoff code cannot be redeemed by another browser, and the failed
///   attempt burns it for the original requester as well
#[tokio::test]
async fn preselected_session_is_never_bound() {
    let h = harness();
    let start = h
        .service
        .start_flow(Some("http://app.local/reports"), Some("planted-session"))
        .expect("flow starts");

    let outcome = h.service.handle_callback(callback("ABC", &start.state)).await.expect("callback");

    assert!(h.service.sessions().resolve("planted-session").is_none());
    assert_eq!(
        h.service.exchange_session("planted-session").await.expect_err("unbound"),
        AuthGateError::NotAuthenticated
    );

    let redirect = outcome.redirect.expect("redirects to consumer");
    let code = query_param(&redirect, HANDOFF_PARAM).expect("handoff code attached");
    let err = h.service.redeem_handoff(&code, "victim-cookie").await.expect_err("mismatch");
    assert_eq!(err, AuthGateError::NotAuthenticated);
    let err = h.service.redeem_handoff(&code, "planted-session").await.expect_err("burned");
    assert_eq!(err, AuthGateError::NotAuthenticated);
}

/// Validates the consumer handoff round trip.
///
/// Assertions:
/// - An absolute redirect carries one handoff code
/// - The requester trades it for the minted session and the user record
/// - A second redemption is refused
#[tokio::test]
async fn handoff_is_redeemed_once_by_requester() {
    let h = harness();
    let start = h
        .service
        .start_flow(Some("http://app.local/reports?id=7"), Some("consumer-1"))
        .expect("flow starts");
    let outcome = h.service.handle_callback(callback("ABC", &start.state)).await.expect("callback");

    let redirect = outcome.redirect.expect("redirects to consumer");
    assert!(redirect.starts_with("http://app.local/reports?id=7&"));
    let code = query_param(&redirect, HANDOFF_PARAM).expect("handoff code attached");

    let handoff = h.service.redeem_handoff(&code, "consumer-1").await.expect("redeemed");
    assert_eq!(handoff.session_token, outcome.session);
    assert_eq!(handoff.user.id, ADA);

    let err = h.service.redeem_handoff(&code, "consumer-1").await.expect_err("single use");
    assert_eq!(err, AuthGateError::NotAuthenticated);

    let stats = h.service.stats().snapshot();
    assert_eq!(stats.handoffs_issued, 1);
    assert_eq!(stats.handoffs_redeemed, 1);
}

/// Validates the redirect allowlist.
///
/// Assertions:
/// - `start_flow` refuses an absolute URL outside the allowed origins
/// - A callback-supplied `return_url` outside them is ignored
#[tokio::test]
async fn unlisted_return_origin_is_rejected() {
    let h = harness();

    let err = h.service.start_flow(Some("https://evil.example/login"), None).expect_err("unlisted");
    assert!(matches!(err, AuthGateError::InvalidInput(_)));

    let start = h.service.start_flow(None, None).expect("flow starts");
    let outcome = h
        .service
        .handle_callback(CallbackParams {
            return_url: Some("https://evil.example/login".to_string()),
            ..callback("ABC", &start.state)
        })
        .await
        .expect("callback");
    assert_eq!(outcome.redirect, None);
}

/// Validates that an absurd `expires_in` from the provider completes the flow.
///
/// Assertions:
/// - The callback succeeds and caches the user
/// - The session resolves through the exchange
#[tokio::test]
async fn huge_token_lifetime_completes_flow() {
    let h = harness();
    h.endpoint.set_exchange_response(Ok(token_response(
        "at-1",
        None,
        1_000_000_000_000_000,
        Some("User.Read"),
    )));
    let start = h.service.start_flow(None, None).expect("flow starts");

    let outcome = h.service.handle_callback(callback("ABC", &start.state)).await.expect("callback");

    assert!(h.service.users().lookup(ADA).is_some());
    let user = h.service.exchange_session(&outcome.session).await.expect("resolves");
    assert_eq!(user.id, ADA);
}

/// Validates that a logout racing a backfill wins.
///
/// Assertions:
/// - The in-flight exchange ends with `NotAuthenticated`
/// - No user record survives the logout
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn logout_during_backfill_does_not_resurrect_user() {
    let h = harness();
    let session = sign_in(&h).await;
    h.service.users().remove(ADA);
    h.fetcher.set_delay(Duration::from_millis(100));

    let exchange = {
        let service = h.service.clone();
        let session = session.clone();
        tokio::spawn(async move { service.exchange_session(&session).await })
    };
    while h.fetcher.calls(DataKind::Profile) < 2 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(!h.service.logout_user(ADA));

    let result = exchange.await.expect("task joins");
    assert_eq!(result.expect_err("logged out"), AuthGateError::NotAuthenticated);
    assert!(h.service.users().lookup(ADA).is_none());
    assert!(h.service.list_users().users.is_empty());
}
