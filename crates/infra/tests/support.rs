//! Shared fixtures for the HTTP integration tests

use std::sync::Arc;

use authgate_common::auth::{AuthUrlBuilder, PkceStore, TokenManager};
use authgate_common::testing::MockTokenEndpoint;
use authgate_common::time::MockClock;
use authgate_core::testing::{sample_profile, MockResourceFetcher, StaticIdentity};
use authgate_core::{
    CallbackParams, GatewayService, HandoffStore, OAuthClient, ReturnUrlPolicy, SessionBindings,
    UserCache,
};
use authgate_domain::DataKind;
use authgate_infra::{build_router, AppState, CookieSettings};
use axum::body::{to_bytes, Body};
use axum::http::Response;
use axum::Router;
use chrono::TimeDelta;

pub const ADA: &str = "ada@contoso.com";

/// Consumer origin the test gateway accepts as a redirect target
pub const APP_ORIGIN: &str = "http://app.local";

/// Gateway wired to in-memory provider doubles
pub struct TestGateway {
    pub service: Arc<GatewayService>,
    pub endpoint: Arc<MockTokenEndpoint>,
    pub fetcher: Arc<MockResourceFetcher>,
    pub clock: MockClock,
    pub router: Router,
}

impl TestGateway {
    pub fn new() -> Self {
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
        let service = Arc::new(
            GatewayService::new(
                client,
                urls,
                Arc::new(UserCache::new(TimeDelta::hours(8), 100, shared.clone())),
                Arc::new(SessionBindings::new(TimeDelta::hours(8), 100, shared.clone())),
                Arc::new(HandoffStore::new(TimeDelta::minutes(2), 100, shared)),
                Arc::new(StaticIdentity::new("client-123")),
            )
            .with_return_policy(ReturnUrlPolicy::new([APP_ORIGIN])),
        );
        let router = build_router(AppState::new(service.clone(), CookieSettings::default()));

        Self { service, endpoint, fetcher, clock, router }
    }

    /// Run a complete start + callback, returning the session it bound
    pub async fn sign_in(&self) -> String {
        let start = self.service.start_flow(None, None).expect("flow starts");
        self.service
            .handle_callback(CallbackParams {
                code: Some("ABC".to_string()),
                state: Some(start.state),
                ..Default::default()
            })
            .await
            .expect("callback completes")
            .session
    }
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body readable");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_string(response).await).expect("json body")
}

/// Value of query parameter `name` in an absolute URL
pub fn query_param(url: &str, name: &str) -> Option<String> {
    reqwest::Url::parse(url)
        .expect("absolute url")
        .query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}
