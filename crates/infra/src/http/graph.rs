//! Provider resource API client
//!
//! Implements [`ResourceFetcher`] over reqwest against a Microsoft
//! Graph-style API. Every request carries the user's bearer token and is
//! bounded by the configured timeout.

use std::time::Duration;

use async_trait::async_trait;
use authgate_core::ResourceFetcher;
use authgate_domain::{AuthGateError, DataKind, Result};
use reqwest::Client as ReqwestClient;
use serde_json::Value;
use tracing::debug;

use crate::errors::InfraError;

/// Largest provider error body carried into an `Upstream` error
const MAX_ERROR_BODY_CHARS: usize = 2048;

/// Resource path below the API base for each data kind
#[must_use]
pub const fn resource_path(kind: DataKind) -> &'static str {
    match kind {
        DataKind::Profile => "/me",
        DataKind::Emails => "/me/messages?$top=10",
        DataKind::Files => "/me/drive/root/children",
    }
}

#[derive(Clone)]
pub struct GraphResourceFetcher {
    client: ReqwestClient,
    base_url: String,
}

impl GraphResourceFetcher {
    /// # Errors
    /// Returns `AuthGateError::Config` if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthGateError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string() })
    }

    #[must_use]
    pub fn url_for(&self, kind: DataKind) -> String {
        format!("{}{}", self.base_url, resource_path(kind))
    }
}

#[async_trait]
impl ResourceFetcher for GraphResourceFetcher {
    async fn fetch(&self, kind: DataKind, access_token: &str) -> Result<Value> {
        let url = self.url_for(kind);
        debug!(%kind, "requesting provider resource");

        let response = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|err| AuthGateError::from(InfraError::from(err)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(%kind, status = status.as_u16(), "provider resource request rejected");
            return Err(AuthGateError::Upstream {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        response.json::<Value>().await.map_err(|err| AuthGateError::from(InfraError::from(err)))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn fetcher(server: &MockServer) -> GraphResourceFetcher {
        GraphResourceFetcher::new(&format!("{}/v1.0/", server.uri()), Duration::from_secs(5))
            .expect("fetcher builds")
    }

    #[tokio::test]
    async fn profile_is_fetched_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/me"))
            .and(header("authorization", "Bearer at-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "userPrincipalName": "ada@contoso.com",
                "displayName": "Ada Lovelace"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let profile = fetcher(&server).fetch(DataKind::Profile, "at-123").await.expect("profile");

        assert_eq!(profile["displayName"], "Ada Lovelace");
    }

    #[tokio::test]
    async fn emails_request_top_ten() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/me/messages"))
            .and(query_param("$top", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": [] })))
            .expect(1)
            .mount(&server)
            .await;

        let emails = fetcher(&server).fetch(DataKind::Emails, "at").await.expect("emails");

        assert_eq!(emails, json!({ "value": [] }));
    }

    #[tokio::test]
    async fn error_status_maps_to_upstream_with_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/me/drive/root/children"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_string(r#"{"error":{"code":"accessDenied"}}"#),
            )
            .mount(&server)
            .await;

        let err = fetcher(&server).fetch(DataKind::Files, "at").await.expect_err("forbidden");

        match err {
            AuthGateError::Upstream { status, body } => {
                assert_eq!(status, 403);
                assert!(body.contains("accessDenied"));
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_provider_is_a_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;
        let fetcher = GraphResourceFetcher::new(&server.uri(), Duration::from_millis(50))
            .expect("fetcher builds");

        let err = fetcher.fetch(DataKind::Profile, "at").await.expect_err("timeout");

        assert!(matches!(err, AuthGateError::Network(_)));
    }

    #[test]
    fn resource_paths_match_data_kinds() {
        assert_eq!(resource_path(DataKind::Profile), "/me");
        assert_eq!(resource_path(DataKind::Emails), "/me/messages?$top=10");
        assert_eq!(resource_path(DataKind::Files), "/me/drive/root/children");
    }
}
