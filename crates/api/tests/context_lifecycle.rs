//! Integration tests for GatewayContext lifecycle
//!
//! Tests verify that the context can be built from configuration, started on
//! a real socket, and shut down gracefully.

use std::sync::Arc;

use authgate_common::testing::{MockClock, MockTokenEndpoint};
use authgate_core::testing::{sample_profile, MockResourceFetcher};
use authgate_domain::{AuthGateError, DataKind, GatewayConfig};
use authgate_lib::GatewayContext;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

fn test_config(port: u16) -> GatewayConfig {
    let mut config = GatewayConfig::for_client("client-123");
    config.server.port = port;
    config.server.public_url = format!("http://127.0.0.1:{port}");
    config.server.shutdown_grace_seconds = 1;
    config
}

fn test_context(config: GatewayConfig) -> GatewayContext {
    let fetcher = Arc::new(MockResourceFetcher::new());
    fetcher.set_response(DataKind::Profile, Ok(sample_profile("ada@contoso.com", "Ada")));
    GatewayContext::with_adapters(
        config,
        Arc::new(MockTokenEndpoint::new()),
        fetcher,
        Arc::new(MockClock::new()),
    )
    .expect("context builds")
}

async fn free_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    listener.local_addr().expect("addr").port()
}

#[test]
fn test_build_with_production_adapters() {
    let context = GatewayContext::build(test_config(8080)).expect("context builds");

    assert_eq!(context.service.client_id(), "client-123");
    assert!(context.service.admin_consent_url().contains("client_id=client-123"));
    assert!(!context.cookies.secure);
}

/// Validates the redirect allowlist the context derives from configuration.
///
/// Assertions:
/// - `public_url` and configured consumer origins are accepted
/// - Any other absolute `return_url` is refused before a flow starts
#[tokio::test]
async fn test_return_urls_follow_configured_origins() {
    let mut config = test_config(8080);
    config.server.allowed_return_origins = vec!["https://app.contoso.com".to_string()];
    let context = test_context(config);

    for (return_url, expected) in [
        ("https%3A%2F%2Fapp.contoso.com%2Freports", StatusCode::FOUND),
        ("http%3A%2F%2F127.0.0.1%3A8080%2Fdashboard", StatusCode::FOUND),
        ("https%3A%2F%2Fevil.example%2F", StatusCode::BAD_REQUEST),
    ] {
        let response = context
            .router()
            .oneshot(
                Request::builder()
                    .uri(format!("/?return_url={return_url}"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("start responds");
        assert_eq!(response.status(), expected, "return_url={return_url}");
    }
}

#[test]
fn test_build_rejects_invalid_config() {
    let result = GatewayContext::build(GatewayConfig::default());

    assert!(matches!(result, Err(AuthGateError::Config(_))));
}

/// Validates the router produced by the context.
///
/// Assertions:
/// - The start endpoint redirects to the configured tenant
/// - The redirect URI is derived from `public_url`
#[tokio::test]
async fn test_router_uses_configured_endpoints() {
    let mut config = test_config(8080);
    config.provider.tenant = "contoso".to_string();
    let context = test_context(config);

    let response = context
        .router()
        .oneshot(Request::builder().uri("/").body(Body::empty()).expect("request"))
        .await
        .expect("start responds");

    assert_eq!(response.status(), StatusCode::FOUND);
    let location = response.headers()["location"].to_str().expect("location");
    assert!(location
        .starts_with("https://login.microsoftonline.com/contoso/oauth2/v2.0/authorize?"));
    assert!(location.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A8080%2Fcallback"));
}

/// Test that the gateway starts, serves, and drains on shutdown
///
/// This test verifies:
/// - The listener binds the configured port
/// - `/debug` answers over a real socket
/// - Shutdown stops the sweeper and closes the listener
#[tokio::test(flavor = "multi_thread")]
async fn test_start_serve_and_shutdown() {
    let port = free_port().await;
    let context = test_context(test_config(port));

    let running = context.start().await.expect("gateway starts");
    assert_eq!(running.local_addr().port(), port);

    let snapshot: serde_json::Value = reqwest::get(format!("{}/debug", running.base_url()))
        .await
        .expect("debug responds")
        .json()
        .await
        .expect("json body");
    assert_eq!(snapshot["stored_challenges"], 0);

    let base_url = running.base_url();
    running.shutdown().await.expect("clean shutdown");

    assert!(reqwest::get(format!("{base_url}/debug")).await.is_err());
}

#[tokio::test]
async fn test_start_fails_when_port_is_taken() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    let mut config = test_config(port);
    config.server.host = "127.0.0.1".to_string();
    let context = test_context(config);

    let result = context.start().await;

    assert!(matches!(result, Err(AuthGateError::Config(_))));
    drop(listener);
}
