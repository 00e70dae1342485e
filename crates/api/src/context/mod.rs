//! Gateway context - dependency injection container
//!
//! Everything is built once, in dependency order:
//! config → identity helper → token endpoint → token manager → resource
//! fetcher → OAuth client → caches and handoff codes → gateway service →
//! router.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use authgate_common::auth::{
    AuthUrlBuilder, HttpTokenEndpoint, PkceStore, TokenEndpoint, TokenEndpointConfig,
    TokenManager,
};
use authgate_common::time::{system_clock, SharedClock};
use authgate_core::{
    GatewayService, HandoffStore, OAuthClient, ResourceFetcher, ReturnUrlPolicy, SessionBindings,
    UserCache,
};
use authgate_domain::{AuthGateError, GatewayConfig, Result};
use authgate_infra::scheduling::{SweepScheduler, SweepSchedulerConfig};
use authgate_infra::{
    build_router, AppState, ConfiguredIdentity, CookieSettings, GatewayServer,
    GraphResourceFetcher,
};
use axum::Router;
use tracing::{info, warn};

/// Immutable, fully wired gateway
pub struct GatewayContext {
    pub config: GatewayConfig,
    pub service: Arc<GatewayService>,
    pub cookies: CookieSettings,
}

impl GatewayContext {
    /// Validate `config` and wire the production adapters
    ///
    /// # Errors
    /// `Config` for an invalid configuration or an HTTP client that cannot
    /// be built.
    pub fn build(config: GatewayConfig) -> Result<Self> {
        config.validate()?;

        let endpoint = HttpTokenEndpoint::new(TokenEndpointConfig {
            token_url: config.provider.token_endpoint(),
            client_id: config.provider.client_id.clone(),
            redirect_uri: config.server.redirect_uri(),
            timeout: config.provider.request_timeout(),
        })
        .map_err(|err| AuthGateError::Config(format!("token endpoint client: {err}")))?;
        let fetcher = GraphResourceFetcher::new(
            &config.provider.graph_base_url,
            config.provider.request_timeout(),
        )?;

        Self::with_adapters(config, Arc::new(endpoint), Arc::new(fetcher), system_clock())
    }

    /// Wire the gateway around caller-supplied provider adapters
    ///
    /// # Errors
    /// `Config` for an invalid configuration.
    pub fn with_adapters(
        config: GatewayConfig,
        endpoint: Arc<dyn TokenEndpoint>,
        fetcher: Arc<dyn ResourceFetcher>,
        clock: SharedClock,
    ) -> Result<Self> {
        config.validate()?;

        let identity = Arc::new(ConfiguredIdentity::from_config(&config));
        let provider = &config.provider;
        let cache = &config.cache;

        let tokens = TokenManager::new(
            endpoint,
            PkceStore::new(cache.pkce_ttl(), cache.pkce_capacity, clock.clone()),
            provider.scopes.clone(),
            provider.refresh_threshold(),
            clock.clone(),
        );
        let client = Arc::new(OAuthClient::new(Arc::new(tokens), fetcher));
        let urls = AuthUrlBuilder::new(
            provider.authorization_endpoint(),
            provider.client_id.clone(),
            config.server.redirect_uri(),
            provider.scopes.clone(),
        );
        let users = Arc::new(UserCache::new(cache.user_ttl(), cache.user_capacity, clock.clone()));
        let sessions =
            Arc::new(SessionBindings::new(cache.user_ttl(), cache.session_capacity, clock.clone()));
        let handoffs =
            Arc::new(HandoffStore::new(cache.handoff_ttl(), cache.session_capacity, clock));
        let return_policy = ReturnUrlPolicy::new(
            std::iter::once(&config.server.public_url)
                .chain(&config.server.allowed_return_origins),
        );

        let service = GatewayService::new(client, urls, users, sessions, handoffs, identity)
            .with_return_policy(return_policy)
            .with_default_return_url(config.server.default_return_url.clone());
        let cookies = CookieSettings::for_public_url(&config.server.public_url);

        info!(
            client_id = %provider.client_id,
            tenant = %provider.tenant,
            redirect_uri = %config.server.redirect_uri(),
            "gateway context built"
        );
        Ok(Self { config, service: Arc::new(service), cookies })
    }

    #[must_use]
    pub fn router(&self) -> Router {
        build_router(AppState::new(self.service.clone(), self.cookies.clone()))
    }

    /// Bind the listener and start the sweep task
    ///
    /// # Errors
    /// `Config` if the address cannot be bound, `InvalidInput`/`Internal` if
    /// the sweeper cannot start.
    pub async fn start(&self) -> Result<RunningGateway> {
        let server = GatewayServer::start(&self.config.server.bind_address(), self.router()).await?;

        let mut sweeper = SweepScheduler::new(
            SweepSchedulerConfig {
                interval: self.config.cache.sweep_interval(),
                ..SweepSchedulerConfig::default()
            },
            self.service.clone(),
        )?;
        sweeper.start()?;

        Ok(RunningGateway { server, sweeper, grace: self.config.server.shutdown_grace() })
    }
}

/// Listener and background tasks of a started gateway
pub struct RunningGateway {
    server: GatewayServer,
    sweeper: SweepScheduler,
    grace: Duration,
}

impl RunningGateway {
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    #[must_use]
    pub fn base_url(&self) -> String {
        self.server.base_url()
    }

    /// Stop the sweeper, then drain the listener within the grace period
    ///
    /// # Errors
    /// `Internal` if the server task panicked.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Err(err) = self.sweeper.stop().await {
            warn!(error = %err, "sweep scheduler did not stop cleanly");
        }
        self.server.shutdown(self.grace).await?;
        info!("gateway stopped");
        Ok(())
    }
}
