//! OAuth 2.0 + PKCE building blocks
//!
//! Public-client primitives for the authorization-code flow against a remote
//! identity provider.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │   TokenManager   │  exchange, per-account tokens, single-flight refresh
//! └────────┬─────────┘
//!          │
//!          ├──► TokenEndpoint     (trait; HttpTokenEndpoint over reqwest)
//!          │
//!          └──► PkceStore         (state → challenge, single use, TTL)
//!                    │
//!                    └──► PKCE utilities
//!
//! AuthUrlBuilder  (pure; challenge + state → authorization URL)
//! ```
//!
//! # Usage Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use authgate_common::auth::{
//!     AuthUrlBuilder, AuthorizationContext, HttpTokenEndpoint, PkceStore, TokenEndpointConfig,
//!     TokenManager,
//! };
//! use authgate_common::time::system_clock;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let scopes = vec!["User.Read".to_string(), "offline_access".to_string()];
//! let endpoint = HttpTokenEndpoint::new(TokenEndpointConfig {
//!     token_url: "https://login.microsoftonline.com/common/oauth2/v2.0/token".to_string(),
//!     client_id: "client-id".to_string(),
//!     redirect_uri: "http://localhost:8080/callback".to_string(),
//!     timeout: Duration::from_secs(30),
//! })?;
//! let clock = system_clock();
//! let pkce = PkceStore::new(chrono::TimeDelta::minutes(10), 10_000, clock.clone());
//! let manager =
//!     TokenManager::new(Arc::new(endpoint), pkce, scopes.clone(), chrono::TimeDelta::seconds(60), clock);
//!
//! let urls = AuthUrlBuilder::new(
//!     "https://login.microsoftonline.com/common/oauth2/v2.0/authorize",
//!     "client-id",
//!     "http://localhost:8080/callback",
//!     scopes.clone(),
//! );
//! let challenge = manager.begin_authorization(AuthorizationContext::default())?;
//! println!("Open {}", urls.build(&challenge.code_challenge, &challenge.state));
//!
//! // ... provider redirects back with ?code=...&state=...
//! if let Some(pending) = manager.consume_challenge(&challenge.state) {
//!     let tokens = manager
//!         .exchange_code("code-from-callback", &pending.challenge.code_verifier, &scopes)
//!         .await?;
//!     manager.store_tokens("user@example.com", tokens);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - **[`types`]**: `TokenSet`, `TokenResponse`, `OAuthError`,
//!   `AuthorizationContext`
//! - **[`pkce`]**: PKCE challenge generation and validation
//! - **[`pkce_store`]**: concurrent single-use challenge store
//! - **[`traits`]**: the `TokenEndpoint` seam
//! - **[`endpoint`]**: reqwest implementation of the token endpoint
//! - **[`token_manager`]**: token lifecycle with de-duplicated refresh
//! - **[`url`]**: authorization URL builder
//!
//! # Security Features
//!
//! - **PKCE (S256)**: prevents authorization code interception
//! - **Single-use state**: atomic consume defeats callback replay
//! - **No client secret**: public client flow
//! - **Redacted Debug**: token sets and challenges never print credentials

pub mod endpoint;
pub mod pkce;
pub mod pkce_store;
pub mod token_manager;
pub mod traits;
pub mod types;
pub mod url;

pub use endpoint::{HttpTokenEndpoint, TokenEndpointConfig};
pub use pkce::{
    generate_code_challenge, generate_code_verifier, generate_session_token, generate_state,
    tokens_match, PKCEChallenge, CHALLENGE_METHOD,
};
pub use pkce_store::{PendingAuthorization, PkceStore, PkceStoreError};
pub use token_manager::{TokenManager, TokenManagerError};
pub use traits::{TokenEndpoint, TokenEndpointError};
pub use types::{AuthorizationContext, OAuthError, TokenResponse, TokenSet};
pub use url::{build_authorization_url, AuthUrlBuilder};
