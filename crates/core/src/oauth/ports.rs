//! Port interfaces for provider resource access
//!
//! The OAuth client calls the identity provider's resource API (profile,
//! mail, files) through this trait; `authgate-infra` implements it over HTTP.

use async_trait::async_trait;
use authgate_domain::{DataKind, Result};
use serde_json::Value;

/// Bearer-token GET against the provider's resource API
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Fetch the resource for `kind` using `access_token`
    ///
    /// Implementations return `AuthGateError::Upstream { status, body }` when
    /// the provider answers with an error status and `AuthGateError::Network`
    /// on transport failure or timeout.
    async fn fetch(&self, kind: DataKind, access_token: &str) -> Result<Value>;
}
