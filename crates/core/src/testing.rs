//! Test doubles for the core ports

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use authgate_domain::{AuthGateError, DataKind, Result};
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::gateway::IdentityHelper;
use crate::oauth::ResourceFetcher;

/// Graph-style `/me` payload for `upn`
#[must_use]
pub fn sample_profile(upn: &str, display_name: &str) -> Value {
    json!({
        "userPrincipalName": upn,
        "mail": upn,
        "displayName": display_name,
    })
}

/// Scriptable [`ResourceFetcher`]
///
/// Unscripted kinds answer `Upstream { status: 404 }`. An optional delay is
/// applied after the call is counted, so tests can act while a fetch is in
/// flight.
#[derive(Default)]
pub struct MockResourceFetcher {
    responses: Mutex<HashMap<DataKind, Result<Value>>>,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<HashMap<DataKind, usize>>,
    last_token: Mutex<Option<String>>,
}

impl MockResourceFetcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_response(&self, kind: DataKind, response: Result<Value>) {
        self.responses.lock().insert(kind, response);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    #[must_use]
    pub fn calls(&self, kind: DataKind) -> usize {
        self.calls.lock().get(&kind).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }

    #[must_use]
    pub fn last_token(&self) -> Option<String> {
        self.last_token.lock().clone()
    }
}

#[async_trait]
impl ResourceFetcher for MockResourceFetcher {
    async fn fetch(&self, kind: DataKind, access_token: &str) -> Result<Value> {
        *self.calls.lock().entry(kind).or_insert(0) += 1;
        *self.last_token.lock() = Some(access_token.to_string());
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.responses.lock().get(&kind).cloned().unwrap_or_else(|| {
            Err(AuthGateError::Upstream { status: 404, body: format!("no {kind} scripted") })
        })
    }
}

/// Fixed [`IdentityHelper`]
#[derive(Debug, Clone)]
pub struct StaticIdentity {
    pub client_id: String,
    pub consent_url: String,
}

impl StaticIdentity {
    #[must_use]
    pub fn new(client_id: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            consent_url: format!(
                "https://login.microsoftonline.com/common/adminconsent?client_id={client_id}"
            ),
        }
    }
}

impl IdentityHelper for StaticIdentity {
    fn client_id(&self) -> &str {
        &self.client_id
    }

    fn admin_consent_url(&self) -> String {
        self.consent_url.clone()
    }
}
