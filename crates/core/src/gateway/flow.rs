//! Authorization flow inputs, outputs and transition tracing

use authgate_common::privacy::redact;
use authgate_domain::{AuthGateError, FlowState, Result, UserRecord, HANDOFF_PARAM};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::stats::StatsSnapshot;

/// Result of starting a flow: where to send the browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowStart {
    pub authorization_url: String,
    pub state: String,
}

/// Query parameters the provider sends back to the callback
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
    pub return_url: Option<String>,
}

/// Successful callback
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackOutcome {
    pub user: UserRecord,
    /// Where to send the browser; `None` renders the success page
    pub redirect: Option<String>,
    /// Session minted by this callback and bound to `user`
    pub session: String,
}

/// A redeemed handoff: the consumer's new session and who it belongs to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionHandoff {
    pub session_token: String,
    pub user: UserRecord,
}

/// Read-only view of outstanding flows; never carries verifiers or challenges
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DebugSnapshot {
    pub stored_challenges: usize,
    pub challenge_states: Vec<String>,
    pub stats: StatsSnapshot,
}

/// All provider data for one user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub user: UserRecord,
    pub profile: Value,
    pub emails: Value,
    pub files: Value,
}

/// Entries removed by one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub challenges: usize,
    pub users: usize,
    pub sessions: usize,
    pub handoffs: usize,
    pub token_slots: usize,
}

impl SweepReport {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.challenges + self.users + self.sessions + self.handoffs + self.token_slots
    }
}

/// Logs each state transition of one flow under its redacted `state`
pub(crate) struct FlowTrace {
    flow: String,
    current: FlowState,
}

impl FlowTrace {
    pub(crate) fn new(state: &str, current: FlowState) -> Self {
        Self { flow: redact(state), current }
    }

    pub(crate) fn advance(&mut self, next: FlowState) {
        debug!(flow = %self.flow, from = %self.current, to = %next, "flow transition");
        self.current = next;
    }

    /// Move to `Failed`, logging the reason label, and hand the error back
    pub(crate) fn fail(&mut self, error: AuthGateError) -> AuthGateError {
        warn!(
            flow = %self.flow,
            from = %self.current,
            reason = error.label(),
            error = %error,
            "flow failed"
        );
        self.current = FlowState::Failed;
        error
    }

    #[cfg(test)]
    pub(crate) const fn current(&self) -> FlowState {
        self.current
    }
}

/// Redirect targets a completed flow may send the browser to
///
/// Relative paths stay on the gateway and are always accepted. Absolute
/// http(s) URLs must share scheme, host and port with an allowed origin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReturnUrlPolicy {
    origins: Vec<String>,
}

impl ReturnUrlPolicy {
    /// Policy allowing `origins`; entries that are not http(s) URLs are ignored
    #[must_use]
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut allowed: Vec<String> =
            origins.into_iter().filter_map(|origin| origin_of(origin.as_ref())).collect();
        allowed.sort();
        allowed.dedup();
        Self { origins: allowed }
    }

    /// Normalized `scheme://host[:port]` origins this policy accepts
    #[must_use]
    pub fn origins(&self) -> &[String] {
        &self.origins
    }

    /// Accept `candidate` as a redirect target
    ///
    /// # Errors
    /// `InvalidInput` for protocol-relative paths, other schemes and absolute
    /// URLs outside the allowed origins.
    pub fn validate(&self, candidate: &str) -> Result<String> {
        let trimmed = candidate.trim();
        if trimmed.starts_with('/') && !trimmed.starts_with("//") && !trimmed.starts_with("/\\") {
            return Ok(trimmed.to_string());
        }
        match origin_of(trimmed) {
            Some(origin) if self.origins.contains(&origin) => Ok(trimmed.to_string()),
            Some(origin) => Err(AuthGateError::InvalidInput(format!(
                "return_url origin {origin} is not allowed"
            ))),
            None => Err(AuthGateError::InvalidInput(format!("unsupported return_url: {trimmed}"))),
        }
    }
}

fn origin_of(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host().is_none() {
        return None;
    }
    Some(url.origin().ascii_serialization())
}

/// Whether `target` leaves the gateway (an absolute URL)
pub(crate) fn is_absolute(target: &str) -> bool {
    Url::parse(target).is_ok()
}

/// Append the handoff code to an absolute redirect target
pub(crate) fn with_handoff(target: &str, code: &str) -> String {
    match Url::parse(target) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair(HANDOFF_PARAM, code);
            url.into()
        }
        Err(_) => target.to_string(),
    }
}
