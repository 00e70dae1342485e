//! Single-use codes that hand a freshly bound session to a consumer app
//!
//! The callback never binds a session value the browser arrived with. It
//! mints a new one, and when the flow was started by consumer middleware it
//! issues a short-lived code naming that new session. Only the requester
//! that started the flow can redeem the code, and only once.

use authgate_common::auth::{generate_session_token, tokens_match};
use authgate_common::privacy::redact;
use authgate_common::time::{expires_after, Clock, SharedClock};
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use tracing::debug;

#[derive(Debug, Clone)]
struct Handoff {
    session: String,
    requester: String,
    expires_at: DateTime<Utc>,
}

pub struct HandoffStore {
    codes: DashMap<String, Handoff>,
    ttl: TimeDelta,
    capacity: usize,
    clock: SharedClock,
}

impl HandoffStore {
    #[must_use]
    pub fn new(ttl: TimeDelta, capacity: usize, clock: SharedClock) -> Self {
        Self { codes: DashMap::new(), ttl, capacity: capacity.max(1), clock }
    }

    /// Issue a code that `requester` can later trade for `session`
    pub fn issue(&self, session: &str, requester: &str) -> String {
        if self.codes.len() >= self.capacity {
            self.make_room();
        }
        let code = generate_session_token();
        let expires_at = expires_after(self.clock.now(), self.ttl);
        self.codes.insert(
            code.clone(),
            Handoff { session: session.to_string(), requester: requester.to_string(), expires_at },
        );
        debug!(handoff = %redact(&code), "issued session handoff");
        code
    }

    /// Trade `code` for its session when `presented` is the original requester
    ///
    /// The code is removed before the requester is checked, so a mismatched
    /// or expired attempt burns it.
    pub fn redeem(&self, code: &str, presented: &str) -> Option<String> {
        let (_, handoff) = self.codes.remove(code)?;
        if self.clock.now() >= handoff.expires_at {
            debug!(handoff = %redact(code), "expired session handoff");
            return None;
        }
        if !tokens_match(&handoff.requester, presented) {
            debug!(handoff = %redact(code), "session handoff presented by another browser");
            return None;
        }
        Some(handoff.session)
    }

    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.codes.len();
        self.codes.retain(|_, handoff| now < handoff.expires_at);
        before.saturating_sub(self.codes.len())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    fn make_room(&self) {
        if self.purge_expired() > 0 {
            return;
        }
        let victim = self
            .codes
            .iter()
            .min_by_key(|entry| entry.value().expires_at)
            .map(|entry| entry.key().clone());
        if let Some(code) = victim {
            self.codes.remove(&code);
        }
    }
}
