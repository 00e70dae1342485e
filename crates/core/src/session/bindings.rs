//! Server-side mapping from consumer session tokens to user ids
//!
//! A binding is only ever written by a completed callback, for a session
//! value that callback minted itself, so a token the gateway did not issue
//! resolves to nothing.

use authgate_common::time::{expires_after, Clock, SharedClock};
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use tracing::debug;

#[derive(Debug, Clone)]
struct Binding {
    user_id: String,
    expires_at: DateTime<Utc>,
}

pub struct SessionBindings {
    bindings: DashMap<String, Binding>,
    ttl: TimeDelta,
    capacity: usize,
    clock: SharedClock,
}

impl SessionBindings {
    #[must_use]
    pub fn new(ttl: TimeDelta, capacity: usize, clock: SharedClock) -> Self {
        Self { bindings: DashMap::new(), ttl, capacity: capacity.max(1), clock }
    }

    /// Bind `session` to `user_id`, replacing any earlier binding
    pub fn bind(&self, session: &str, user_id: &str) {
        if session.is_empty() {
            return;
        }
        if !self.bindings.contains_key(session) && self.bindings.len() >= self.capacity {
            self.make_room();
        }
        let expires_at = expires_after(self.clock.now(), self.ttl);
        self.bindings
            .insert(session.to_string(), Binding { user_id: user_id.to_string(), expires_at });
        debug!(session_count = self.bindings.len(), "bound consumer session");
    }

    /// User id bound to `session`, if the binding is still live
    #[must_use]
    pub fn resolve(&self, session: &str) -> Option<String> {
        let now = self.clock.now();
        self.bindings
            .get(session)
            .filter(|binding| now < binding.expires_at)
            .map(|binding| binding.user_id.clone())
    }

    pub fn unbind(&self, session: &str) -> bool {
        self.bindings.remove(session).is_some()
    }

    /// Drop every session bound to `user_id`
    pub fn unbind_user(&self, user_id: &str) -> usize {
        let before = self.bindings.len();
        self.bindings.retain(|_, binding| binding.user_id != user_id);
        before.saturating_sub(self.bindings.len())
    }

    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.bindings.len();
        self.bindings.retain(|_, binding| now < binding.expires_at);
        before.saturating_sub(self.bindings.len())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    fn make_room(&self) {
        if self.purge_expired() > 0 {
            return;
        }
        let victim = self
            .bindings
            .iter()
            .min_by_key(|entry| entry.value().expires_at)
            .map(|entry| entry.key().clone());
        if let Some(session) = victim {
            self.bindings.remove(&session);
        }
    }
}
