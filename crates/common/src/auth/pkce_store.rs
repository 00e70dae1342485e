//! PKCE challenge store keyed by `state`
//!
//! Binds an authorization request to its callback. Entries are single-use:
//! [`PkceStore::consume`] removes the entry atomically, so two concurrent
//! callbacks carrying the same `state` can never both obtain the verifier.
//! Entries also expire after a fixed TTL whether or not they were consumed.
//!
//! Expiry is lazy (expired entries are invisible to every read) and the map
//! is bounded: inserting at capacity first purges expired entries, then
//! evicts the entry closest to expiry.

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;
use tracing::{debug, warn};

use super::pkce::PKCEChallenge;
use super::types::AuthorizationContext;
use crate::error::{ErrorClassification, ErrorSeverity};
use crate::privacy::Redacted;
use crate::time::{expires_after, SharedClock};

/// Errors raised when registering a new challenge
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PkceStoreError {
    /// A live challenge already exists for this state; regenerate it.
    #[error("state already has a live challenge")]
    DuplicateState,

    #[error("state must not be empty")]
    EmptyState,
}

impl ErrorClassification for PkceStoreError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::DuplicateState)
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::DuplicateState => ErrorSeverity::Warning,
            Self::EmptyState => ErrorSeverity::Error,
        }
    }
}

/// A stored challenge together with the caller context of its flow
#[derive(Debug, Clone)]
pub struct PendingAuthorization {
    pub challenge: PKCEChallenge,
    pub context: AuthorizationContext,
    pub expires_at: DateTime<Utc>,
}

impl PendingAuthorization {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Concurrent, bounded, TTL-scoped store of outstanding PKCE challenges
pub struct PkceStore {
    entries: DashMap<String, PendingAuthorization>,
    ttl: TimeDelta,
    capacity: usize,
    clock: SharedClock,
}

impl PkceStore {
    /// Create a store whose entries live for `ttl` and which holds at most
    /// `capacity` entries (a zero capacity is treated as one).
    #[must_use]
    pub fn new(ttl: TimeDelta, capacity: usize, clock: SharedClock) -> Self {
        Self { entries: DashMap::new(), ttl, capacity: capacity.max(1), clock }
    }

    #[must_use]
    pub const fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    /// Generate and store a challenge for `state`
    ///
    /// An expired entry under the same state is replaced silently.
    ///
    /// # Errors
    /// [`PkceStoreError::DuplicateState`] if `state` already has a live
    /// entry, [`PkceStoreError::EmptyState`] for an empty state.
    pub fn create(
        &self,
        state: &str,
        context: AuthorizationContext,
    ) -> Result<PKCEChallenge, PkceStoreError> {
        if state.is_empty() {
            return Err(PkceStoreError::EmptyState);
        }

        let now = self.clock.now();
        self.make_room(now);

        let challenge = PKCEChallenge::for_state(state, now);
        let pending = PendingAuthorization {
            challenge: challenge.clone(),
            context,
            expires_at: expires_after(now, self.ttl),
        };

        match self.entries.entry(state.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_live(now) {
                    warn!(state = %Redacted(state), "refusing to overwrite live PKCE challenge");
                    return Err(PkceStoreError::DuplicateState);
                }
                occupied.insert(pending);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(pending);
            }
        }

        debug!(state = %Redacted(state), "stored PKCE challenge");
        Ok(challenge)
    }

    /// Atomically remove and return the live entry for `state`
    ///
    /// Returns `None` for unknown, expired or already-consumed states. Under
    /// concurrent calls for the same state exactly one caller gets `Some`.
    pub fn consume(&self, state: &str) -> Option<PendingAuthorization> {
        let (_, pending) = self.entries.remove(state)?;
        if pending.is_live(self.clock.now()) {
            Some(pending)
        } else {
            debug!(state = %Redacted(state), "discarded expired PKCE challenge");
            None
        }
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, pending| pending.is_live(now));
        before.saturating_sub(self.entries.len())
    }

    /// States of all live entries, for the debug listing
    #[must_use]
    pub fn live_states(&self) -> Vec<String> {
        let now = self.clock.now();
        self.entries
            .iter()
            .filter(|entry| entry.value().is_live(now))
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Number of live entries
    #[must_use]
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.entries.iter().filter(|entry| entry.value().is_live(now)).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn make_room(&self, now: DateTime<Utc>) {
        if self.entries.len() < self.capacity {
            return;
        }

        let purged = self.purge_expired();
        if purged > 0 {
            debug!(purged, "purged expired PKCE challenges at capacity");
        }

        while self.entries.len() >= self.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.value().expires_at)
                .map(|entry| entry.key().clone());

            let Some(state) = oldest else { break };
            self.entries.remove(&state);
            warn!(
                state = %Redacted(&state),
                capacity = self.capacity,
                now = %now,
                "evicted outstanding PKCE challenge at capacity"
            );
        }
    }
}

impl std::fmt::Debug for PkceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkceStore")
            .field("entries", &self.entries.len())
            .field("ttl", &self.ttl)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
