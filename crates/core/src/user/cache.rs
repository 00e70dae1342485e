//! TTL-bounded cache of authenticated user records
//!
//! Entries are keyed by resolved user id. An expired entry is treated as
//! absent on read and removed by [`UserCache::purge_expired`]. When the cache
//! is full, expired entries go first, then the one closest to expiry.

use std::collections::HashMap;

use authgate_common::auth::TokenSet;
use authgate_common::time::{expires_after, Clock, SharedClock};
use authgate_domain::constants::UNKNOWN_USER_NAME;
use authgate_domain::{AccessFlags, ProfileIdentity, UserListing, UserRecord};
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

pub struct UserCache {
    entries: RwLock<HashMap<String, UserRecord>>,
    ttl: TimeDelta,
    capacity: usize,
    clock: SharedClock,
}

impl UserCache {
    #[must_use]
    pub fn new(ttl: TimeDelta, capacity: usize, clock: SharedClock) -> Self {
        Self { entries: RwLock::new(HashMap::new()), ttl, capacity: capacity.max(1), clock }
    }

    #[must_use]
    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    /// Live record for `user_id`, if any
    #[must_use]
    pub fn lookup(&self, user_id: &str) -> Option<UserRecord> {
        let now = self.clock.now();
        self.entries.read().get(user_id).filter(|record| record.is_live(now)).cloned()
    }

    /// Build and insert the record for `user_id`, replacing any previous one
    ///
    /// Email and display name come from the provider profile; access flags
    /// from the scopes the token was granted.
    pub fn store(&self, user_id: &str, profile: Value, tokens: &TokenSet) -> UserRecord {
        let now = self.clock.now();
        let identity = ProfileIdentity::from_profile(&profile);
        let access = AccessFlags::from_scopes(&tokens.scopes());
        let record = UserRecord {
            id: user_id.to_string(),
            email: identity
                .as_ref()
                .map_or_else(|| user_id.to_string(), |identity| identity.email.clone()),
            name: identity.map_or_else(|| UNKNOWN_USER_NAME.to_string(), |identity| identity.name),
            profile,
            authenticated: true,
            authenticated_at: now,
            expires_at: expires_after(now, self.ttl),
            has_mail_access: access.has_mail_access,
            has_files_access: access.has_files_access,
            token_expires_in: tokens.seconds_until_expiry(now).unwrap_or(tokens.expires_in),
        };

        let mut entries = self.entries.write();
        if !entries.contains_key(user_id) && entries.len() >= self.capacity {
            make_room(&mut entries, self.capacity, now);
        }
        entries.insert(user_id.to_string(), record.clone());
        debug!(user_count = entries.len(), "cached user record");
        record
    }

    /// Remove `user_id`. Returns whether a record (live or not) was present.
    pub fn remove(&self, user_id: &str) -> bool {
        self.entries.write().remove(user_id).is_some()
    }

    /// All live records, most recently authenticated first
    #[must_use]
    pub fn list(&self) -> Vec<UserRecord> {
        let now = self.clock.now();
        let mut users: Vec<UserRecord> =
            self.entries.read().values().filter(|record| record.is_live(now)).cloned().collect();
        users.sort_by(|a, b| b.authenticated_at.cmp(&a.authenticated_at));
        users
    }

    #[must_use]
    pub fn listing(&self) -> UserListing {
        let users: Vec<_> = self.list().iter().map(UserRecord::summary).collect();
        UserListing { cached_users: users.len(), users }
    }

    /// Drop expired records, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, record| record.is_live(now));
        before - entries.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn make_room(entries: &mut HashMap<String, UserRecord>, capacity: usize, now: DateTime<Utc>) {
    entries.retain(|_, record| record.is_live(now));
    if entries.len() < capacity {
        return;
    }
    if let Some(victim) =
        entries.iter().min_by_key(|(_, record)| record.expires_at).map(|(id, _)| id.clone())
    {
        entries.remove(&victim);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use authgate_common::time::{Clock, MockClock};
    use serde_json::json;

    use super::*;
    use crate::testing::sample_profile;

    fn cache(capacity: usize) -> (UserCache, MockClock) {
        let clock = MockClock::new();
        (UserCache::new(TimeDelta::hours(8), capacity, Arc::new(clock.clone())), clock)
    }

    fn tokens(clock: &MockClock, scope: Option<&str>) -> TokenSet {
        TokenSet::new("at".into(), None, None, 3600, scope.map(str::to_string), clock.now())
    }

    #[test]
    fn store_derives_identity_and_flags() {
        let (cache, clock) = cache(8);
        let record = cache.store(
            "ada@contoso.com",
            sample_profile("ada@contoso.com", "Ada Lovelace"),
            &tokens(&clock, Some("User.Read Mail.Read")),
        );

        assert_eq!(record.email, "ada@contoso.com");
        assert_eq!(record.name, "Ada Lovelace");
        assert!(record.authenticated);
        assert!(record.has_mail_access);
        assert!(!record.has_files_access);
        assert_eq!(record.token_expires_in, 3600);
        assert_eq!(record.expires_at - record.authenticated_at, TimeDelta::hours(8));
    }

    #[test]
    fn profile_without_name_uses_placeholder() {
        let (cache, clock) = cache(8);
        let record = cache.store("u1", json!({ "mail": "u1@contoso.com" }), &tokens(&clock, None));

        assert_eq!(record.name, "Unknown User");
        assert_eq!(record.email, "u1@contoso.com");
    }

    #[test]
    fn expired_records_are_absent() {
        let (cache, clock) = cache(8);
        cache.store("ada", sample_profile("ada", "Ada"), &tokens(&clock, None));

        clock.advance(TimeDelta::hours(8));
        assert!(cache.lookup("ada").is_none());
        assert!(cache.list().is_empty());
        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn remove_is_idempotent() {
        let (cache, clock) = cache(8);
        cache.store("ada", sample_profile("ada", "Ada"), &tokens(&clock, None));

        assert!(cache.remove("ada"));
        assert!(!cache.remove("ada"));
        assert!(cache.lookup("ada").is_none());
    }

    #[test]
    fn restore_replaces_existing_record() {
        let (cache, clock) = cache(8);
        cache.store("ada", sample_profile("ada", "Ada"), &tokens(&clock, None));
        clock.advance(TimeDelta::hours(1));
        let second = cache.store("ada", sample_profile("ada", "Ada L."), &tokens(&clock, None));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.lookup("ada").expect("live").name, "Ada L.");
        assert_eq!(second.expires_at, clock.now() + TimeDelta::hours(8));
    }

    #[test]
    fn full_cache_evicts_soonest_expiring() {
        let (cache, clock) = cache(2);
        cache.store("first", sample_profile("first", "First"), &tokens(&clock, None));
        clock.advance(TimeDelta::minutes(1));
        cache.store("second", sample_profile("second", "Second"), &tokens(&clock, None));
        clock.advance(TimeDelta::minutes(1));
        cache.store("third", sample_profile("third", "Third"), &tokens(&clock, None));

        assert_eq!(cache.len(), 2);
        assert!(cache.lookup("first").is_none());
        assert!(cache.lookup("second").is_some());
        assert!(cache.lookup("third").is_some());
    }

    #[test]
    fn listing_counts_live_users() {
        let (cache, clock) = cache(8);
        cache.store("ada", sample_profile("ada", "Ada"), &tokens(&clock, None));
        clock.advance(TimeDelta::minutes(1));
        cache.store("grace", sample_profile("grace", "Grace"), &tokens(&clock, None));

        let listing = cache.listing();
        assert_eq!(listing.cached_users, 2);
        assert_eq!(listing.users[0].id, "grace");
    }
}
