//! Clock abstraction for testability
//!
//! Every expiry decision in the gateway (PKCE TTL, token refresh window, user
//! cache TTL) reads the time through a [`Clock`], so tests can move time
//! forward without sleeping.
//!
//! # Examples
//!
//! ```
//! use chrono::TimeDelta;
//!
//! use authgate_common::time::{Clock, MockClock};
//!
//! let clock = MockClock::new();
//! let start = clock.now();
//! clock.advance(TimeDelta::minutes(10));
//! assert_eq!(clock.now() - start, TimeDelta::minutes(10));
//! ```

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;

/// Source of wall-clock time
pub trait Clock: Send + Sync {
    /// Current UTC time
    fn now(&self) -> DateTime<Utc>;

    /// Milliseconds since the UNIX epoch
    fn millis_since_epoch(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// Real system clock. Use this in production code.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Mock clock for deterministic testing
///
/// Clones share the same offset, so a clone handed to a component observes
/// every `advance` made through the original.
#[derive(Clone)]
pub struct MockClock {
    base: DateTime<Utc>,
    offset: Arc<Mutex<TimeDelta>>,
}

impl MockClock {
    /// Start at the current real time.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    /// Start at a fixed instant.
    #[must_use]
    pub fn starting_at(base: DateTime<Utc>) -> Self {
        Self { base, offset: Arc::new(Mutex::new(TimeDelta::zero())) }
    }

    /// Move time forward (or backward with a negative delta).
    pub fn advance(&self, delta: TimeDelta) {
        let mut offset = self.offset.lock();
        *offset += delta;
    }

    /// Jump to an absolute instant.
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.offset.lock() = instant - self.base;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        self.base + *self.offset.lock()
    }
}

impl fmt::Debug for MockClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockClock").field("now", &self.now()).finish()
    }
}

/// Shared clock handle as stored by components
pub type SharedClock = Arc<dyn Clock>;

/// Convenience constructor for the production clock handle
#[must_use]
pub fn system_clock() -> SharedClock {
    Arc::new(SystemClock)
}

/// `start + ttl`, saturating at the latest representable instant
///
/// Lifetimes come from configuration and provider responses, so the sum is
/// never allowed to overflow.
#[must_use]
pub fn expires_after(start: DateTime<Utc>, ttl: TimeDelta) -> DateTime<Utc> {
    start.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC)
}
