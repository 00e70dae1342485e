//! Time utilities and abstractions
//!
//! - **[`clock`]**: real and mock wall clocks behind the [`Clock`] trait

pub mod clock;

pub use clock::{expires_after, system_clock, Clock, MockClock, SharedClock, SystemClock};
