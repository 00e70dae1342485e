//! Testing utilities and helpers
//!
//! - **[`mocks`]**: scriptable [`TokenEndpoint`](crate::auth::TokenEndpoint)
//!   and token response builders
//!
//! The controllable clock lives in [`crate::time`] and is re-exported here
//! for convenience.

pub mod mocks;

pub use mocks::{token_response, MockTokenEndpoint};

pub use crate::time::MockClock;
