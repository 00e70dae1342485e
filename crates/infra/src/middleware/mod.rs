//! Middleware for consumer applications

pub mod session;

pub use session::{CurrentUser, ExchangeOutcome, HandoffGrant, SessionMiddleware};
