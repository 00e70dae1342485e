//! # AuthGate Core
//!
//! Pure business logic layer - no HTTP server or provider wire code.
//!
//! This crate contains:
//! - The OAuth client orchestrating token manager and resource fetches
//! - The user cache, session bindings and session handoff codes
//! - The gateway service that sequences the authorization flow
//!
//! ## Architecture Principles
//! - Depends only on `authgate-common` and `authgate-domain`
//! - Provider resource API and identity helper reached through ports
//! - Every component is constructed explicitly and passed by `Arc`

pub mod gateway;
pub mod oauth;
pub mod session;
pub mod user;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use gateway::{
    CallbackOutcome, CallbackParams, Dashboard, DebugSnapshot, FlowStart, GatewayService,
    GatewayStats, IdentityHelper, ReturnUrlPolicy, SessionHandoff, StatsSnapshot, SweepReport,
};
pub use oauth::{OAuthClient, ResourceFetcher};
pub use session::{HandoffStore, SessionBindings};
pub use user::UserCache;
