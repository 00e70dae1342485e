//! # AuthGate Infrastructure
//!
//! Adapters that give the gateway its I/O.
//!
//! This crate contains:
//! - Configuration loading (environment, TOML/JSON files)
//! - The reqwest-based resource fetcher for the Graph API
//! - The configured identity helper
//! - The axum HTTP surface and its supervised server handle
//! - Session middleware for consumer applications
//! - Background sweeping and tracing setup
//!
//! ## Architecture
//! - Implements ports defined in `authgate-core`
//! - Depends on `authgate-common`, `authgate-domain` and `authgate-core`
//! - Contains all "impure" code (sockets, outbound HTTP, environment)

pub mod config;
pub mod cookies;
pub mod errors;
pub mod http;
pub mod identity;
pub mod middleware;
pub mod observability;
pub mod scheduling;
pub mod server;

pub use cookies::CookieSettings;
pub use errors::InfraError;
pub use http::GraphResourceFetcher;
pub use identity::ConfiguredIdentity;
pub use server::{build_router, AppState, GatewayServer};
