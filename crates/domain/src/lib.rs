//! # AuthGate Domain
//!
//! Business domain types and models for the AuthGate gateway.
//!
//! This crate contains:
//! - Gateway configuration structures
//! - Domain error types and Result definitions
//! - User records and flow states
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other AuthGate crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use constants::HANDOFF_PARAM;
pub use errors::*;
pub use types::*;
