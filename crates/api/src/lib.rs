//! # AuthGate App
//!
//! Process layer of the gateway.
//!
//! This crate contains:
//! - The gateway context (dependency injection)
//! - The `authgate` binary: startup sequence and graceful shutdown
//!
//! ## Architecture
//! - Depends on `common`, `domain`, `core` and `infra`
//! - Wires up the hexagonal architecture

pub mod context;

pub use context::{GatewayContext, RunningGateway};
