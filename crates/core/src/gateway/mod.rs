//! Authorization gateway orchestration
//!
//! [`GatewayService`] drives one flow per `state` value through
//! `INITIATED → CALLBACK_RECEIVED → EXCHANGED → PROFILE_FETCHED → COMPLETE`,
//! or `FAILED` at any step, and answers session exchange calls from
//! consumer middleware.

pub mod flow;
pub mod ports;
pub mod service;
pub mod stats;

#[cfg(test)]
mod tests;

pub use flow::{
    CallbackOutcome, CallbackParams, Dashboard, DebugSnapshot, FlowStart, ReturnUrlPolicy,
    SessionHandoff, SweepReport,
};
pub use ports::IdentityHelper;
pub use service::GatewayService;
pub use stats::{GatewayStats, StatsSnapshot};
