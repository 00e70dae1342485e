//! Background maintenance tasks
//!
//! Schedulers follow the same lifecycle rules:
//! - Explicit lifecycle management (start/stop)
//! - Join handles for spawned tasks
//! - Cancellation token support
//! - Timeout on joining the task during stop

pub mod error;
pub mod sweeper;

pub use error::{SchedulerError, SchedulerResult};
pub use sweeper::{SweepScheduler, SweepSchedulerConfig};
