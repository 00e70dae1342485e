//! Scheduler error types

use authgate_domain::AuthGateError;
use thiserror::Error;

use crate::errors::InfraError;

/// Scheduler-specific errors
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Scheduler is already running
    #[error("Scheduler already running")]
    AlreadyRunning,

    /// Scheduler is not running
    #[error("Scheduler not running")]
    NotRunning,

    /// Sweep interval must be positive
    #[error("Invalid sweep interval: {0:?}")]
    InvalidInterval(std::time::Duration),

    /// Operation timed out
    #[error("Operation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Task join failed
    #[error("Task join failed: {0}")]
    TaskJoinFailed(String),
}

impl From<SchedulerError> for InfraError {
    fn from(err: SchedulerError) -> Self {
        let gateway_err = match err {
            SchedulerError::AlreadyRunning | SchedulerError::NotRunning => {
                AuthGateError::InvalidInput(err.to_string())
            }
            SchedulerError::InvalidInterval(_) => AuthGateError::Config(err.to_string()),
            _ => AuthGateError::Internal(err.to_string()),
        };
        InfraError(gateway_err)
    }
}

impl From<SchedulerError> for AuthGateError {
    fn from(err: SchedulerError) -> Self {
        InfraError::from(err).into()
    }
}

/// Convenience type alias for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;
