//! Error classification shared by the gateway's module-level errors
//!
//! Each module keeps its own `thiserror` enum (`PkceStoreError`,
//! `TokenEndpointError`, `TokenManagerError`). They all implement
//! [`ErrorClassification`] so callers can decide on retries and log levels
//! without matching on concrete variants.
//!
//! ```rust,ignore
//! impl ErrorClassification for TokenEndpointError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, Self::Network(_))
//!     }
//!
//!     fn severity(&self) -> ErrorSeverity {
//!         match self {
//!             Self::Network(_) => ErrorSeverity::Warning,
//!             Self::Rejected { .. } | Self::Malformed(_) => ErrorSeverity::Error,
//!         }
//!     }
//! }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Standard interface for classifying errors by their characteristics
pub trait ErrorClassification {
    /// Check if this error is retryable
    ///
    /// Retryable errors are transient (timeouts, connection resets, a lost
    /// race on a random value) and may succeed when the caller starts over.
    fn is_retryable(&self) -> bool;

    /// Get the error severity level
    ///
    /// Used for logging decisions.
    fn severity(&self) -> ErrorSeverity;
}

/// Unified severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    /// Informational, typically an expected control-flow outcome
    Info,
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
    /// Critical, immediate action required
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}
