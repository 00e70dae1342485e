//! Domain types and models

pub mod user;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use user::{AccessFlags, ProfileIdentity, UserListing, UserRecord, UserSummary};

use crate::errors::AuthGateError;

/// Provider resource a caller can ask for with a user's token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    Profile,
    Emails,
    Files,
}

impl DataKind {
    pub const ALL: [Self; 3] = [Self::Profile, Self::Emails, Self::Files];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Emails => "emails",
            Self::Files => "files",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataKind {
    type Err = AuthGateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "profile" => Ok(Self::Profile),
            "emails" => Ok(Self::Emails),
            "files" => Ok(Self::Files),
            other => Err(AuthGateError::InvalidInput(format!("unknown data kind: {other}"))),
        }
    }
}

/// Stage of one authorization flow, keyed by its `state` value
///
/// `Failed` is terminal; the browser restarts at the start endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowState {
    Initiated,
    CallbackReceived,
    Exchanged,
    ProfileFetched,
    Complete,
    Failed,
}

impl FlowState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initiated => "INITIATED",
            Self::CallbackReceived => "CALLBACK_RECEIVED",
            Self::Exchanged => "EXCHANGED",
            Self::ProfileFetched => "PROFILE_FETCHED",
            Self::Complete => "COMPLETE",
            Self::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_kind_parses_known_names() {
        for kind in DataKind::ALL {
            assert_eq!(kind.as_str().parse::<DataKind>().expect("round trips"), kind);
        }
        assert!("calendar".parse::<DataKind>().is_err());
    }

    #[test]
    fn only_complete_and_failed_are_terminal() {
        assert!(FlowState::Complete.is_terminal());
        assert!(FlowState::Failed.is_terminal());
        assert!(!FlowState::Exchanged.is_terminal());
    }
}
