//! User record types
//!
//! A cached user is built from the identity provider's profile payload plus
//! the scope set granted to the token that fetched it.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{FILES_SCOPE, MAIL_SCOPE, UNKNOWN_USER_NAME};

/// Cached, expiring user record returned by the exchange endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Stable identifier (UPN, falling back to mail)
    pub id: String,
    pub email: String,
    pub name: String,
    /// Raw provider profile payload
    pub profile: Value,
    pub authenticated: bool,
    pub authenticated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub has_mail_access: bool,
    pub has_files_access: bool,
    /// Seconds the access token had left when the user was cached
    pub token_expires_in: i64,
}

impl UserRecord {
    /// A record is live strictly before `expires_at`.
    #[must_use]
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    #[must_use]
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            authenticated_at: self.authenticated_at,
            expires_at: self.expires_at,
        }
    }
}

/// Row of the administrative user listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub authenticated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Response body of `GET /api/users`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserListing {
    pub cached_users: usize,
    pub users: Vec<UserSummary>,
}

/// Identity fields resolved from a provider profile payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileIdentity {
    pub id: String,
    pub email: String,
    pub name: String,
}

impl ProfileIdentity {
    /// Resolve identity fields from a Graph-style `/me` payload.
    ///
    /// The id prefers `userPrincipalName` over `mail`, while the email prefers
    /// `mail` over `userPrincipalName`. Returns `None` when the payload has
    /// neither, since such a profile cannot be keyed.
    #[must_use]
    pub fn from_profile(profile: &Value) -> Option<Self> {
        let upn = non_empty(profile, "userPrincipalName");
        let mail = non_empty(profile, "mail");

        let id = upn.or(mail)?.to_string();
        let email = mail.or(upn).unwrap_or_default().to_string();
        let name = non_empty(profile, "displayName").unwrap_or(UNKNOWN_USER_NAME).to_string();

        Some(Self { id, email, name })
    }
}

/// Access flags derived from a granted scope set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessFlags {
    pub has_mail_access: bool,
    pub has_files_access: bool,
}

impl AccessFlags {
    #[must_use]
    pub fn from_scopes(scopes: &BTreeSet<String>) -> Self {
        Self {
            has_mail_access: scopes.contains(MAIL_SCOPE),
            has_files_access: scopes.contains(FILES_SCOPE),
        }
    }
}

fn non_empty<'a>(profile: &'a Value, key: &str) -> Option<&'a str> {
    profile.get(key).and_then(Value::as_str).filter(|value| !value.is_empty())
}
