//! Session cookie parsing and `Set-Cookie` construction
//!
//! Shared by the gateway's own routes and the consumer middleware.

use axum::http::header::{HeaderMap, COOKIE};
use authgate_domain::constants::{SESSION_COOKIE_MAX_AGE_SECS, SESSION_COOKIE_NAME};

/// Cookie attributes for the session cookie
#[derive(Clone, Debug)]
pub struct CookieSettings {
    pub name: String,
    pub path: String,
    pub max_age_secs: u64,
    pub http_only: bool,
    pub secure: bool,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            name: SESSION_COOKIE_NAME.to_string(),
            path: "/".to_string(),
            max_age_secs: SESSION_COOKIE_MAX_AGE_SECS,
            http_only: true,
            secure: false,
        }
    }
}

impl CookieSettings {
    /// Defaults, with `Secure` set when the app is served over https
    #[must_use]
    pub fn for_public_url(public_url: &str) -> Self {
        Self { secure: public_url.starts_with("https://"), ..Self::default() }
    }

    /// Session value carried by the request, if any
    #[must_use]
    pub fn read(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|header| header.split(';'))
            .filter_map(|cookie| cookie.trim().split_once('='))
            .find(|(name, value)| name.trim() == self.name && !value.trim().is_empty())
            .map(|(_, value)| value.trim().to_string())
    }

    /// `Set-Cookie` value storing `session`
    #[must_use]
    pub fn set(&self, session: &str) -> String {
        self.render(session, self.max_age_secs)
    }

    /// `Set-Cookie` value deleting the cookie
    #[must_use]
    pub fn clear(&self) -> String {
        self.render("", 0)
    }

    fn render(&self, value: &str, max_age: u64) -> String {
        let mut cookie = format!(
            "{}={}; Path={}; Max-Age={}; SameSite=Lax",
            self.name, value, self.path, max_age
        );
        if self.http_only {
            cookie.push_str("; HttpOnly");
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}
