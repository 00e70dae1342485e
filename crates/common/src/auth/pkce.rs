//! PKCE (Proof Key for Code Exchange) implementation for OAuth 2.0
//!
//! Implements RFC 7636 for authorization without client secrets. The gateway
//! is a public client, so every authorization request carries an S256
//! challenge and the matching verifier is only revealed at token exchange.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// The only challenge method the gateway issues.
pub const CHALLENGE_METHOD: &str = "S256";

const RANDOM_BYTES: usize = 32;

fn random_token() -> String {
    let mut bytes = [0u8; RANDOM_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate a cryptographically secure code verifier
///
/// Returns a URL-safe base64-encoded random string of 32 bytes (43
/// characters). Per RFC 7636, verifiers must be 43-128 characters long.
#[must_use]
pub fn generate_code_verifier() -> String {
    random_token()
}

/// Generate code challenge from verifier using SHA256
///
/// Per RFC 7636, the challenge is BASE64URL(SHA256(ASCII(code_verifier)))
#[must_use]
pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Generate a random state token for CSRF protection
///
/// 32 random bytes, URL-safe base64 (43 characters).
#[must_use]
pub fn generate_state() -> String {
    random_token()
}

/// Generate an opaque browser session value
#[must_use]
pub fn generate_session_token() -> String {
    random_token()
}

/// Compare two secret tokens in constant time
///
/// Used wherever a presented browser value must match a stored one, so the
/// comparison time does not leak a matching prefix.
#[must_use]
pub fn tokens_match(expected: &str, actual: &str) -> bool {
    let (expected, actual) = (expected.as_bytes(), actual.as_bytes());
    if expected.len() != actual.len() {
        return false;
    }
    expected.iter().zip(actual).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
}

/// PKCE challenge pair bound to one `state`
///
/// The verifier is secret until token exchange; the challenge goes out in the
/// authorization request.
#[derive(Clone, PartialEq, Eq)]
pub struct PKCEChallenge {
    /// Correlation value round-tripped through the identity provider
    pub state: String,

    /// Random string (43 chars, base64url encoded)
    pub code_verifier: String,

    /// SHA256 of `code_verifier` (base64url encoded)
    pub code_challenge: String,

    pub created_at: DateTime<Utc>,
}

impl PKCEChallenge {
    /// Generate a fresh verifier/challenge pair for `state`
    ///
    /// # Examples
    /// ```
    /// use authgate_common::auth::pkce::{generate_code_challenge, PKCEChallenge};
    ///
    /// let challenge = PKCEChallenge::for_state("abc", chrono::Utc::now());
    /// assert_eq!(challenge.code_challenge, generate_code_challenge(&challenge.code_verifier));
    /// assert_eq!(challenge.challenge_method(), "S256");
    /// ```
    #[must_use]
    pub fn for_state(state: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        let code_verifier = generate_code_verifier();
        let code_challenge = generate_code_challenge(&code_verifier);

        Self { state: state.into(), code_verifier, code_challenge, created_at }
    }

    /// Get the challenge method (always "S256" for SHA256)
    #[must_use]
    pub const fn challenge_method(&self) -> &'static str {
        CHALLENGE_METHOD
    }
}

impl std::fmt::Debug for PKCEChallenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PKCEChallenge")
            .field("state", &crate::privacy::Redacted(&self.state))
            .field("code_verifier", &"<secret>")
            .field("code_challenge", &crate::privacy::Redacted(&self.code_challenge))
            .field("created_at", &self.created_at)
            .finish()
    }
}
