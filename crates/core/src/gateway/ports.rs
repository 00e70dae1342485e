//! Port interface for the local identity helper

/// Source of the application's registration details
///
/// Resolved once at startup; the gateway treats it as an opaque provider of
/// the client id and the admin-consent URL.
pub trait IdentityHelper: Send + Sync {
    fn client_id(&self) -> &str;

    /// URL a tenant administrator visits to grant consent for the app
    fn admin_consent_url(&self) -> String;
}
