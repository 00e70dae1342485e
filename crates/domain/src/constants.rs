//! Gateway constants
//!
//! Defaults for configuration values and fixed protocol strings.

// Server defaults
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_PUBLIC_URL: &str = "http://localhost:8080";
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 10;
pub const CALLBACK_PATH: &str = "/callback";

// Identity provider defaults
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";
pub const DEFAULT_TENANT: &str = "common";
pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
pub const DEFAULT_SCOPES: &[&str] = &["User.Read", "Mail.Read", "Files.Read", "offline_access"];
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_REFRESH_THRESHOLD_SECS: u64 = 60;

// Store lifetimes and bounds
pub const DEFAULT_PKCE_TTL_SECS: u64 = 600;
pub const DEFAULT_PKCE_CAPACITY: usize = 10_000;
pub const DEFAULT_USER_TTL_SECS: u64 = 8 * 60 * 60;
pub const DEFAULT_USER_CAPACITY: usize = 10_000;
pub const DEFAULT_SESSION_CAPACITY: usize = 50_000;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_HANDOFF_TTL_SECS: u64 = 120;

/// Upper bound for any configured TTL (30 days).
pub const MAX_TTL_SECS: u64 = 30 * 24 * 60 * 60;

// Session cookie
pub const SESSION_COOKIE_NAME: &str = "session_token";
pub const SESSION_COOKIE_MAX_AGE_SECS: u64 = DEFAULT_USER_TTL_SECS;

/// Query parameter carrying a single-use session handoff code to a consumer
pub const HANDOFF_PARAM: &str = "authgate_handoff";

// Scope names that drive the derived access flags
pub const MAIL_SCOPE: &str = "Mail.Read";
pub const FILES_SCOPE: &str = "Files.Read";

pub const UNKNOWN_USER_NAME: &str = "Unknown User";
