//! Configuration loader
//!
//! Loads gateway configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `AUTHGATE_CLIENT_ID` is unset, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! Whatever the source, the result is validated before it is returned.
//!
//! ## Environment Variables
//! - `AUTHGATE_CLIENT_ID`: Application (client) id (required)
//! - `AUTHGATE_TENANT`: Tenant segment of the provider URLs
//! - `AUTHGATE_AUTHORITY`: Identity provider base URL
//! - `AUTHGATE_GRAPH_URL`: Resource API base URL
//! - `AUTHGATE_SCOPES`: Space-separated scopes
//! - `AUTHGATE_HOST` / `AUTHGATE_PORT`: Listener address
//! - `AUTHGATE_PUBLIC_URL`: Externally visible base URL (redirect URI base)
//! - `AUTHGATE_DEFAULT_RETURN_URL`: Redirect target after login
//! - `AUTHGATE_ALLOWED_ORIGINS`: Comma-separated consumer origins absolute
//!   `return_url` values may point at
//! - `AUTHGATE_USER_TTL`: User record lifetime in seconds
//! - `AUTHGATE_PKCE_TTL`: PKCE challenge lifetime in seconds
//! - `AUTHGATE_HANDOFF_TTL`: Session handoff code lifetime in seconds
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./authgate.toml` or `./authgate.json` (current working directory)
//! 2. `./config.toml` or `./config.json` (current working directory)
//! 3. The same names relative to the executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use authgate_domain::{AuthGateError, GatewayConfig, Result};

const CONFIG_FILE_NAMES: [&str; 4] =
    ["authgate.toml", "authgate.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `AuthGateError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - The loaded configuration fails validation
pub fn load() -> Result<GatewayConfig> {
    let config = match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            config
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None)?
        }
    };
    config.validate()?;
    Ok(config)
}

/// Load configuration from environment variables
///
/// Only `AUTHGATE_CLIENT_ID` is required; every other setting falls back to
/// its default.
///
/// # Errors
/// Returns `AuthGateError::Config` if the client id is missing or a numeric
/// variable does not parse.
pub fn load_from_env() -> Result<GatewayConfig> {
    let mut config = GatewayConfig::for_client(env_var("AUTHGATE_CLIENT_ID")?);

    if let Some(tenant) = optional_env("AUTHGATE_TENANT") {
        config.provider.tenant = tenant;
    }
    if let Some(authority) = optional_env("AUTHGATE_AUTHORITY") {
        config.provider.authority = authority.trim_end_matches('/').to_string();
    }
    if let Some(graph) = optional_env("AUTHGATE_GRAPH_URL") {
        config.provider.graph_base_url = graph.trim_end_matches('/').to_string();
    }
    if let Some(scopes) = optional_env("AUTHGATE_SCOPES") {
        config.provider.scopes = scopes.split_whitespace().map(str::to_string).collect();
    }
    if let Some(host) = optional_env("AUTHGATE_HOST") {
        config.server.host = host;
    }
    if let Some(port) = parsed_env::<u16>("AUTHGATE_PORT")? {
        config.server.port = port;
    }
    if let Some(public_url) = optional_env("AUTHGATE_PUBLIC_URL") {
        config.server.public_url = public_url.trim_end_matches('/').to_string();
    }
    config.server.default_return_url = optional_env("AUTHGATE_DEFAULT_RETURN_URL");
    if let Some(origins) = optional_env("AUTHGATE_ALLOWED_ORIGINS") {
        config.server.allowed_return_origins = origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Some(ttl) = parsed_env::<u64>("AUTHGATE_USER_TTL")? {
        config.cache.user_ttl_seconds = ttl;
    }
    if let Some(ttl) = parsed_env::<u64>("AUTHGATE_PKCE_TTL")? {
        config.cache.pkce_ttl_seconds = ttl;
    }
    if let Some(ttl) = parsed_env::<u64>("AUTHGATE_HANDOFF_TTL")? {
        config.cache.handoff_ttl_seconds = ttl;
    }

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `AuthGateError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<GatewayConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(AuthGateError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            AuthGateError::Config(
                "No config file found and AUTHGATE_CLIENT_ID is not set".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| AuthGateError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<GatewayConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| AuthGateError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| AuthGateError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(AuthGateError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the standard locations for a configuration file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    if let Some(exe_dir) =
        std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        dirs.push(exe_dir);
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    optional_env(key).ok_or_else(|| {
        AuthGateError::Config(format!("Missing required environment variable: {key}"))
    })
}

/// Non-empty environment variable, if set
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|value| value.trim().to_string()).filter(|v| !v.is_empty())
}

fn parsed_env<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    optional_env(key)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| AuthGateError::Config(format!("Invalid {key}: {e}")))
        })
        .transpose()
}
