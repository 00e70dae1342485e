//! Tracing setup for the gateway binary and its tests

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info,authgate=debug,tower_http=info";

/// Whether `AUTHGATE_LOG_JSON` asks for JSON output
#[must_use]
pub fn json_requested() -> bool {
    std::env::var("AUTHGATE_LOG_JSON")
        .map(|value| matches!(value.trim(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Install the global subscriber
///
/// Returns `false` if a subscriber was already installed, which happens when
/// several tests initialise tracing in one process.
pub fn init_tracing(json: bool) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    let result = if json {
        registry.with(tracing_subscriber::fmt::layer().json().with_current_span(false)).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer().with_target(false)).try_init()
    };
    result.is_ok()
}
