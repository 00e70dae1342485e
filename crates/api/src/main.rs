//! AuthGate - OAuth2 authorization-code + PKCE gateway
//!
//! Startup: `.env` → tracing → configuration → context → listener and
//! sweeper. Ctrl-C stops the sweeper and drains in-flight requests.

use std::process::ExitCode;

use authgate_infra::config;
use authgate_infra::observability::{init_tracing, json_requested};
use authgate_lib::GatewayContext;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv = dotenvy::dotenv();
    init_tracing(json_requested());
    match dotenv {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(err) => warn!(error = %err, "no .env file loaded"),
    }

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(reason = err.label(), error = %err, "gateway terminated");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> authgate_domain::Result<()> {
    let config = config::load()?;
    let context = GatewayContext::build(config)?;
    let running = context.start().await?;
    info!(url = %context.config.server.public_url, addr = %running.local_addr(), "AuthGate ready");

    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for Ctrl-C, shutting down");
    }
    info!("shutdown requested");
    running.shutdown().await
}
