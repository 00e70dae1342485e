//! HTTP surface of the gateway and its supervised server handle

pub mod error;
pub mod handlers;
pub mod pages;
pub mod router;

use std::net::SocketAddr;
use std::time::Duration;

use authgate_domain::{AuthGateError, Result};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub use error::{status_for, ApiError};
pub use handlers::AppState;
pub use router::build_router;

use crate::errors::InfraError;

/// Running gateway listener
///
/// Dropping the handle signals shutdown and aborts the serve task; call
/// [`GatewayServer::shutdown`] to drain in-flight requests first.
pub struct GatewayServer {
    local_addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl GatewayServer {
    /// Bind `addr` and serve `router` on a background task
    ///
    /// # Errors
    /// `Config` when the address is in use or unavailable, `Internal` for
    /// other socket failures.
    pub async fn start(addr: &str, router: Router) -> Result<Self> {
        let listener = TcpListener::bind(addr).await.map_err(InfraError::from)?;
        Self::serve(listener, router)
    }

    /// Serve on an already bound listener
    ///
    /// # Errors
    /// `Internal` if the listener's address cannot be read.
    pub fn serve(listener: TcpListener, router: Router) -> Result<Self> {
        let local_addr = listener.local_addr().map_err(InfraError::from)?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
            {
                error!(error = %err, "gateway server error");
            }
        });

        info!(addr = %local_addr, "gateway listening");
        Ok(Self { local_addr, shutdown_tx: Some(shutdown_tx), handle: Some(handle) })
    }

    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.local_addr)
    }

    /// Stop accepting connections and wait up to `grace` for in-flight
    /// requests; the serve task is aborted after that.
    ///
    /// # Errors
    /// `Internal` if the serve task panicked.
    pub async fn shutdown(mut self, grace: Duration) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        let Some(mut handle) = self.handle.take() else {
            return Ok(());
        };

        match tokio::time::timeout(grace, &mut handle).await {
            Ok(Ok(())) => {
                info!("gateway drained");
                Ok(())
            }
            Ok(Err(err)) if err.is_panic() => {
                Err(AuthGateError::Internal(format!("gateway server panicked: {err}")))
            }
            Ok(Err(_)) => Ok(()),
            Err(_) => {
                warn!(grace_secs = grace.as_secs(), "grace period elapsed, aborting connections");
                handle.abort();
                Ok(())
            }
        }
    }
}

impl Drop for GatewayServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if !handle.is_finished() {
                handle.abort();
            }
        }
    }
}
