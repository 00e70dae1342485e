//! Periodic sweep of expired gateway state
//!
//! Expiry is already enforced on every read; the sweep only reclaims memory
//! held by abandoned flows, stale users and dead session bindings.

use std::sync::Arc;
use std::time::Duration;

use authgate_core::GatewayService;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::scheduling::error::{SchedulerError, SchedulerResult};

#[derive(Debug, Clone)]
pub struct SweepSchedulerConfig {
    /// Time between sweeps.
    pub interval: Duration,
    /// Timeout for awaiting the sweep task join handle.
    pub join_timeout: Duration,
}

impl Default for SweepSchedulerConfig {
    fn default() -> Self {
        Self { interval: Duration::from_secs(60), join_timeout: Duration::from_secs(5) }
    }
}

/// Sweep scheduler with explicit lifecycle management.
pub struct SweepScheduler {
    config: SweepSchedulerConfig,
    gateway: Arc<GatewayService>,
    cancellation: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl SweepScheduler {
    pub fn new(config: SweepSchedulerConfig, gateway: Arc<GatewayService>) -> SchedulerResult<Self> {
        if config.interval.is_zero() {
            return Err(SchedulerError::InvalidInterval(config.interval));
        }
        Ok(Self { config, gateway, cancellation: CancellationToken::new(), handle: None })
    }

    /// Spawn the sweep loop; the first sweep runs one interval after start.
    #[instrument(skip(self))]
    pub fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();
        let cancel = self.cancellation.clone();
        let gateway = self.gateway.clone();
        let period = self.config.interval;

        self.handle = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let report = gateway.purge_expired();
                        debug!(scheduler = "sweep", removed = report.total(), "sweep complete");
                    }
                }
            }
        }));

        info!(
            scheduler = "sweep",
            event = "start",
            interval_secs = period.as_secs(),
            "sweep scheduler started"
        );
        Ok(())
    }

    /// Cancel the loop and wait for the task to finish.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        let Some(handle) = self.handle.take() else {
            return Err(SchedulerError::NotRunning);
        };

        self.cancellation.cancel();
        let join_timeout = self.config.join_timeout;
        tokio::time::timeout(join_timeout, handle)
            .await
            .map_err(|_| SchedulerError::Timeout { seconds: join_timeout.as_secs() })?
            .map_err(|err| SchedulerError::TaskJoinFailed(err.to_string()))?;

        info!(scheduler = "sweep", event = "stop", "sweep scheduler stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for SweepScheduler {
    fn drop(&mut self) {
        self.cancellation.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
