//! Process-lifetime flow counters reported by the debug endpoint

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct GatewayStats {
    flows_started: AtomicU64,
    callbacks_completed: AtomicU64,
    callbacks_failed: AtomicU64,
    exchange_hits: AtomicU64,
    exchange_backfills: AtomicU64,
    exchange_auth_required: AtomicU64,
    handoffs_issued: AtomicU64,
    handoffs_redeemed: AtomicU64,
}

/// Point-in-time copy of [`GatewayStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub flows_started: u64,
    pub callbacks_completed: u64,
    pub callbacks_failed: u64,
    pub exchange_hits: u64,
    pub exchange_backfills: u64,
    pub exchange_auth_required: u64,
    pub handoffs_issued: u64,
    pub handoffs_redeemed: u64,
}

impl GatewayStats {
    pub fn flow_started(&self) {
        self.flows_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn callback_completed(&self) {
        self.callbacks_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn callback_failed(&self) {
        self.callbacks_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn exchange_hit(&self) {
        self.exchange_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn exchange_backfill(&self) {
        self.exchange_backfills.fetch_add(1, Ordering::Relaxed);
    }

    pub fn exchange_auth_required(&self) {
        self.exchange_auth_required.fetch_add(1, Ordering::Relaxed);
    }

    pub fn handoff_issued(&self) {
        self.handoffs_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn handoff_redeemed(&self) {
        self.handoffs_redeemed.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            flows_started: self.flows_started.load(Ordering::Relaxed),
            callbacks_completed: self.callbacks_completed.load(Ordering::Relaxed),
            callbacks_failed: self.callbacks_failed.load(Ordering::Relaxed),
            exchange_hits: self.exchange_hits.load(Ordering::Relaxed),
            exchange_backfills: self.exchange_backfills.load(Ordering::Relaxed),
            exchange_auth_required: self.exchange_auth_required.load(Ordering::Relaxed),
            handoffs_issued: self.handoffs_issued.load(Ordering::Relaxed),
            handoffs_redeemed: self.handoffs_redeemed.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_counters() {
        let stats = GatewayStats::default();
        stats.flow_started();
        stats.flow_started();
        stats.callback_failed();
        stats.exchange_auth_required();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.flows_started, 2);
        assert_eq!(snapshot.callbacks_failed, 1);
        assert_eq!(snapshot.callbacks_completed, 0);
        assert_eq!(snapshot.exchange_auth_required, 1);
    }
}
