use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters shared between the request server and the simulation pump.
#[derive(Debug, Default)]
pub struct BridgeMetrics {
    requests: AtomicU64,
    observations: AtomicU64,
    actions_submitted: AtomicU64,
    actions_rejected: AtomicU64,
    units_executed: AtomicU64,
    resolution_misses: AtomicU64,
    execution_failures: AtomicU64,
    units_discarded: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub observations: u64,
    pub actions_submitted: u64,
    pub actions_rejected: u64,
    pub units_executed: u64,
    pub resolution_misses: u64,
    pub execution_failures: u64,
    pub units_discarded: u64,
}

impl MetricsSnapshot {
    /// One-line JSON form for the shutdown log.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl BridgeMetrics {
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_observation(&self) {
        self.observations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_submitted(&self) {
        self.actions_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.actions_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_executed(&self) {
        self.units_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_resolution_miss(&self) {
        self.resolution_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.execution_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_discarded(&self, count: usize) {
        self.units_discarded
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            observations: self.observations.load(Ordering::Relaxed),
            actions_submitted: self.actions_submitted.load(Ordering::Relaxed),
            actions_rejected: self.actions_rejected.load(Ordering::Relaxed),
            units_executed: self.units_executed.load(Ordering::Relaxed),
            resolution_misses: self.resolution_misses.load(Ordering::Relaxed),
            execution_failures: self.execution_failures.load(Ordering::Relaxed),
            units_discarded: self.units_discarded.load(Ordering::Relaxed),
        }
    }
}
