//! Hand-off of work from the network thread to the simulation thread.
//!
//! [`bridge`] returns the two ends of one bounded queue. The [`BridgeHandle`]
//! side is cheap to clone and never touches world state; the [`BridgePump`]
//! side lives with the simulation and drains the queue once per host tick.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{
    bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender, TrySendError,
};
use thiserror::Error;
use tracing::{error, warn};

use crate::executor::ExecError;
use crate::metrics::BridgeMetrics;
use crate::world::GameClient;

pub type UnitOfWork = Box<dyn FnOnce(&mut dyn GameClient) -> Result<(), ExecError> + Send>;

pub struct Job {
    pub label: &'static str,
    work: UnitOfWork,
}

impl Job {
    pub fn new<F>(label: &'static str, work: F) -> Self
    where
        F: FnOnce(&mut dyn GameClient) -> Result<(), ExecError> + Send + 'static,
    {
        Self {
            label,
            work: Box::new(work),
        }
    }
}

/// What `submit` does when the queue is at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueFullPolicy {
    Reject,
    /// Evict the oldest queued unit to make room.
    DropOldest,
    /// Wait for room up to the given duration, then reject.
    Block(Duration),
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BridgeError {
    #[error("simulation queue full")]
    QueueFull,
    #[error("simulation bridge is closed")]
    Closed,
    #[error("timed out waiting for the simulation thread")]
    Timeout,
    #[error("simulation thread dropped the request")]
    Dropped,
}

pub fn bridge(
    capacity: usize,
    policy: QueueFullPolicy,
    metrics: Arc<BridgeMetrics>,
) -> (BridgeHandle, BridgePump) {
    let (tx, rx) = bounded(capacity.max(1));
    let handle = BridgeHandle {
        tx,
        evict: rx.clone(),
        closed: Arc::new(AtomicBool::new(false)),
        policy,
        metrics: Arc::clone(&metrics),
    };
    let pump = BridgePump { rx, metrics };
    (handle, pump)
}

#[derive(Clone)]
pub struct BridgeHandle {
    tx: Sender<Job>,
    evict: Receiver<Job>,
    closed: Arc<AtomicBool>,
    policy: QueueFullPolicy,
    metrics: Arc<BridgeMetrics>,
}

impl BridgeHandle {
    /// Queue `job` for the next simulation turn. Returns once the job is
    /// queued, never waiting for it to run.
    pub fn submit(&self, job: Job) -> Result<(), BridgeError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BridgeError::Closed);
        }
        match self.policy {
            QueueFullPolicy::Reject => match self.tx.try_send(job) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(_)) => Err(BridgeError::QueueFull),
                Err(TrySendError::Disconnected(_)) => Err(BridgeError::Closed),
            },
            QueueFullPolicy::DropOldest => {
                let mut job = job;
                loop {
                    match self.tx.try_send(job) {
                        Ok(()) => return Ok(()),
                        Err(TrySendError::Disconnected(_)) => return Err(BridgeError::Closed),
                        Err(TrySendError::Full(rejected)) => {
                            job = rejected;
                            if let Ok(evicted) = self.evict.try_recv() {
                                self.metrics.record_discarded(1);
                                warn!(
                                    target: "ai_bridge::bridge",
                                    label = evicted.label,
                                    "unit.evicted=queue_full"
                                );
                            }
                        }
                    }
                }
            }
            QueueFullPolicy::Block(timeout) => match self.tx.send_timeout(job, timeout) {
                Ok(()) => Ok(()),
                Err(SendTimeoutError::Timeout(_)) => Err(BridgeError::QueueFull),
                Err(SendTimeoutError::Disconnected(_)) => Err(BridgeError::Closed),
            },
        }
    }

    /// Run `f` on the simulation thread and wait up to `timeout` for its
    /// result.
    pub fn call<T, F>(
        &self,
        label: &'static str,
        f: F,
        timeout: Duration,
    ) -> Result<T, BridgeError>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn GameClient) -> T + Send + 'static,
    {
        let (reply_tx, reply_rx) = bounded(1);
        self.submit(Job::new(label, move |client| {
            // The caller may have given up already; nothing to do then.
            let _ = reply_tx.send(f(client));
            Ok(())
        }))?;
        match reply_rx.recv_timeout(timeout) {
            Ok(value) => Ok(value),
            Err(RecvTimeoutError::Timeout) => Err(BridgeError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(BridgeError::Dropped),
        }
    }

    /// Refuse further submissions. Already queued units stay queued.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn pending(&self) -> usize {
        self.tx.len()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpReport {
    pub executed: usize,
    pub failed: usize,
    pub panicked: usize,
}

pub struct BridgePump {
    rx: Receiver<Job>,
    metrics: Arc<BridgeMetrics>,
}

impl BridgePump {
    /// Run the units that were queued when this call started. Units queued
    /// while it runs wait for the next turn.
    pub fn run_pending(&mut self, client: &mut dyn GameClient) -> PumpReport {
        let mut report = PumpReport::default();
        let budget = self.rx.len();
        for _ in 0..budget {
            let Ok(job) = self.rx.try_recv() else {
                break;
            };
            let Job { label, work } = job;
            match panic::catch_unwind(AssertUnwindSafe(|| work(&mut *client))) {
                Ok(Ok(())) => {
                    report.executed += 1;
                    self.metrics.record_executed();
                }
                Ok(Err(err)) => {
                    report.failed += 1;
                    self.metrics.record_failure();
                    warn!(
                        target: "ai_bridge::exec",
                        label,
                        error = %err,
                        "unit.failed"
                    );
                }
                Err(payload) => {
                    report.panicked += 1;
                    self.metrics.record_failure();
                    error!(
                        target: "ai_bridge::exec",
                        label,
                        panic = %panic_message(payload.as_ref()),
                        "unit.panicked"
                    );
                }
            }
        }
        report
    }

    /// Drop every queued unit without running it.
    pub fn discard_pending(&mut self) -> usize {
        let discarded = self.rx.try_iter().count();
        if discarded > 0 {
            self.metrics.record_discarded(discarded);
        }
        discarded
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
