//! Background writer for timer snapshots.
//!
//! The engine queues a [`PersistRequest`] after every change and moves on.
//! The worker coalesces whatever has queued up, keeping only the newest
//! timers and newest logs, and writes them on the blocking pool. Write
//! failures are logged here and never surface to the engine.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::gateway::PersistenceGateway;
use crate::timer::{Timer, TimerLog};

/// Collections that changed since the last request. `None` means unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistRequest {
    pub timers: Option<Vec<Timer>>,
    pub logs: Option<Vec<TimerLog>>,
}

impl PersistRequest {
    pub fn is_empty(&self) -> bool {
        self.timers.is_none() && self.logs.is_none()
    }

    /// Fold a newer request into this one.
    pub fn merge(&mut self, newer: PersistRequest) {
        if newer.timers.is_some() {
            self.timers = newer.timers;
        }
        if newer.logs.is_some() {
            self.logs = newer.logs;
        }
    }
}

/// Cloneable sender side held by the engine.
#[derive(Debug, Clone)]
pub struct PersistHandle {
    tx: mpsc::UnboundedSender<PersistRequest>,
}

impl PersistHandle {
    /// Queue a request. Returns false once the worker has shut down.
    pub fn submit(&self, request: PersistRequest) -> bool {
        if request.is_empty() {
            return true;
        }
        if self.tx.send(request).is_err() {
            tracing::warn!("persistence worker is gone; snapshot not saved");
            return false;
        }
        true
    }
}

pub struct PersistenceWorker {
    handle: JoinHandle<WriteStats>,
}

/// Counters reported when the worker exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub batches: u64,
    pub failures: u64,
}

impl PersistenceWorker {
    /// Spawn the writer on the current tokio runtime.
    pub fn spawn(gateway: Arc<PersistenceGateway>) -> (Self, PersistHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run(gateway, rx));
        (Self { handle }, PersistHandle { tx })
    }

    /// Wait for queued writes to land. Every [`PersistHandle`] must have
    /// been dropped first, or this waits forever.
    pub async fn finish(self) -> WriteStats {
        match self.handle.await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::error!(error = %e, "persistence worker panicked");
                WriteStats::default()
            }
        }
    }
}

async fn run(
    gateway: Arc<PersistenceGateway>,
    mut rx: mpsc::UnboundedReceiver<PersistRequest>,
) -> WriteStats {
    let mut stats = WriteStats::default();
    while let Some(mut request) = rx.recv().await {
        while let Ok(newer) = rx.try_recv() {
            request.merge(newer);
        }

        let gw = Arc::clone(&gateway);
        let result = tokio::task::spawn_blocking(move || write(&gw, request)).await;
        stats.batches += 1;
        match result {
            Ok(0) => {}
            Ok(failed) => stats.failures += failed,
            Err(e) => {
                stats.failures += 1;
                tracing::error!(error = %e, "persistence write task failed");
            }
        }
    }
    tracing::debug!(batches = stats.batches, failures = stats.failures, "persistence worker stopped");
    stats
}

/// Returns the number of failed writes.
fn write(gateway: &PersistenceGateway, request: PersistRequest) -> u64 {
    let mut failed = 0;
    if let Some(timers) = request.timers {
        if let Err(e) = gateway.save_timers(&timers) {
            tracing::warn!(error = %e, "failed to save timers");
            failed += 1;
        }
    }
    if let Some(logs) = request.logs {
        if let Err(e) = gateway.save_logs(&logs) {
            tracing::warn!(error = %e, "failed to save timer logs");
            failed += 1;
        }
    }
    failed
}
