//! Tick scheduler.
//!
//! Drives [`TimerEngine::tick`](crate::engine::TimerEngine::tick) on a fixed
//! cadence from a tokio task. Ticks never overlap: the loop runs one tick to
//! completion before awaiting the next, and a late tick is pushed back
//! rather than fired in a burst.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::engine::SharedEngine;

/// Handle to a running tick loop. Dropping it aborts the loop.
pub struct TickScheduler {
    stop_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<u64>>,
}

impl TickScheduler {
    /// Spawn the tick loop on the current tokio runtime.
    ///
    /// The first tick fires one `period` after start.
    pub fn start(engine: SharedEngine, period: Duration) -> Self {
        let (stop_tx, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(run(engine, period, stop_rx));
        tracing::info!(period_ms = period.as_millis() as u64, "tick scheduler started");
        Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop issuing ticks and wait for the loop to exit.
    ///
    /// Returns the number of ticks that ran.
    pub async fn stop(mut self) -> u64 {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        let ticks = match self.handle.take() {
            Some(handle) => handle.await.unwrap_or_else(|e| {
                tracing::error!(error = %e, "tick loop panicked");
                0
            }),
            None => 0,
        };
        tracing::info!(ticks, "tick scheduler stopped");
        ticks
    }
}

impl Drop for TickScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn run(engine: SharedEngine, period: Duration, mut stop_rx: oneshot::Receiver<()>) -> u64 {
    let start = tokio::time::Instant::now() + period;
    let mut interval = tokio::time::interval_at(start, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks = 0u64;

    loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => break,
            _ = interval.tick() => {
                match engine.with(|e| e.tick(Utc::now())) {
                    Ok(events) => {
                        ticks += 1;
                        if !events.is_empty() {
                            tracing::debug!(tick = ticks, events = events.len(), "tick raised events");
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "stopping tick loop");
                        break;
                    }
                }
            }
        }
    }
    ticks
}
