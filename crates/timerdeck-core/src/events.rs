//! One-shot timer events and their delivery to the presentation layer.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::timer::{Timer, TimerLog};

/// Capacity of the broadcast channel. Slow subscribers lose the oldest
/// events rather than stalling ticks.
const CHANNEL_CAPACITY: usize = 256;

/// Raised by the tick that crosses a threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    HalfwayReached {
        timer_id: String,
        timer: Timer,
        at: DateTime<Utc>,
    },
    TimerCompleted {
        timer: Timer,
        log: TimerLog,
        at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Halfway,
    Completed,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::HalfwayReached { .. } => EventKind::Halfway,
            Event::TimerCompleted { .. } => EventKind::Completed,
        }
    }

    pub fn timer_id(&self) -> &str {
        match self {
            Event::HalfwayReached { timer_id, .. } => timer_id,
            Event::TimerCompleted { timer, .. } => &timer.id,
        }
    }
}

/// Fans events out to subscribers, at most once per timer run.
#[derive(Debug)]
pub struct EventNotifier {
    tx: broadcast::Sender<Event>,
    delivered: HashSet<(String, EventKind)>,
}

impl EventNotifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            delivered: HashSet::new(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Deliver an event unless the same kind already fired for this run.
    ///
    /// Returns false for a duplicate. Having no subscribers is not an error.
    pub fn publish(&mut self, event: Event) -> bool {
        let key = (event.timer_id().to_string(), event.kind());
        if !self.delivered.insert(key) {
            tracing::debug!(timer_id = event.timer_id(), kind = ?event.kind(), "suppressed duplicate event");
            return false;
        }
        if self.tx.send(event).is_err() {
            tracing::trace!("event published with no subscribers");
        }
        true
    }

    /// Forget what fired for a timer so its next run can notify again.
    pub fn rearm(&mut self, timer_id: &str) {
        self.delivered.retain(|(id, _)| id != timer_id);
    }
}

impl Default for EventNotifier {
    fn default() -> Self {
        Self::new()
    }
}
