//! Single-pass tick over the timer collection.
//!
//! Threshold detection and the matching mutation happen in the same pass,
//! so a halfway or completion event can only be produced by the tick that
//! actually crosses it.

use chrono::{DateTime, Utc};

use super::model::{TimerLog, TimerStatus};
use super::store::TimerStore;
use crate::events::Event;

/// Result of advancing every running timer by one second.
#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub store: TimerStore,
    /// In timer order; a timer's halfway event precedes its completion.
    pub events: Vec<Event>,
}

impl TickOutcome {
    pub fn is_idle(&self) -> bool {
        self.events.is_empty()
    }
}

/// Advance all running timers by one unit.
pub fn tick(store: &TimerStore, now: DateTime<Utc>) -> TickOutcome {
    let mut timers = store.timers().to_vec();
    let mut events = Vec::new();
    let mut logs = Vec::new();

    for timer in timers.iter_mut().filter(|t| t.is_running()) {
        if timer.remaining_time == 0 {
            // Already finished; never decremented again.
            timer.status = TimerStatus::Completed;
            continue;
        }

        let next = timer.remaining_time - 1;
        timer.remaining_time = next;

        if timer.halfway_alert_enabled
            && !timer.halfway_alert_triggered
            && next <= timer.halfway_mark()
        {
            timer.halfway_alert_triggered = true;
            events.push(Event::HalfwayReached {
                timer_id: timer.id.clone(),
                timer: timer.clone(),
                at: now,
            });
        }

        if next == 0 {
            timer.status = TimerStatus::Completed;
            let log = TimerLog::for_completion(timer, now);
            events.push(Event::TimerCompleted {
                timer: timer.clone(),
                log: log.clone(),
                at: now,
            });
            logs.push(log);
        }
    }

    let store = logs
        .into_iter()
        .fold(store.with_timers(timers), |s, log| s.append_log(log));
    TickOutcome { store, events }
}
