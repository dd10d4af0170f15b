//! In-memory timer store.
//!
//! Every transition takes `&self` and returns a new snapshot. Unknown ids
//! and categories leave the snapshot unchanged.
//!
//! ## State Transitions
//!
//! ```text
//! Paused -> Running -> Paused
//! Running -> Completed
//! (Paused | Running | Completed) -> Paused   (reset)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::model::{Timer, TimerLog, TimerSpec, TimerStatus};
use crate::error::ValidationError;

/// One variant per store operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    Add { spec: TimerSpec },
    Start { timer_id: String },
    Pause { timer_id: String },
    Reset { timer_id: String },
    Complete { timer_id: String },
    StartCategory { category: String },
    PauseCategory { category: String },
    ResetCategory { category: String },
    MarkHalfwayTriggered { timer_id: String },
}

/// Canonical collection of timers and completion history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerStore {
    timers: Vec<Timer>,
    logs: Vec<TimerLog>,
}

impl TimerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from persisted collections, repairing any timer whose
    /// status disagrees with its remaining time.
    pub fn from_parts(mut timers: Vec<Timer>, logs: Vec<TimerLog>) -> Self {
        for timer in &mut timers {
            if timer.normalize() {
                tracing::warn!(timer_id = %timer.id, "repaired inconsistent timer record");
            }
        }
        Self { timers, logs }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn timers(&self) -> &[Timer] {
        &self.timers
    }

    pub fn logs(&self) -> &[TimerLog] {
        &self.logs
    }

    pub fn get(&self, timer_id: &str) -> Option<&Timer> {
        self.timers.iter().find(|t| t.id == timer_id)
    }

    pub fn running_count(&self) -> usize {
        self.timers.iter().filter(|t| t.is_running()).count()
    }

    /// Distinct categories in first-seen order.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for timer in &self.timers {
            if !seen.contains(&timer.category.as_str()) {
                seen.push(&timer.category);
            }
        }
        seen
    }

    pub fn into_parts(self) -> (Vec<Timer>, Vec<TimerLog>) {
        (self.timers, self.logs)
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Dispatch a command to the matching transition.
    ///
    /// # Errors
    /// Only [`Command::Add`] can fail, with the spec's validation error.
    pub fn apply(&self, command: &Command, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        let next = match command {
            Command::Add { spec } => self.add(spec.clone(), now)?.0,
            Command::Start { timer_id } => self.start(timer_id),
            Command::Pause { timer_id } => self.pause(timer_id),
            Command::Reset { timer_id } => self.reset(timer_id),
            Command::Complete { timer_id } => self.complete(timer_id),
            Command::StartCategory { category } => self.start_category(category),
            Command::PauseCategory { category } => self.pause_category(category),
            Command::ResetCategory { category } => self.reset_category(category),
            Command::MarkHalfwayTriggered { timer_id } => self.mark_halfway_triggered(timer_id),
        };
        Ok(next)
    }

    /// Create a paused timer. Returns the new snapshot and the timer's id.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] for a blank name or category, or a zero
    /// duration. The store is unchanged in that case.
    pub fn add(&self, spec: TimerSpec, now: DateTime<Utc>) -> Result<(Self, String), ValidationError> {
        spec.validate()?;
        let timer = Timer::from_spec(spec, now);
        let id = timer.id.clone();
        let mut next = self.clone();
        next.timers.push(timer);
        Ok((next, id))
    }

    pub fn start(&self, timer_id: &str) -> Self {
        self.map_where(|t| t.id == timer_id && !t.is_completed(), start_timer)
    }

    pub fn pause(&self, timer_id: &str) -> Self {
        self.map_where(|t| t.id == timer_id && t.is_running(), pause_timer)
    }

    /// The only way out of `Completed`.
    pub fn reset(&self, timer_id: &str) -> Self {
        self.map_where(|t| t.id == timer_id, reset_timer)
    }

    pub fn complete(&self, timer_id: &str) -> Self {
        self.map_where(|t| t.id == timer_id, complete_timer)
    }

    pub fn start_category(&self, category: &str) -> Self {
        self.map_where(|t| t.category == category && !t.is_completed(), start_timer)
    }

    pub fn pause_category(&self, category: &str) -> Self {
        self.map_where(|t| t.category == category && t.is_running(), pause_timer)
    }

    pub fn reset_category(&self, category: &str) -> Self {
        self.map_where(|t| t.category == category, reset_timer)
    }

    pub fn mark_halfway_triggered(&self, timer_id: &str) -> Self {
        self.map_where(
            |t| t.id == timer_id && !t.halfway_alert_triggered,
            |t| t.halfway_alert_triggered = true,
        )
    }

    /// Append a history record. Callers issue one per completion.
    pub fn append_log(&self, entry: TimerLog) -> Self {
        let mut next = self.clone();
        next.logs.push(entry);
        next
    }

    /// Replace the timer collection wholesale, keeping history.
    pub(crate) fn with_timers(&self, timers: Vec<Timer>) -> Self {
        Self {
            timers,
            logs: self.logs.clone(),
        }
    }

    fn map_where(&self, pred: impl Fn(&Timer) -> bool, update: impl Fn(&mut Timer)) -> Self {
        let mut next = self.clone();
        for timer in next.timers.iter_mut().filter(|t| pred(t)) {
            update(timer);
        }
        next
    }
}

fn start_timer(timer: &mut Timer) {
    timer.status = TimerStatus::Running;
}

fn pause_timer(timer: &mut Timer) {
    timer.status = TimerStatus::Paused;
}

fn reset_timer(timer: &mut Timer) {
    timer.status = TimerStatus::Paused;
    timer.remaining_time = timer.duration;
    timer.halfway_alert_triggered = false;
}

fn complete_timer(timer: &mut Timer) {
    timer.status = TimerStatus::Completed;
    timer.remaining_time = 0;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(specs: &[(&str, &str, u32)]) -> (TimerStore, Vec<String>) {
        let mut store = TimerStore::new();
        let mut ids = Vec::new();
        for (name, category, duration) in specs {
            let (next, id) = store
                .add(TimerSpec::new(*name, *category, *duration), Utc::now())
                .unwrap();
            store = next;
            ids.push(id);
        }
        (store, ids)
    }

    #[test]
    fn add_rejects_invalid_spec_and_keeps_store() {
        let (store, _) = store_with(&[("Focus", "Work", 10)]);
        let err = store.add(TimerSpec::new("", "Work", 10), Utc::now());
        assert!(err.is_err());
        assert_eq!(store.timers().len(), 1);
    }

    #[test]
    fn transitions_return_new_snapshot() {
        let (store, ids) = store_with(&[("Focus", "Work", 10)]);
        let started = store.start(&ids[0]);
        assert_eq!(store.get(&ids[0]).unwrap().status, TimerStatus::Paused);
        assert_eq!(started.get(&ids[0]).unwrap().status, TimerStatus::Running);
    }

    #[test]
    fn start_completed_is_noop() {
        let (store, ids) = store_with(&[("Focus", "Work", 10)]);
        let done = store.complete(&ids[0]);
        let again = done.start(&ids[0]);
        assert_eq!(again, done);
        assert_eq!(again.get(&ids[0]).unwrap().status, TimerStatus::Completed);
    }

    #[test]
    fn pause_is_idempotent_and_only_from_running() {
        let (store, ids) = store_with(&[("Focus", "Work", 10)]);
        assert_eq!(store.pause(&ids[0]), store);
        let running = store.start(&ids[0]);
        let once = running.pause(&ids[0]);
        assert_eq!(once.pause(&ids[0]), once);
        assert_eq!(once.get(&ids[0]).unwrap().status, TimerStatus::Paused);
    }

    #[test]
    fn reset_from_completed_restores_run() {
        let (store, ids) = store_with(&[("Focus", "Work", 10)]);
        let done = store
            .start(&ids[0])
            .mark_halfway_triggered(&ids[0])
            .complete(&ids[0]);
        let fresh = done.reset(&ids[0]);
        let t = fresh.get(&ids[0]).unwrap();
        assert_eq!(t.status, TimerStatus::Paused);
        assert_eq!(t.remaining_time, 10);
        assert!(!t.halfway_alert_triggered);
    }

    #[test]
    fn unknown_ids_are_noops() {
        let (store, _) = store_with(&[("Focus", "Work", 10)]);
        assert_eq!(store.start("missing"), store);
        assert_eq!(store.reset("missing"), store);
        assert_eq!(store.complete("missing"), store);
        assert_eq!(store.pause_category("Nowhere"), store);
    }

    #[test]
    fn pause_category_is_selective() {
        let (store, ids) = store_with(&[
            ("A", "Work", 10),
            ("B", "Work", 10),
            ("C", "Home", 10),
            ("D", "Work", 10),
        ]);
        let store = store
            .start(&ids[0])
            .start(&ids[2])
            .complete(&ids[3])
            .pause_category("Work");
        assert_eq!(store.get(&ids[0]).unwrap().status, TimerStatus::Paused);
        assert_eq!(store.get(&ids[1]).unwrap().status, TimerStatus::Paused);
        assert_eq!(store.get(&ids[2]).unwrap().status, TimerStatus::Running);
        assert_eq!(store.get(&ids[3]).unwrap().status, TimerStatus::Completed);
    }

    #[test]
    fn start_category_skips_completed() {
        let (store, ids) = store_with(&[("A", "Work", 10), ("B", "Work", 10)]);
        let store = store.complete(&ids[1]).start_category("Work");
        assert_eq!(store.get(&ids[0]).unwrap().status, TimerStatus::Running);
        assert_eq!(store.get(&ids[1]).unwrap().status, TimerStatus::Completed);
    }

    #[test]
    fn reset_category_applies_to_all_states() {
        let (store, ids) = store_with(&[("A", "Work", 10), ("B", "Work", 5), ("C", "Home", 3)]);
        let store = store
            .start(&ids[0])
            .complete(&ids[1])
            .complete(&ids[2])
            .reset_category("Work");
        assert_eq!(store.get(&ids[0]).unwrap().remaining_time, 10);
        assert_eq!(store.get(&ids[1]).unwrap().status, TimerStatus::Paused);
        assert_eq!(store.get(&ids[1]).unwrap().remaining_time, 5);
        assert_eq!(store.get(&ids[2]).unwrap().status, TimerStatus::Completed);
    }

    #[test]
    fn apply_dispatches_commands() {
        let (store, ids) = store_with(&[("A", "Work", 10)]);
        let now = Utc::now();
        let next = store
            .apply(&Command::Start { timer_id: ids[0].clone() }, now)
            .unwrap();
        assert!(next.get(&ids[0]).unwrap().is_running());

        let added = next
            .apply(&Command::Add { spec: TimerSpec::new("B", "Home", 3) }, now)
            .unwrap();
        assert_eq!(added.timers().len(), 2);
        assert_eq!(added.categories(), vec!["Work", "Home"]);
    }

    #[test]
    fn command_serializes_tagged() {
        let cmd = Command::PauseCategory { category: "Work".into() };
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["type"], "pause_category");
        assert_eq!(json["category"], "Work");
    }
}
