//! Timer engine: the command surface the presentation layer talks to.
//!
//! The engine owns the canonical [`TimerStore`]. Every command and every
//! tick replaces the whole snapshot. After a replacement it compares old
//! and new collections and, unless a load is in progress, hands the changed
//! ones to the persistence worker.
//!
//! ## Usage
//!
//! ```ignore
//! let engine = TimerEngine::restore_with(&gateway, handle);
//! let shared = SharedEngine::new(engine);
//! let scheduler = TickScheduler::start(shared.clone(), Duration::from_secs(1));
//! shared.with(|e| e.start(&id))?;
//! ```

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::category::{category_groups, group_by_category, CategoryGroup, TimersByCategory};
use crate::error::{Result, ValidationError};
use crate::events::{Event, EventNotifier};
use crate::storage::{PersistHandle, PersistRequest, PersistenceGateway};
use crate::timer::{self, Command, Timer, TimerLog, TimerSpec, TimerStore};

pub struct TimerEngine {
    store: TimerStore,
    notifier: EventNotifier,
    persist: Option<PersistHandle>,
    loading: bool,
}

impl TimerEngine {
    pub fn new(store: TimerStore) -> Self {
        Self {
            store,
            notifier: EventNotifier::new(),
            persist: None,
            loading: false,
        }
    }

    /// Load timers and history from the gateway. Problems while loading
    /// yield empty collections.
    pub fn restore(gateway: &PersistenceGateway) -> Self {
        Self::load(gateway, None)
    }

    /// Like [`TimerEngine::restore`], saving every later change through
    /// `handle`. The loaded state itself is not written back.
    pub fn restore_with(gateway: &PersistenceGateway, handle: PersistHandle) -> Self {
        Self::load(gateway, Some(handle))
    }

    fn load(gateway: &PersistenceGateway, persist: Option<PersistHandle>) -> Self {
        let mut engine = Self::new(TimerStore::new());
        engine.persist = persist;
        engine.loading = true;
        let store = TimerStore::from_parts(gateway.load_timers(), gateway.load_logs());
        tracing::info!(
            timers = store.timers().len(),
            logs = store.logs().len(),
            "restored timer state"
        );
        engine.replace(store);
        engine.loading = false;
        engine
    }

    /// Detach the persistence handle so the worker can drain and exit.
    pub fn take_persistence(&mut self) -> Option<PersistHandle> {
        self.persist.take()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn store(&self) -> &TimerStore {
        &self.store
    }

    pub fn timers(&self) -> &[Timer] {
        self.store.timers()
    }

    pub fn logs(&self) -> &[TimerLog] {
        self.store.logs()
    }

    pub fn get(&self, timer_id: &str) -> Option<&Timer> {
        self.store.get(timer_id)
    }

    pub fn timers_by_category(&self) -> TimersByCategory {
        group_by_category(self.store.timers())
    }

    pub fn category_groups(&self) -> Vec<CategoryGroup> {
        category_groups(self.store.timers())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.notifier.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Create a timer and return its id.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] for an invalid spec; nothing changes.
    pub fn add_timer(&mut self, spec: TimerSpec) -> Result<String, ValidationError> {
        let (next, id) = self.store.add(spec, Utc::now())?;
        tracing::debug!(timer_id = %id, "timer added");
        self.replace(next);
        Ok(id)
    }

    pub fn start(&mut self, timer_id: &str) {
        self.run(Command::Start { timer_id: timer_id.to_string() });
    }

    pub fn pause(&mut self, timer_id: &str) {
        self.run(Command::Pause { timer_id: timer_id.to_string() });
    }

    pub fn reset(&mut self, timer_id: &str) {
        self.run(Command::Reset { timer_id: timer_id.to_string() });
    }

    pub fn complete(&mut self, timer_id: &str) {
        self.run(Command::Complete { timer_id: timer_id.to_string() });
    }

    pub fn start_category(&mut self, category: &str) {
        self.run(Command::StartCategory { category: category.to_string() });
    }

    pub fn pause_category(&mut self, category: &str) {
        self.run(Command::PauseCategory { category: category.to_string() });
    }

    pub fn reset_category(&mut self, category: &str) {
        self.run(Command::ResetCategory { category: category.to_string() });
    }

    /// Apply any command.
    ///
    /// # Errors
    /// Only [`Command::Add`] can fail.
    pub fn apply(&mut self, command: Command) -> Result<(), ValidationError> {
        let next = self.store.apply(&command, Utc::now())?;
        tracing::debug!(?command, "command applied");
        self.replace(next);
        self.rearm_for(&command);
        Ok(())
    }

    /// Advance running timers by one tick and publish resulting events.
    ///
    /// Returns the events raised by this tick.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        if self.store.running_count() == 0 {
            return Vec::new();
        }
        let outcome = timer::tick(&self.store, now);
        self.replace(outcome.store);

        let mut delivered = Vec::with_capacity(outcome.events.len());
        for event in outcome.events {
            if let Event::TimerCompleted { timer, .. } = &event {
                tracing::info!(timer_id = %timer.id, name = %timer.name, "timer completed");
            }
            if self.notifier.publish(event.clone()) {
                delivered.push(event);
            }
        }
        delivered
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn run(&mut self, command: Command) {
        // Only Add can fail validation.
        if let Err(e) = self.apply(command) {
            tracing::warn!(error = %e, "command rejected");
        }
    }

    /// A reset starts a new run, so its notifications may fire again.
    fn rearm_for(&mut self, command: &Command) {
        match command {
            Command::Reset { timer_id } => self.notifier.rearm(timer_id),
            Command::ResetCategory { category } => {
                for timer in self.store.timers().iter().filter(|t| &t.category == category) {
                    self.notifier.rearm(&timer.id);
                }
            }
            _ => {}
        }
    }

    fn replace(&mut self, next: TimerStore) {
        let request = PersistRequest {
            timers: (next.timers() != self.store.timers()).then(|| next.timers().to_vec()),
            logs: (next.logs() != self.store.logs()).then(|| next.logs().to_vec()),
        };
        self.store = next;
        if self.loading {
            return;
        }
        if let Some(handle) = &self.persist {
            handle.submit(request);
        }
    }
}

/// Engine shared between the scheduler and command sources.
///
/// The lock is held only for synchronous transitions, never across an await.
#[derive(Clone)]
pub struct SharedEngine(Arc<Mutex<TimerEngine>>);

impl SharedEngine {
    pub fn new(engine: TimerEngine) -> Self {
        Self(Arc::new(Mutex::new(engine)))
    }

    /// Run `f` with exclusive access to the engine.
    ///
    /// # Errors
    /// Returns [`crate::CoreError::LockPoisoned`] if a previous holder panicked.
    pub fn with<R>(&self, f: impl FnOnce(&mut TimerEngine) -> R) -> Result<R> {
        let mut engine = self.0.lock()?;
        Ok(f(&mut engine))
    }
}
