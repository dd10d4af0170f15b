//! # Timerdeck Core Library
//!
//! This library provides the core logic for Timerdeck, a multi-timer
//! countdown tool. Named, categorized timers run independently; each
//! completion is recorded in an immutable history log.
//!
//! ## Architecture
//!
//! - **Timer Store**: Pure transitions over an in-memory snapshot of timers
//!   and history
//! - **Tick**: A single-pass step that advances running timers and detects
//!   halfway and completion thresholds exactly once
//! - **Scheduler**: A tokio task that ticks the engine once per interval
//! - **Storage**: SQLite key-value persistence and TOML configuration
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Command surface over the store
//! - [`TickScheduler`]: Non-reentrant tick loop
//! - [`PersistenceGateway`]: Load/save/export of timers and logs
//! - [`Config`]: Application configuration management

pub mod category;
pub mod engine;
pub mod error;
pub mod events;
pub mod scheduler;
pub mod storage;
pub mod timer;

pub use category::{category_groups, group_by_category, CategoryGroup, TimersByCategory};
pub use engine::{SharedEngine, TimerEngine};
pub use error::{ConfigError, CoreError, DatabaseError, PersistenceError, ValidationError};
pub use events::{Event, EventKind, EventNotifier};
pub use scheduler::TickScheduler;
pub use storage::{Config, Database, PersistenceGateway, PersistenceWorker};
pub use timer::{format_clock, Command, Timer, TimerLog, TimerSpec, TimerStatus, TimerStore};
