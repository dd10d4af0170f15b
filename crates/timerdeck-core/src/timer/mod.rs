mod model;
mod store;
mod tick;

pub use model::{format_clock, Timer, TimerLog, TimerSpec, TimerStatus};
pub use store::{Command, TimerStore};
pub use tick::{tick, TickOutcome};
