//! Grouping of timers by category.
//!
//! Recomputed from the current snapshot on every read; nothing is cached.

use indexmap::IndexMap;
use serde::Serialize;

use crate::timer::Timer;

/// Category name to its timers, both in insertion order.
pub type TimersByCategory = IndexMap<String, Vec<Timer>>;

pub fn group_by_category(timers: &[Timer]) -> TimersByCategory {
    let mut groups = TimersByCategory::new();
    for timer in timers {
        groups
            .entry(timer.category.clone())
            .or_default()
            .push(timer.clone());
    }
    groups
}

/// One bucket of the grouping, with the flags that decide which bulk
/// actions make sense for it.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryGroup {
    pub category: String,
    pub timers: Vec<Timer>,
}

impl CategoryGroup {
    pub fn has_running(&self) -> bool {
        self.timers.iter().any(Timer::is_running)
    }

    /// Any timer not yet completed.
    pub fn has_pending(&self) -> bool {
        self.timers.iter().any(|t| !t.is_completed())
    }

    pub fn completed_count(&self) -> usize {
        self.timers.iter().filter(|t| t.is_completed()).count()
    }
}

pub fn category_groups(timers: &[Timer]) -> Vec<CategoryGroup> {
    group_by_category(timers)
        .into_iter()
        .map(|(category, timers)| CategoryGroup { category, timers })
        .collect()
}
