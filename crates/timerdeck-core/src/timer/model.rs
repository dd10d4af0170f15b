//! Timer and history record types.
//!
//! Field names serialize in camelCase so persisted blobs and exports keep
//! the same shape as earlier releases.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimerStatus {
    Running,
    Paused,
    Completed,
}

impl TimerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TimerStatus::Running => "Running",
            TimerStatus::Paused => "Paused",
            TimerStatus::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single countdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timer {
    pub id: String,
    pub name: String,
    /// Total seconds, fixed at creation.
    pub duration: u32,
    pub category: String,
    pub status: TimerStatus,
    /// Seconds left; always within `0..=duration`.
    pub remaining_time: u32,
    #[serde(default, alias = "halfwayAlert")]
    pub halfway_alert_enabled: bool,
    #[serde(default)]
    pub halfway_alert_triggered: bool,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
}

impl Timer {
    /// Build a fresh, paused timer from a validated spec.
    pub(crate) fn from_spec(spec: TimerSpec, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: spec.name,
            duration: spec.duration,
            category: spec.category,
            status: TimerStatus::Paused,
            remaining_time: spec.duration,
            halfway_alert_enabled: spec.halfway_alert_enabled,
            halfway_alert_triggered: false,
            created_at: now.timestamp_millis(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    pub fn is_completed(&self) -> bool {
        self.status == TimerStatus::Completed
    }

    /// Elapsed fraction of the duration, 0.0 ..= 1.0.
    pub fn progress(&self) -> f64 {
        if self.duration == 0 {
            return 0.0;
        }
        let elapsed = self.duration.saturating_sub(self.remaining_time);
        (elapsed as f64 / self.duration as f64).clamp(0.0, 1.0)
    }

    /// `remaining_time` at or below which the halfway alert fires.
    pub fn halfway_mark(&self) -> u32 {
        self.duration / 2
    }

    /// Repair a record read from storage so the status invariants hold.
    ///
    /// Returns true when anything was changed.
    pub(crate) fn normalize(&mut self) -> bool {
        let before = (self.status, self.remaining_time);
        self.remaining_time = self.remaining_time.min(self.duration);
        if self.remaining_time == 0 {
            self.status = TimerStatus::Completed;
        } else if self.status == TimerStatus::Completed {
            self.remaining_time = 0;
        }
        before != (self.status, self.remaining_time)
    }
}

/// Input for creating a timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSpec {
    pub name: String,
    pub category: String,
    pub duration: u32,
    #[serde(default)]
    pub halfway_alert_enabled: bool,
}

impl TimerSpec {
    pub fn new(name: impl Into<String>, category: impl Into<String>, duration: u32) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            duration,
            halfway_alert_enabled: false,
        }
    }

    pub fn with_halfway_alert(mut self, enabled: bool) -> Self {
        self.halfway_alert_enabled = enabled;
        self
    }

    /// Check the creation invariants.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::invalid("name", "timer name is required"));
        }
        if self.category.trim().is_empty() {
            return Err(ValidationError::invalid("category", "category is required"));
        }
        if self.duration == 0 {
            return Err(ValidationError::invalid(
                "duration",
                "duration must be a positive number of seconds",
            ));
        }
        Ok(())
    }
}

/// Immutable record of one completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerLog {
    pub id: String,
    /// Source timer; it may since have been reset.
    pub timer_id: String,
    pub name: String,
    pub category: String,
    pub duration: u32,
    /// Milliseconds since the Unix epoch.
    pub completed_at: i64,
}

impl TimerLog {
    pub(crate) fn for_completion(timer: &Timer, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timer_id: timer.id.clone(),
            name: timer.name.clone(),
            category: timer.category.clone(),
            duration: timer.duration,
            completed_at: now.timestamp_millis(),
        }
    }

    pub fn completed_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.completed_at)
    }
}

/// Render seconds as `m:ss`.
pub fn format_clock(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
