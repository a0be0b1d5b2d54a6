use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{MilestoneKind, TimerState};

/// Every state change of the engine produces an Event.
/// Front-ends render from events; they never read engine internals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Periodic countdown update. `progress` is the remaining fraction.
    Tick {
        remaining_ms: u64,
        progress: f64,
        display: String,
        at: DateTime<Utc>,
    },
    Milestone {
        kind: MilestoneKind,
        text: String,
        at: DateTime<Utc>,
    },
    /// The message shown for a milestone should be taken down.
    MessageExpired {
        kind: MilestoneKind,
        at: DateTime<Utc>,
    },
    Completed {
        session_minutes: u64,
        total_minutes: u64,
        at: DateTime<Utc>,
    },
    StateChanged {
        state: TimerState,
        at: DateTime<Utc>,
    },
    TotalCleared {
        at: DateTime<Utc>,
    },
    /// The persisted total could not be read or written; timing continues
    /// with the in-memory value.
    PersistenceWarning {
        message: String,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: TimerState,
        remaining_ms: u64,
        duration_ms: u64,
        progress: f64,
        display: String,
        total_minutes: u64,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn is_completed(&self) -> bool {
        matches!(self, Event::Completed { .. })
    }
}
