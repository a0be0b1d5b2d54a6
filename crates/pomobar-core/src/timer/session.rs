use serde::{Deserialize, Serialize};

pub const MS_PER_MINUTE: u64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    Completed,
}

impl Default for TimerState {
    fn default() -> Self {
        TimerState::Idle
    }
}

/// One countdown run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Total length in milliseconds.
    pub duration_ms: u64,
    /// Nominal length credited to the cumulative total on completion.
    pub duration_min: u64,
    /// Epoch milliseconds at which the session was started.
    pub started_at_ms: u64,
    /// Epoch milliseconds at which the session ends. Set on start and on
    /// every resume; meaningless while paused.
    pub end_at_ms: u64,
    /// Time left as of the last tick or transition. Authoritative while
    /// paused; while running it is the last value observed from `end_at_ms`.
    pub remaining_ms: u64,
    pub halfway_fired: bool,
    pub almost_there_fired: bool,
}

impl Session {
    pub fn new(duration_ms: u64, duration_min: u64, now_ms: u64) -> Self {
        Self {
            duration_ms,
            duration_min,
            started_at_ms: now_ms,
            end_at_ms: now_ms.saturating_add(duration_ms),
            remaining_ms: duration_ms,
            halfway_fired: false,
            almost_there_fired: false,
        }
    }

    /// Remaining time derived from the absolute end instant.
    ///
    /// Never exceeds the last observed value, so a clock stepping backwards
    /// cannot make progress run in reverse.
    pub fn remaining_at(&self, now_ms: u64) -> u64 {
        self.end_at_ms
            .saturating_sub(now_ms)
            .min(self.remaining_ms)
    }

    /// Re-anchor the end instant from the frozen remaining time.
    pub fn rearm(&mut self, now_ms: u64) {
        self.end_at_ms = now_ms.saturating_add(self.remaining_ms);
    }

    /// Remaining fraction of the session in `[0, 1]`.
    pub fn progress_of(&self, remaining_ms: u64) -> f64 {
        if self.duration_ms == 0 {
            return 0.0;
        }
        remaining_ms as f64 / self.duration_ms as f64
    }
}
