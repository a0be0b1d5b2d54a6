//! Timer engine implementation.
//!
//! The timer engine is a wall-clock-based state machine. It does not use
//! internal threads - the caller is responsible for calling `tick()` periodically
//! (see [`crate::driver::TimerDriver`] for a tokio-based caller).
//!
//! Remaining time is always derived from an absolute end instant rather than
//! decremented per tick, so slow or skipped ticks never accumulate error.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//!            |
//!            v
//!        Completed
//! (start from any state begins a new session; clear from any state -> Idle)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(SystemClock, Box::new(store), EngineSettings::default());
//! engine.start(25)?;
//! // In a loop:
//! for event in engine.tick() { render(event); }
//! ```

use rand::SeedableRng;
use rand_pcg::Mcg128Xsl64;
use tracing::{debug, info, warn};

use super::display::format_remaining;
use super::milestone::{select_message, MessageCatalog, MilestoneKind};
use super::session::{Session, TimerState, MS_PER_MINUTE};
use crate::clock::{Clock, SystemClock};
use crate::error::{CoreError, Result, StorageError};
use crate::events::Event;
use crate::total::{CumulativeTotal, TotalStore};

/// Tunables for milestone firing.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Remaining fraction at or below which the halfway milestone fires.
    pub halfway_threshold: f64,
    /// Remaining fraction at or below which the almost-there milestone fires.
    pub almost_there_threshold: f64,
    pub catalog: MessageCatalog,
    /// Seed for message selection; `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            halfway_threshold: 0.5,
            almost_there_threshold: 1.0 / 3.0,
            catalog: MessageCatalog::default(),
            seed: None,
        }
    }
}

/// Core timer engine.
///
/// Owns the current [`Session`] and the [`CumulativeTotal`]; the total is
/// mirrored into a [`TotalStore`] on every change.
pub struct TimerEngine<C: Clock = SystemClock> {
    clock: C,
    store: Box<dyn TotalStore>,
    settings: EngineSettings,
    rng: Mcg128Xsl64,
    state: TimerState,
    session: Option<Session>,
    total: CumulativeTotal,
    /// False until the stored total has been read. Until then `total` only
    /// holds minutes credited since startup and must be merged before saving.
    total_loaded: bool,
    warnings: Vec<Event>,
}

impl<C: Clock> TimerEngine<C> {
    /// Create an idle engine, loading the persisted total once.
    ///
    /// A store that cannot be read leaves the total at zero; the failure is
    /// queued as a `PersistenceWarning` (see [`Self::take_warnings`]). The
    /// stored value is read again before the next save rather than
    /// overwritten.
    pub fn new(clock: C, store: Box<dyn TotalStore>, settings: EngineSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => Mcg128Xsl64::seed_from_u64(seed),
            None => Mcg128Xsl64::from_entropy(),
        };
        let mut engine = Self {
            clock,
            store,
            settings,
            rng,
            state: TimerState::Idle,
            session: None,
            total: CumulativeTotal::default(),
            total_loaded: false,
            warnings: Vec::new(),
        };

        match engine.store.load_total() {
            Ok(minutes) => {
                engine.total.minutes = minutes.unwrap_or(0);
                engine.total_loaded = true;
            }
            // Nothing to preserve in an unparsable value.
            Err(e @ StorageError::Corrupt { .. }) => {
                engine.total_loaded = true;
                let warning = engine.persistence_warning("load", &e);
                engine.warnings.push(warning);
            }
            Err(e) => {
                let warning = engine.persistence_warning("load", &e);
                engine.warnings.push(warning);
            }
        }
        engine
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn total_minutes(&self) -> u64 {
        self.total.minutes
    }

    /// Time left right now. Derived from the clock while running.
    pub fn remaining_ms(&self) -> u64 {
        match (&self.session, self.state) {
            (Some(s), TimerState::Running) => s.remaining_at(self.clock.now_ms()),
            (Some(s), TimerState::Paused) => s.remaining_ms,
            _ => 0,
        }
    }

    /// Remaining fraction of the session: 1.0 at start, 0.0 when done or idle.
    pub fn progress(&self) -> f64 {
        self.session
            .as_ref()
            .map(|s| s.progress_of(self.remaining_ms()))
            .unwrap_or(0.0)
    }

    pub fn display_time(&self) -> String {
        format_remaining(self.remaining_ms())
    }

    /// Warnings raised outside any command, e.g. a failed initial load.
    pub fn take_warnings(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.warnings)
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        let remaining_ms = self.remaining_ms();
        Event::StateSnapshot {
            state: self.state,
            remaining_ms,
            duration_ms: self.session.as_ref().map(|s| s.duration_ms).unwrap_or(0),
            progress: self.progress(),
            display: format_remaining(remaining_ms),
            total_minutes: self.total.minutes,
            at: self.clock.now_utc(),
        }
    }

    /// Event telling front-ends to take down a milestone message.
    pub fn message_expired(&self, kind: MilestoneKind) -> Event {
        Event::MessageExpired {
            kind,
            at: self.clock.now_utc(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a session of `duration_min` minutes, replacing any current one.
    pub fn start(&mut self, duration_min: u64) -> Result<Vec<Event>> {
        if duration_min == 0 {
            return Err(CoreError::InvalidDuration(duration_min));
        }
        self.begin(duration_min.saturating_mul(MS_PER_MINUTE), duration_min)
    }

    /// Begin a session measured in milliseconds. Whole minutes of it are
    /// credited on completion.
    pub fn start_ms(&mut self, duration_ms: u64) -> Result<Vec<Event>> {
        if duration_ms == 0 {
            return Err(CoreError::InvalidDuration(duration_ms));
        }
        self.begin(duration_ms, duration_ms / MS_PER_MINUTE)
    }

    fn begin(&mut self, duration_ms: u64, duration_min: u64) -> Result<Vec<Event>> {
        if matches!(self.state, TimerState::Running | TimerState::Paused) {
            info!(state = ?self.state, "replacing in-flight session");
        }
        let now = self.clock.now_ms();
        self.session = Some(Session::new(duration_ms, duration_min, now));
        self.state = TimerState::Running;
        info!(duration_ms, duration_min, "session started");

        Ok(vec![
            self.state_changed(),
            self.tick_event(duration_ms, 1.0),
        ])
    }

    /// Call periodically while running.
    pub fn tick(&mut self) -> Vec<Event> {
        if self.state != TimerState::Running {
            return Vec::new();
        }
        let now = self.clock.now_ms();
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };

        let remaining = session.remaining_at(now);
        session.remaining_ms = remaining;
        if remaining == 0 {
            return self.finish();
        }

        let progress = session.progress_of(remaining);
        let mut crossed = Vec::new();
        if progress <= self.settings.halfway_threshold && !session.halfway_fired {
            session.halfway_fired = true;
            crossed.push(MilestoneKind::Halfway);
        }
        if progress <= self.settings.almost_there_threshold && !session.almost_there_fired {
            session.almost_there_fired = true;
            crossed.push(MilestoneKind::AlmostThere);
        }

        let mut events: Vec<Event> = crossed
            .into_iter()
            .map(|kind| self.milestone(kind))
            .collect();
        events.push(self.tick_event(remaining, progress));
        events
    }

    pub fn pause(&mut self) -> Vec<Event> {
        if self.state != TimerState::Running {
            debug!(state = ?self.state, "pause ignored");
            return Vec::new();
        }
        let now = self.clock.now_ms();
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };
        session.remaining_ms = session.remaining_at(now);
        if session.remaining_ms == 0 {
            return self.finish();
        }

        self.state = TimerState::Paused;
        info!(remaining_ms = session.remaining_ms, "session paused");
        vec![self.state_changed()]
    }

    pub fn resume(&mut self) -> Vec<Event> {
        if self.state != TimerState::Paused {
            debug!(state = ?self.state, "resume ignored");
            return Vec::new();
        }
        let now = self.clock.now_ms();
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };
        if session.remaining_ms == 0 {
            return self.finish();
        }

        session.rearm(now);
        let remaining = session.remaining_ms;
        let progress = session.progress_of(remaining);
        self.state = TimerState::Running;
        info!(remaining_ms = remaining, "session resumed");
        vec![self.state_changed(), self.tick_event(remaining, progress)]
    }

    /// Drop any session, zero the total and remove it from the store.
    pub fn clear(&mut self) -> Vec<Event> {
        self.session = None;
        self.state = TimerState::Idle;
        self.total.reset();
        self.total_loaded = true;
        info!("session and total cleared");

        let mut events = vec![
            self.state_changed(),
            Event::TotalCleared {
                at: self.clock.now_utc(),
            },
        ];
        if let Err(e) = self.store.clear_total() {
            events.push(self.persistence_warning("clear", &e));
        }
        events
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn finish(&mut self) -> Vec<Event> {
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };
        session.remaining_ms = 0;
        let minutes = session.duration_min;
        self.state = TimerState::Completed;
        self.total.add(minutes);
        let saved = self.persist_total();
        info!(minutes, total = self.total.minutes, "session completed");

        let mut events = vec![
            self.tick_event(0, 0.0),
            self.state_changed(),
            Event::Completed {
                session_minutes: minutes,
                total_minutes: self.total.minutes,
                at: self.clock.now_utc(),
            },
        ];
        if let Err(e) = saved {
            events.push(self.persistence_warning("save", &e));
        }
        events
    }

    /// Write the total, first folding in the stored value if it was never read.
    fn persist_total(&mut self) -> std::result::Result<(), StorageError> {
        if !self.total_loaded {
            let stored = match self.store.load_total() {
                Ok(stored) => stored.unwrap_or(0),
                Err(StorageError::Corrupt { .. }) => 0,
                Err(e) => return Err(e),
            };
            self.total.minutes = self.total.minutes.saturating_add(stored);
            self.total_loaded = true;
        }
        self.store.save_total(self.total.minutes)
    }

    fn milestone(&mut self, kind: MilestoneKind) -> Event {
        let text = select_message(&self.settings.catalog, kind, &mut self.rng).to_string();
        debug!(kind = kind.as_str(), %text, "milestone reached");
        Event::Milestone {
            kind,
            text,
            at: self.clock.now_utc(),
        }
    }

    fn tick_event(&self, remaining_ms: u64, progress: f64) -> Event {
        Event::Tick {
            remaining_ms,
            progress,
            display: format_remaining(remaining_ms),
            at: self.clock.now_utc(),
        }
    }

    fn state_changed(&self) -> Event {
        Event::StateChanged {
            state: self.state,
            at: self.clock.now_utc(),
        }
    }

    fn persistence_warning(&self, op: &str, err: &StorageError) -> Event {
        warn!(op, error = %err, "cumulative total not persisted; keeping in-memory value");
        Event::PersistenceWarning {
            message: format!("could not {op} cumulative total: {err}"),
            at: self.clock.now_utc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::{KvStore, MemoryStore};
    use crate::total::{KvTotalStore, TOTAL_KEY};

    fn engine_at(clock: &ManualClock, mem: &MemoryStore) -> TimerEngine<ManualClock> {
        let settings = EngineSettings {
            seed: Some(1),
            ..EngineSettings::default()
        };
        TimerEngine::new(
            clock.clone(),
            Box::new(KvTotalStore::new(mem.clone())),
            settings,
        )
    }

    fn milestones(events: &[Event]) -> Vec<MilestoneKind> {
        events
            .iter()
            .filter_map(|e| match e {
                Event::Milestone { kind, .. } => Some(*kind),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn start_pause_resume() {
        let clock = ManualClock::new(0);
        let mut engine = engine_at(&clock, &MemoryStore::new());
        assert_eq!(engine.state(), TimerState::Idle);

        assert!(!engine.start(5).unwrap().is_empty());
        assert_eq!(engine.state(), TimerState::Running);

        assert!(!engine.pause().is_empty());
        assert_eq!(engine.state(), TimerState::Paused);

        assert!(!engine.resume().is_empty());
        assert_eq!(engine.state(), TimerState::Running);
    }

    #[test]
    fn start_emits_full_duration_tick() {
        let clock = ManualClock::new(0);
        let mut engine = engine_at(&clock, &MemoryStore::new());
        let events = engine.start(5).unwrap();
        match &events[1] {
            Event::Tick {
                remaining_ms,
                progress,
                display,
                ..
            } => {
                assert_eq!(*remaining_ms, 300_000);
                assert_eq!(*progress, 1.0);
                assert_eq!(display, "5:00");
            }
            other => panic!("Expected Tick, got {other:?}"),
        }
    }

    #[test]
    fn zero_duration_is_rejected_without_state_change() {
        let clock = ManualClock::new(0);
        let mut engine = engine_at(&clock, &MemoryStore::new());
        engine.start(15).unwrap();
        clock.advance_secs(10);
        assert!(matches!(engine.start(0), Err(CoreError::InvalidDuration(0))));
        assert!(matches!(engine.start_ms(0), Err(CoreError::InvalidDuration(0))));
        assert_eq!(engine.state(), TimerState::Running);
        assert_eq!(engine.remaining_ms(), 890_000);
    }

    #[test]
    fn tick_derives_from_end_instant() {
        let clock = ManualClock::new(5_000);
        let mut engine = engine_at(&clock, &MemoryStore::new());
        engine.start(1).unwrap();
        // One late tick covers any amount of elapsed time.
        clock.advance(45_500);
        engine.tick();
        assert_eq!(engine.remaining_ms(), 14_500);
        assert_eq!(engine.display_time(), "0:15");
    }

    #[test]
    fn both_milestones_fire_in_order_on_a_single_late_tick() {
        let clock = ManualClock::new(0);
        let mut engine = engine_at(&clock, &MemoryStore::new());
        engine.start(3).unwrap();
        clock.advance_secs(150);
        let events = engine.tick();
        assert_eq!(
            milestones(&events),
            vec![MilestoneKind::Halfway, MilestoneKind::AlmostThere]
        );
        assert!(matches!(events.last(), Some(Event::Tick { .. })));
    }

    #[test]
    fn invalid_transitions_are_noops() {
        let clock = ManualClock::new(0);
        let mut engine = engine_at(&clock, &MemoryStore::new());
        assert!(engine.pause().is_empty());
        assert!(engine.resume().is_empty());
        assert!(engine.tick().is_empty());

        engine.start(1).unwrap();
        assert!(engine.resume().is_empty());
        engine.pause();
        assert!(engine.pause().is_empty());
        assert!(engine.tick().is_empty());
        assert_eq!(engine.state(), TimerState::Paused);
    }

    #[test]
    fn pause_after_deadline_completes() {
        let clock = ManualClock::new(0);
        let mem = MemoryStore::new();
        let mut engine = engine_at(&clock, &mem);
        engine.start(1).unwrap();
        clock.advance_secs(61);
        let events = engine.pause();
        assert!(events.iter().any(Event::is_completed));
        assert_eq!(engine.state(), TimerState::Completed);
        assert_eq!(engine.total_minutes(), 1);
    }

    #[test]
    fn completion_order_and_persistence() {
        let clock = ManualClock::new(0);
        let mem = MemoryStore::new();
        let mut engine = engine_at(&clock, &mem);
        engine.start(5).unwrap();
        clock.advance_secs(300);
        let events = engine.tick();
        assert!(matches!(
            events[0],
            Event::Tick {
                remaining_ms: 0,
                progress,
                ..
            } if progress == 0.0
        ));
        assert!(matches!(
            events[1],
            Event::StateChanged {
                state: TimerState::Completed,
                ..
            }
        ));
        assert!(matches!(
            events[2],
            Event::Completed {
                session_minutes: 5,
                total_minutes: 5,
                ..
            }
        ));
        assert_eq!(mem.get(TOTAL_KEY).unwrap().as_deref(), Some("5"));

        // Further ticks do nothing and never credit twice.
        clock.advance_secs(60);
        assert!(engine.tick().is_empty());
        assert_eq!(engine.total_minutes(), 5);
    }

    #[test]
    fn start_ms_credits_whole_minutes() {
        let clock = ManualClock::new(0);
        let mut engine = engine_at(&clock, &MemoryStore::new());
        engine.start_ms(90_000).unwrap();
        clock.advance_secs(90);
        engine.tick();
        assert_eq!(engine.total_minutes(), 1);

        engine.start_ms(10_000).unwrap();
        clock.advance_secs(10);
        engine.tick();
        assert_eq!(engine.state(), TimerState::Completed);
        assert_eq!(engine.total_minutes(), 1);
    }

    #[test]
    fn loads_existing_total() {
        let mem = MemoryStore::new();
        mem.set(TOTAL_KEY, "40").unwrap();
        let engine = engine_at(&ManualClock::new(0), &mem);
        assert_eq!(engine.total_minutes(), 40);
    }

    #[test]
    fn failed_load_warns_and_starts_from_zero() {
        let mem = MemoryStore::new();
        mem.set(TOTAL_KEY, "40").unwrap();
        mem.set_failing(true);
        let mut engine = engine_at(&ManualClock::new(0), &mem);
        assert_eq!(engine.total_minutes(), 0);
        let warnings = engine.take_warnings();
        assert_eq!(warnings.len(), 1);
        assert!(matches!(warnings[0], Event::PersistenceWarning { .. }));
        assert!(engine.take_warnings().is_empty());
    }

    #[test]
    fn store_recovering_after_failed_load_keeps_stored_total() {
        let clock = ManualClock::new(0);
        let mem = MemoryStore::new();
        mem.set(TOTAL_KEY, "40").unwrap();
        mem.set_failing(true);
        let mut engine = engine_at(&clock, &mem);
        assert_eq!(engine.total_minutes(), 0);

        mem.set_failing(false);
        engine.start(5).unwrap();
        clock.advance_secs(300);
        let events = engine.tick();
        assert!(events.iter().any(|e| matches!(
            e,
            Event::Completed {
                session_minutes: 5,
                total_minutes: 45,
                ..
            }
        )));
        assert_eq!(engine.total_minutes(), 45);
        assert_eq!(mem.get(TOTAL_KEY).unwrap().as_deref(), Some("45"));
    }

    #[test]
    fn unreadable_store_is_never_overwritten() {
        let clock = ManualClock::new(0);
        let mem = MemoryStore::new();
        mem.set(TOTAL_KEY, "40").unwrap();
        mem.set_failing(true);
        let mut engine = engine_at(&clock, &mem);

        // Still down at completion: the credit stays in memory only.
        engine.start(5).unwrap();
        clock.advance_secs(300);
        let events = engine.tick();
        assert!(matches!(
            events.last(),
            Some(Event::PersistenceWarning { .. })
        ));
        assert_eq!(engine.total_minutes(), 5);

        // Back up for the next completion: both credits land on top of 40.
        mem.set_failing(false);
        engine.start(10).unwrap();
        clock.advance_secs(600);
        engine.tick();
        assert_eq!(engine.total_minutes(), 55);
        assert_eq!(mem.get(TOTAL_KEY).unwrap().as_deref(), Some("55"));
    }

    #[test]
    fn failed_save_keeps_timing_and_in_memory_total() {
        let clock = ManualClock::new(0);
        let mem = MemoryStore::new();
        let mut engine = engine_at(&clock, &mem);
        engine.start(5).unwrap();
        mem.set_failing(true);
        clock.advance_secs(300);
        let events = engine.tick();
        assert!(events.iter().any(Event::is_completed));
        assert!(matches!(
            events.last(),
            Some(Event::PersistenceWarning { .. })
        ));
        assert_eq!(engine.total_minutes(), 5);
    }

    #[test]
    fn snapshot_reports_paused_session() {
        let clock = ManualClock::new(0);
        let mut engine = engine_at(&clock, &MemoryStore::new());
        engine.start(15).unwrap();
        clock.advance_secs(100);
        engine.pause();
        match engine.snapshot() {
            Event::StateSnapshot {
                state,
                remaining_ms,
                duration_ms,
                display,
                ..
            } => {
                assert_eq!(state, TimerState::Paused);
                assert_eq!(remaining_ms, 800_000);
                assert_eq!(duration_ms, 900_000);
                assert_eq!(display, "13:20");
            }
            _ => panic!("Expected StateSnapshot"),
        }
    }

    #[test]
    fn clock_regression_never_raises_remaining() {
        let clock = ManualClock::new(100_000);
        let mut engine = engine_at(&clock, &MemoryStore::new());
        engine.start(1).unwrap();
        clock.advance_secs(20);
        engine.tick();
        clock.set(90_000);
        engine.tick();
        assert_eq!(engine.remaining_ms(), 40_000);
    }
}
