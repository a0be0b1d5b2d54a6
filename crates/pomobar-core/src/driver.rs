//! Tokio-based periodic caller for [`TimerEngine`].
//!
//! The engine is a plain state machine; this driver owns the single tick
//! task that calls it while a session runs and forwards every event to a
//! channel. All engine access goes through one async mutex, so commands and
//! ticks are strictly serialized even on a multi-threaded runtime.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

use crate::clock::Clock;
use crate::error::Result;
use crate::events::Event;
use crate::timer::{MilestoneKind, TimerEngine, TimerState};

/// Cadence settings for the driver.
#[derive(Debug, Clone, Copy)]
pub struct DriverSettings {
    pub tick_interval: Duration,
    /// How long after a milestone its `MessageExpired` event is sent.
    pub message_window: Duration,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(250),
            message_window: Duration::from_millis(3000),
        }
    }
}

type Slot = Arc<std::sync::Mutex<Option<JoinHandle<()>>>>;

fn abort_slot(slot: &Slot) {
    if let Ok(mut guard) = slot.lock() {
        if let Some(handle) = guard.take() {
            handle.abort();
        }
    }
}

fn fill_slot(slot: &Slot, handle: JoinHandle<()>) {
    match slot.lock() {
        Ok(mut guard) => {
            if let Some(previous) = guard.replace(handle) {
                previous.abort();
            }
        }
        Err(_) => handle.abort(),
    }
}

/// Forwards engine events and schedules milestone expiry.
struct Outbox<C: Clock + 'static> {
    engine: Arc<Mutex<TimerEngine<C>>>,
    tx: mpsc::UnboundedSender<Event>,
    message_window: Duration,
    expiry: Slot,
}

impl<C: Clock + 'static> Outbox<C> {
    fn publish(self: &Arc<Self>, events: Vec<Event>) {
        for event in events {
            if let Event::Milestone { kind, .. } = &event {
                self.schedule_expiry(*kind);
            }
            // A dropped receiver only means nobody is rendering.
            let _ = self.tx.send(event);
        }
    }

    fn schedule_expiry(self: &Arc<Self>, kind: MilestoneKind) {
        let outbox = Arc::clone(self);
        let handle = tokio::spawn(async move {
            time::sleep(outbox.message_window).await;
            let event = outbox.engine.lock().await.message_expired(kind);
            let _ = outbox.tx.send(event);
        });
        fill_slot(&self.expiry, handle);
    }
}

/// Drives a [`TimerEngine`] on a fixed tick interval.
pub struct TimerDriver<C: Clock + 'static> {
    outbox: Arc<Outbox<C>>,
    ticker: Slot,
    tick_interval: Duration,
}

impl<C: Clock + 'static> TimerDriver<C> {
    /// Wrap `engine`; events arrive on the returned receiver.
    ///
    /// Warnings the engine raised while loading are forwarded first.
    pub fn new(
        mut engine: TimerEngine<C>,
        settings: DriverSettings,
    ) -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        for warning in engine.take_warnings() {
            let _ = tx.send(warning);
        }
        let outbox = Arc::new(Outbox {
            engine: Arc::new(Mutex::new(engine)),
            tx,
            message_window: settings.message_window,
            expiry: Arc::new(std::sync::Mutex::new(None)),
        });
        let driver = Self {
            outbox,
            ticker: Arc::new(std::sync::Mutex::new(None)),
            tick_interval: settings
                .tick_interval
                .clamp(Duration::from_millis(1), Duration::from_millis(1000)),
        };
        (driver, rx)
    }

    /// Shared handle to the engine for queries.
    pub fn engine(&self) -> Arc<Mutex<TimerEngine<C>>> {
        Arc::clone(&self.outbox.engine)
    }

    pub async fn start(&self, duration_min: u64) -> Result<()> {
        let mut engine = self.outbox.engine.lock().await;
        // Validate before touching the running ticker.
        let events = engine.start(duration_min)?;
        self.cancel_ticker();
        abort_slot(&self.outbox.expiry);
        self.outbox.publish(events);
        self.spawn_ticker();
        Ok(())
    }

    pub async fn start_ms(&self, duration_ms: u64) -> Result<()> {
        let mut engine = self.outbox.engine.lock().await;
        let events = engine.start_ms(duration_ms)?;
        self.cancel_ticker();
        abort_slot(&self.outbox.expiry);
        self.outbox.publish(events);
        self.spawn_ticker();
        Ok(())
    }

    pub async fn pause(&self) {
        let mut engine = self.outbox.engine.lock().await;
        self.cancel_ticker();
        let events = engine.pause();
        self.outbox.publish(events);
    }

    pub async fn resume(&self) {
        let mut engine = self.outbox.engine.lock().await;
        let events = engine.resume();
        self.outbox.publish(events);
        if engine.state() == TimerState::Running {
            self.spawn_ticker();
        }
    }

    pub async fn clear(&self) {
        let mut engine = self.outbox.engine.lock().await;
        self.cancel_ticker();
        abort_slot(&self.outbox.expiry);
        let events = engine.clear();
        self.outbox.publish(events);
    }

    pub async fn snapshot(&self) -> Event {
        self.outbox.engine.lock().await.snapshot()
    }

    /// Whether a tick task is currently scheduled.
    pub fn is_ticking(&self) -> bool {
        self.ticker
            .lock()
            .map(|guard| guard.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Stop all background tasks without touching engine state.
    pub fn shutdown(&self) {
        self.cancel_ticker();
        abort_slot(&self.outbox.expiry);
    }

    /// Replace any existing tick task with a fresh one. Callers hold the
    /// engine lock, so the old task cannot be mid-tick.
    fn spawn_ticker(&self) {
        let outbox = Arc::clone(&self.outbox);
        let period = self.tick_interval;

        let handle = tokio::spawn(async move {
            // The first tick lands one period after start; the engine has
            // already emitted the initial full-duration tick.
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let (events, state) = {
                    let mut engine = outbox.engine.lock().await;
                    let events = engine.tick();
                    (events, engine.state())
                };
                outbox.publish(events);
                if state != TimerState::Running {
                    debug!(?state, "tick task finished");
                    break;
                }
            }
        });

        fill_slot(&self.ticker, handle);
    }

    fn cancel_ticker(&self) {
        abort_slot(&self.ticker);
    }
}

impl<C: Clock + 'static> Drop for TimerDriver<C> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
