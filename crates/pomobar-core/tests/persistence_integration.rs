//! Integration tests for the persisted cumulative total.

use pomobar_core::total::TOTAL_KEY;
use pomobar_core::{
    Database, EngineSettings, Event, KvStore, KvTotalStore, ManualClock, TimerEngine, TimerState,
};

fn open_engine(path: &std::path::Path, clock: &ManualClock) -> TimerEngine<ManualClock> {
    let db = Database::open_at(path).unwrap();
    TimerEngine::new(
        clock.clone(),
        Box::new(KvTotalStore::new(db)),
        EngineSettings::default(),
    )
}

#[test]
fn total_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pomobar.db");
    let clock = ManualClock::new(0);

    {
        let mut engine = open_engine(&path, &clock);
        assert_eq!(engine.total_minutes(), 0);
        engine.start(15).unwrap();
        clock.advance_secs(15 * 60);
        engine.tick();
        assert_eq!(engine.state(), TimerState::Completed);
    }

    let mut engine = open_engine(&path, &clock);
    assert_eq!(engine.total_minutes(), 15);

    engine.start(5).unwrap();
    clock.advance_secs(5 * 60);
    let events = engine.tick();
    assert!(events.iter().any(|e| matches!(
        e,
        Event::Completed {
            session_minutes: 5,
            total_minutes: 20,
            ..
        }
    )));
    drop(engine);

    let db = Database::open_at(&path).unwrap();
    assert_eq!(db.get(TOTAL_KEY).unwrap().as_deref(), Some("20"));
}

#[test]
fn abandoned_session_is_not_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pomobar.db");
    let clock = ManualClock::new(0);

    {
        let mut engine = open_engine(&path, &clock);
        engine.start(30).unwrap();
        clock.advance_secs(29 * 60);
        engine.tick();
        engine.pause();
    }

    assert_eq!(open_engine(&path, &clock).total_minutes(), 0);
}

#[test]
fn clear_removes_row() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pomobar.db");
    let clock = ManualClock::new(0);

    {
        let mut engine = open_engine(&path, &clock);
        engine.start(5).unwrap();
        clock.advance_secs(300);
        engine.tick();
        engine.clear();
    }

    let db = Database::open_at(&path).unwrap();
    assert!(db.kv_get(TOTAL_KEY).unwrap().is_none());
    assert_eq!(open_engine(&path, &clock).total_minutes(), 0);
}

#[test]
fn corrupt_row_degrades_to_zero_with_warning() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pomobar.db");
    Database::open_at(&path)
        .unwrap()
        .kv_set(TOTAL_KEY, "not a number")
        .unwrap();

    let clock = ManualClock::new(0);
    let mut engine = open_engine(&path, &clock);
    assert_eq!(engine.total_minutes(), 0);
    assert!(matches!(
        engine.take_warnings().as_slice(),
        [Event::PersistenceWarning { .. }]
    ));

    // Completing a session overwrites the bad value.
    engine.start(5).unwrap();
    clock.advance_secs(300);
    engine.tick();
    drop(engine);
    assert_eq!(open_engine(&path, &clock).total_minutes(), 5);
}
