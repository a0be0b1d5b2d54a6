use pomobar_core::{Config, Event};

use super::open_engine;

fn report_warnings(events: &[Event]) {
    for event in events {
        if let Event::PersistenceWarning { message, .. } = event {
            eprintln!("warning: {message}");
        }
    }
}

pub fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let mut engine = open_engine(&config)?;
    report_warnings(&engine.take_warnings());
    println!("{}", engine.total_minutes());
    Ok(())
}

pub fn clear() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let mut engine = open_engine(&config)?;
    let mut events = engine.take_warnings();
    events.extend(engine.clear());
    report_warnings(&events);
    println!("total cleared");
    Ok(())
}
