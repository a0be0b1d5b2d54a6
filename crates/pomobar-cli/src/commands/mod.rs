pub mod config;
pub mod timer;
pub mod total;

use pomobar_core::{Config, Database, KvTotalStore, SystemClock, TimerEngine};

/// Engine over the on-disk store with the user's configuration.
pub(crate) fn open_engine(config: &Config) -> Result<TimerEngine, Box<dyn std::error::Error>> {
    let store = KvTotalStore::new(Database::open()?);
    Ok(TimerEngine::new(
        SystemClock,
        Box::new(store),
        config.engine_settings()?,
    ))
}
