//! # Pomobar Core Library
//!
//! This library provides the core logic for Pomobar, a single-session
//! countdown timer. Front-ends (the `pomobar` terminal binary, or any other
//! presentation layer) only render the events it produces.
//!
//! ## Architecture
//!
//! - **Clock**: wall-clock source; a manual clock makes every timing path testable
//! - **Timer Engine**: a wall-clock-based state machine that requires the caller
//!   to periodically invoke `tick()` for progress updates
//! - **Driver**: a tokio task that calls `tick()` on a fixed period
//! - **Storage**: SQLite key-value store for the cumulative total and
//!   TOML-based configuration
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`TimerDriver`]: Periodic tick source
//! - [`TotalStore`]: Persistence seam for the cumulative total
//! - [`Config`]: Application configuration management

pub mod clock;
pub mod driver;
pub mod error;
pub mod events;
pub mod storage;
pub mod timer;
pub mod total;

pub use clock::{Clock, ManualClock, SystemClock};
pub use driver::{DriverSettings, TimerDriver};
pub use error::{ConfigError, CoreError, StorageError};
pub use events::Event;
pub use storage::{Config, Database, KvStore, MemoryStore};
pub use timer::{EngineSettings, MessageCatalog, MilestoneKind, Session, TimerEngine, TimerState};
pub use total::{CumulativeTotal, KvTotalStore, TotalStore};
