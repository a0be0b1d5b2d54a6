mod display;
mod engine;
pub mod milestone;
mod session;

pub use display::{format_remaining, COMPLETED_TEXT};
pub use engine::{EngineSettings, TimerEngine};
pub use milestone::{select_message, MessageCatalog, MilestoneKind};
pub use session::{Session, TimerState, MS_PER_MINUTE};
