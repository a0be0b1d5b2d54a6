use clap::Subcommand;
use pomobar_core::{Config, MilestoneKind};

/// Settable keys with a short description, shown by `config keys`.
const KEYS: &[(&str, &str)] = &[
    ("timer.tick_interval_ms", "tick period in ms (1-1000)"),
    ("timer.message_window_ms", "how long a milestone message stays up, in ms"),
    ("timer.presets", "session lengths in minutes, e.g. '[5,15,30]'"),
    ("milestones.halfway_threshold", "remaining fraction for the halfway message"),
    ("milestones.almost_there_threshold", "remaining fraction for the almost-there message"),
    ("milestones.seed", "fixed seed for message selection"),
];

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one value
    Get {
        /// Dotted key, see `pomobar config keys`
        key: String,
    },
    /// Change one value and save
    Set {
        /// Dotted key, see `pomobar config keys`
        key: String,
        /// New value; lists are JSON, e.g. '["Halfway!", "Keep going"]'
        value: String,
    },
    /// Print the whole configuration as JSON
    List,
    /// List the settable keys
    Keys,
    /// Restore the defaults
    Reset,
}

/// Message list keys depend on the milestone kinds.
fn message_key(kind: MilestoneKind) -> String {
    format!("milestones.{}", kind.as_str())
}

fn unknown_key(key: &str) -> Box<dyn std::error::Error> {
    format!("unknown key: {key} (run `pomobar config keys`)").into()
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            match config.get(&key) {
                Some(value) => println!("{value}"),
                // Message lists are absent from the file until overridden.
                None if [MilestoneKind::Halfway, MilestoneKind::AlmostThere]
                    .into_iter()
                    .any(|kind| message_key(kind) == key) =>
                {
                    println!("(built-in messages)")
                }
                None => return Err(unknown_key(&key)),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            let stored = config.get(&key).unwrap_or(value);
            println!("{key} = {stored}");
        }
        ConfigAction::List => {
            let config = Config::load()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Keys => {
            for (key, help) in KEYS {
                println!("{key:<36} {help}");
            }
            for kind in [MilestoneKind::Halfway, MilestoneKind::AlmostThere] {
                println!("{:<36} JSON list of {} messages", message_key(kind), kind.as_str());
            }
        }
        ConfigAction::Reset => {
            Config::default().save()?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}
