use std::env;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod view;

#[derive(Parser)]
#[command(name = "pomobar", version, about = "Pomobar countdown timer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a countdown in the foreground
    Start {
        /// Session length in minutes
        minutes: u64,
        /// Print every event as a JSON line instead of a progress bar
        #[arg(long)]
        json: bool,
    },
    /// Print the cumulative total of completed minutes
    Total,
    /// Reset the cumulative total to zero
    Clear,
    /// List the configured preset session lengths
    Presets,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_logging() {
    let debug_enabled = env::var("POMOBAR_DEBUG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    let filter = if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Start { minutes, json } => commands::timer::start(minutes, json),
        Commands::Total => commands::total::show(),
        Commands::Clear => commands::total::clear(),
        Commands::Presets => commands::timer::presets(),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
