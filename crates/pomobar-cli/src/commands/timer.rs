use pomobar_core::{Config, SystemClock, TimerDriver, TimerState};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use super::open_engine;
use crate::view::TerminalView;

pub fn start(minutes: u64, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run_session(&config, minutes, json));
    // A pending stdin read would otherwise hold the runtime open.
    runtime.shutdown_background();
    result
}

pub fn presets() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    for minutes in &config.timer.presets {
        println!("{minutes} min");
    }
    Ok(())
}

async fn toggle(driver: &TimerDriver<SystemClock>) {
    let state = driver.engine().lock().await.state();
    match state {
        TimerState::Running => driver.pause().await,
        TimerState::Paused => driver.resume().await,
        _ => {}
    }
}

async fn run_session(
    config: &Config,
    minutes: u64,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_engine(config)?;
    let (driver, mut events) = TimerDriver::new(engine, config.driver_settings());
    driver.start(minutes).await?;
    info!(minutes, json, "foreground session started");

    let mut view = TerminalView::new(json);
    if !json {
        eprintln!("p + Enter: pause/resume, q + Enter: quit");
    }

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            Some(event) = events.recv() => {
                view.render(&event)?;
                if event.is_completed() {
                    break;
                }
            }
            line = stdin.next_line(), if stdin_open => {
                match line?.as_deref().map(str::trim) {
                    Some("p") => toggle(&driver).await,
                    Some("q") => {
                        driver.pause().await;
                        view.interrupted()?;
                        break;
                    }
                    Some(_) => {}
                    None => {
                        debug!("stdin closed, keyboard controls disabled");
                        stdin_open = false;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, session not credited");
                driver.pause().await;
                view.interrupted()?;
                break;
            }
        }
    }

    // Persistence warnings follow the completion event.
    driver.shutdown();
    while let Ok(event) = events.try_recv() {
        view.render(&event)?;
    }
    Ok(())
}
