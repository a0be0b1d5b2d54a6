//! Terminal rendering of engine events.

use std::io::{self, Write};

use pomobar_core::timer::COMPLETED_TEXT;
use pomobar_core::{Event, MilestoneKind, TimerState};

const BAR_WIDTH: usize = 20;

/// A bar that shrinks as the session runs down.
pub fn progress_bar(progress: f64) -> String {
    let filled = (progress.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

pub fn status_line(display: &str, progress: f64, message: Option<&str>, paused: bool) -> String {
    let mut line = format!("⏱️  {display} [{}]", progress_bar(progress));
    if paused {
        line.push_str(" paused");
    }
    if let Some(message) = message {
        line.push_str("  ");
        line.push_str(message);
    }
    line
}

pub struct TerminalView {
    json: bool,
    message: Option<(MilestoneKind, String)>,
    display: String,
    progress: f64,
    paused: bool,
}

impl TerminalView {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            message: None,
            display: String::new(),
            progress: 1.0,
            paused: false,
        }
    }

    pub fn render(&mut self, event: &Event) -> io::Result<()> {
        let mut out = io::stdout().lock();
        if self.json {
            let line = serde_json::to_string(event).map_err(io::Error::other)?;
            writeln!(out, "{line}")?;
            return out.flush();
        }

        match event {
            Event::Tick {
                progress, display, ..
            } => {
                self.display.clone_from(display);
                self.progress = *progress;
            }
            Event::Milestone { kind, text, .. } => {
                self.message = Some((*kind, text.clone()));
            }
            Event::MessageExpired { kind, .. } => {
                if self.message.as_ref().is_some_and(|(shown, _)| shown == kind) {
                    self.message = None;
                }
            }
            Event::StateChanged { state, .. } => {
                self.paused = *state == TimerState::Paused;
            }
            Event::Completed {
                session_minutes,
                total_minutes,
                ..
            } => {
                writeln!(
                    out,
                    "\r\x1b[K{COMPLETED_TEXT} +{session_minutes} min (total {total_minutes} min)"
                )?;
                return out.flush();
            }
            Event::PersistenceWarning { message, .. } => {
                writeln!(out)?;
                eprintln!("warning: {message}");
            }
            Event::TotalCleared { .. } | Event::StateSnapshot { .. } => return Ok(()),
        }

        let message = self.message.as_ref().map(|(_, text)| text.as_str());
        write!(
            out,
            "\r\x1b[K{}",
            status_line(&self.display, self.progress, message, self.paused)
        )?;
        out.flush()
    }

    pub fn interrupted(&mut self) -> io::Result<()> {
        if self.json {
            return Ok(());
        }
        let mut out = io::stdout().lock();
        writeln!(out, "\n🛑 Interrupted! Session not counted.")?;
        out.flush()
    }
}
