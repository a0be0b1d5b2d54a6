//! Human-readable remaining time.

/// Shown in place of the countdown once a session has finished.
pub const COMPLETED_TEXT: &str = "✅️ Completed!";

/// Format milliseconds as `m:ss`.
///
/// Partial seconds round up, so a fresh 5 minute session reads `5:00` and
/// `0:00` only appears once nothing is left.
pub fn format_remaining(remaining_ms: u64) -> String {
    let secs = remaining_ms.div_ceil(1000);
    format!("{}:{:02}", secs / 60, secs % 60)
}
