//! Step reporting and elapsed-time formatting.
//!
//! Every major workflow step prints one timestamped line so an operator can
//! reconstruct what happened and when from plain terminal output. The final
//! line reports total wall-clock duration in human-readable units.
//! Diagnostics beyond this narration go through `tracing`.

use colored::Colorize;
use std::time::Instant;

/// Prints timestamped step lines and the final elapsed-time summary.
pub struct Reporter {
    start: Instant,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter {
    /// Start the clock.
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }

    /// Announce a major step.
    pub fn step(&self, name: &str) {
        println!("{}", format_step_line(&timestamp(), name));
    }

    /// Print an informational detail under the current step.
    pub fn info(&self, message: &str) {
        println!("[{}]     {message}", timestamp());
    }

    /// Print a warning; the run continues.
    pub fn warn(&self, message: &str) {
        eprintln!("[{}] {} {message}", timestamp(), "warning:".yellow().bold());
    }

    /// Print the closing line with the total elapsed time.
    pub fn finish(&self) {
        let elapsed = self.start.elapsed().as_secs();
        println!("[{}] ==> finished in {}", timestamp(), format_elapsed(elapsed));
    }
}

fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Render one step line: `[timestamp] ==> name`.
pub fn format_step_line(timestamp: &str, name: &str) -> String {
    format!("[{timestamp}] ==> {name}")
}

/// Format a duration in seconds as days/hours/minutes/seconds.
///
/// Zero-valued units are omitted and each unit pluralizes independently;
/// zero total elapsed time renders distinctly as `0 seconds`.
pub fn format_elapsed(total_secs: u64) -> String {
    if total_secs == 0 {
        return "0 seconds".to_string();
    }

    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let seconds = total_secs % 60;

    let mut parts = Vec::new();
    for (value, unit) in
        [(days, "day"), (hours, "hour"), (minutes, "minute"), (seconds, "second")]
    {
        if value > 0 {
            let plural = if value == 1 { "" } else { "s" };
            parts.push(format!("{value} {unit}{plural}"));
        }
    }
    parts.join(" ")
}
