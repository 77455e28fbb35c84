//! Progress indicators shown while a benchmark blocks the terminal.
//!
//! Indicators are drawn only when stderr is an interactive terminal, so piped
//! output and CI logs stay clean.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{IsTerminal, stderr};
use std::time::Duration;

/// Check if we should show progress indicators.
#[must_use]
pub fn should_show_progress() -> bool {
    stderr().is_terminal()
}

/// Create a spinner for an operation of unknown length.
///
/// # Panics
/// Panics if the spinner template string is invalid.
#[must_use]
pub fn create_spinner(message: &str, show: bool) -> ProgressBar {
    let pb = ProgressBar::new_spinner();

    if show {
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .expect("valid template"),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
    } else {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }

    pb
}

/// Spinner cleared from the terminal once the benchmark returns.
#[derive(Debug)]
pub struct ProgressTracker {
    bar: ProgressBar,
}

impl ProgressTracker {
    /// Start a spinner with explicit visibility.
    #[must_use]
    pub fn with_visibility(message: &str, show: bool) -> Self {
        Self {
            bar: create_spinner(message, show),
        }
    }

    /// Finish and clear the spinner.
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_spinner_is_silent() {
        let tracker = ProgressTracker::with_visibility("configuring", false);
        assert!(tracker.bar.is_hidden());
        tracker.finish_and_clear();
        assert!(tracker.bar.is_finished());
    }
}
