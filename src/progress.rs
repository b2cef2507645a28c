//! Terminal progress reporting
//!
//! Thin wrapper over indicatif so runs can draw bars when attached to a
//! terminal and stay silent under `--no-progress` or in tests.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

const BAR_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] {bar:30.cyan/blue} {pos}/{len} {msg}";
const SPINNER_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] {pos} {msg}";

/// Factory for progress bars
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    enabled: bool,
}

impl Default for Progress {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Progress {
    /// Create a factory; disabled factories hand out hidden bars
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// A factory that never draws
    pub fn hidden() -> Self {
        Self::new(false)
    }

    /// Check if bars are drawn
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Bar over a known number of steps
    pub fn bar(&self, len: u64, message: &str) -> ProgressBar {
        let bar = ProgressBar::with_draw_target(Some(len), self.target());
        bar.set_style(
            ProgressStyle::default_bar()
                .template(BAR_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.set_message(message.to_string());
        bar
    }

    /// Spinner for open-ended work
    pub fn spinner(&self, message: &str) -> ProgressBar {
        let spinner = ProgressBar::with_draw_target(None, self.target());
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template(SPINNER_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(message.to_string());
        if self.enabled {
            spinner.enable_steady_tick(Duration::from_millis(120));
        }
        spinner
    }

    fn target(&self) -> ProgressDrawTarget {
        if self.enabled {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        }
    }
}
