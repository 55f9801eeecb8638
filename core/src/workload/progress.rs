use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Visual progress for a timed run.
///
/// The bar tracks elapsed seconds against the configured duration; the
/// message carries the dispatched task count. Cloning shares the same bar.
#[derive(Clone)]
pub struct ProgressMonitor {
    bar: ProgressBar,
    enabled: bool,
}

impl ProgressMonitor {
    /// Create a new progress monitor
    ///
    /// # Arguments
    ///
    /// * `duration` - Configured run duration (bar length)
    /// * `enabled` - Whether to draw anything (disabled for quiet and json output)
    pub fn new(duration: Duration, enabled: bool) -> Self {
        if !enabled {
            return Self::hidden();
        }

        let bar = ProgressBar::with_draw_target(
            Some(duration.as_secs().max(1)),
            ProgressDrawTarget::stderr(),
        );
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len}s {msg}")
        {
            bar.set_style(style.progress_chars("█▓▒░  "));
        }
        bar.set_message("starting...");

        Self { bar, enabled: true }
    }

    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Update position and dispatched count after a batch.
    pub fn record_batch(&self, elapsed: Duration, dispatched: u64) {
        if !self.enabled {
            return;
        }
        self.bar.set_position(elapsed.as_secs());
        self.bar.set_message(format!("{} dispatched", dispatched));
    }

    pub fn set_message(&self, msg: &str) {
        if self.enabled {
            self.bar.set_message(msg.to_string());
        }
    }

    pub fn clear(&self) {
        if self.enabled {
            self.bar.finish_and_clear();
        }
    }
}
