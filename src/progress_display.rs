use chrono::{DateTime, Local};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::errors::{ProviderError, TranslationError};
use crate::translation::observer::TranslationObserver;

// @module: Terminal progress bar for translation runs

/// Observer that drives an indicatif progress bar
///
/// Warnings go through `ProgressBar::println` so they are printed above the bar
/// instead of tearing it.
#[derive(Clone)]
pub struct ProgressBarObserver {
    // @field: Bar shared with the controller
    bar: ProgressBar,
}

impl ProgressBarObserver {
    /// Create an observer with a visible bar on stderr
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style.progress_chars("█▓▒░"));
        bar.enable_steady_tick(Duration::from_millis(120));

        Self { bar }
    }

    /// Create an observer whose bar never draws
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }
}

impl Default for ProgressBarObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl TranslationObserver for ProgressBarObserver {
    fn on_job_started(&self, total: usize, restored: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(restored as u64);
        if restored > 0 {
            self.bar.println(format!("Resuming: {} of {} chunks restored from progress file", restored, total));
        }
    }

    fn on_attempt(&self, index: usize, total: usize, attempt: u32, at: DateTime<Local>) {
        let message = if attempt > 1 {
            format!("chunk {}/{} attempt {} ({})", index + 1, total, attempt, at.format("%H:%M:%S"))
        } else {
            format!("chunk {}/{} ({})", index + 1, total, at.format("%H:%M:%S"))
        };
        self.bar.set_message(message);
    }

    fn on_attempt_failed(&self, index: usize, attempt: u32, max_attempts: u32, error: &ProviderError) {
        self.bar.println(format!(
            "⚠️  Chunk {}: attempt {}/{} failed: {}",
            index + 1,
            attempt,
            max_attempts,
            error
        ));
    }

    fn on_soft_timeout(&self, index: usize, elapsed: Duration, _count: u32) {
        self.bar.println(format!(
            "⚠️  Chunk {} took {:.2}s, retrying",
            index + 1,
            elapsed.as_secs_f64()
        ));
    }

    fn on_chunk_done(&self, _index: usize, _total: usize) {
        self.bar.inc(1);
    }

    fn on_chunk_failed(&self, index: usize, error: &TranslationError) {
        self.bar.println(format!("❌ Chunk {} failed: {}", index + 1, error));
        self.bar.inc(1);
    }

    fn on_job_finished(&self, _total: usize, _failed: usize) {
        self.bar.finish_and_clear();
    }
}
