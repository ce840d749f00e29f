/*!
 * Progress notifications.
 *
 * The translation pipeline reports what it does through a `TranslationObserver`.
 * Observers never influence control flow; every method has a no-op default so
 * implementations only override what they care about.
 */

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use log::{error, info, warn};
use parking_lot::Mutex;

use crate::errors::{ProviderError, TranslationError};

/// Sink for per-chunk progress events
pub trait TranslationObserver: Send + Sync {
    /// A job starts with `total` chunks of which `restored` came from a snapshot
    fn on_job_started(&self, _total: usize, _restored: usize) {}

    /// A backend call for chunk `index` is about to be made
    fn on_attempt(&self, _index: usize, _total: usize, _attempt: u32, _at: DateTime<Local>) {}

    /// A backend call failed and may be retried
    fn on_attempt_failed(&self, _index: usize, _attempt: u32, _max_attempts: u32, _error: &ProviderError) {}

    /// A response arrived too late and was discarded
    fn on_soft_timeout(&self, _index: usize, _elapsed: Duration, _count: u32) {}

    /// Chunk `index` was translated
    fn on_chunk_done(&self, _index: usize, _total: usize) {}

    /// Chunk `index` gave up and holds the sentinel
    fn on_chunk_failed(&self, _index: usize, _error: &TranslationError) {}

    /// Every chunk reached a terminal state
    fn on_job_finished(&self, _total: usize, _failed: usize) {}
}

/// Observer that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl TranslationObserver for NoopObserver {}

/// Observer that writes events through the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl TranslationObserver for LogObserver {
    fn on_job_started(&self, total: usize, restored: usize) {
        if restored > 0 {
            info!("Resuming translation: {} of {} chunks already done", restored, total);
        } else {
            info!("Translating {} chunks", total);
        }
    }

    fn on_attempt(&self, index: usize, total: usize, attempt: u32, at: DateTime<Local>) {
        if attempt == 1 {
            info!("[{}] Translating {}/{}...", at.format("%Y-%m-%d %H:%M:%S"), index + 1, total);
        } else {
            info!(
                "[{}] Translating {}/{} (attempt {})...",
                at.format("%Y-%m-%d %H:%M:%S"),
                index + 1,
                total,
                attempt
            );
        }
    }

    fn on_attempt_failed(&self, index: usize, attempt: u32, max_attempts: u32, error: &ProviderError) {
        warn!(
            "Chunk {}: attempt {}/{} failed: {}",
            index + 1,
            attempt,
            max_attempts,
            error
        );
    }

    fn on_soft_timeout(&self, index: usize, elapsed: Duration, count: u32) {
        warn!(
            "Chunk {} took {:.2}s, discarding the response and retrying (slow attempt #{})",
            index + 1,
            elapsed.as_secs_f64(),
            count
        );
    }

    fn on_chunk_failed(&self, index: usize, error: &TranslationError) {
        error!("Chunk {} could not be translated: {}", index + 1, error);
    }

    fn on_job_finished(&self, total: usize, failed: usize) {
        if failed > 0 {
            warn!("Translation finished with {} of {} chunks failed", failed, total);
        } else {
            info!("Translation finished: {} chunks", total);
        }
    }
}

/// Recorded notification
#[derive(Debug, Clone, PartialEq)]
pub enum ObserverEvent {
    JobStarted { total: usize, restored: usize },
    Attempt { index: usize, attempt: u32 },
    AttemptFailed { index: usize, attempt: u32, message: String },
    SoftTimeout { index: usize, elapsed: Duration },
    ChunkDone { index: usize },
    ChunkFailed { index: usize, message: String },
    JobFinished { total: usize, failed: usize },
}

/// Log entry for the issues log
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub level: String,
    pub message: String,
}

/// Observer that keeps every event in memory
#[derive(Debug, Default)]
pub struct EventRecorder {
    events: Mutex<Vec<ObserverEvent>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ObserverEvent> {
        self.events.lock().clone()
    }

    /// Chunk indices in the order their backend calls were made
    pub fn attempted_indices(&self) -> Vec<usize> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                ObserverEvent::Attempt { index, .. } => Some(*index),
                _ => None,
            })
            .collect()
    }

    /// Warnings and errors worth keeping after the run
    pub fn issues(&self) -> Vec<LogEntry> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                ObserverEvent::AttemptFailed { index, attempt, message } => Some(LogEntry {
                    level: "WARN".to_string(),
                    message: format!("Chunk {} attempt {} failed: {}", index + 1, attempt, message),
                }),
                ObserverEvent::SoftTimeout { index, elapsed } => Some(LogEntry {
                    level: "WARN".to_string(),
                    message: format!(
                        "Chunk {} response discarded after {:.2}s",
                        index + 1,
                        elapsed.as_secs_f64()
                    ),
                }),
                ObserverEvent::ChunkFailed { index, message } => Some(LogEntry {
                    level: "ERROR".to_string(),
                    message: format!("Chunk {} failed: {}", index + 1, message),
                }),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: ObserverEvent) {
        self.events.lock().push(event);
    }
}

impl TranslationObserver for EventRecorder {
    fn on_job_started(&self, total: usize, restored: usize) {
        self.push(ObserverEvent::JobStarted { total, restored });
    }

    fn on_attempt(&self, index: usize, _total: usize, attempt: u32, _at: DateTime<Local>) {
        self.push(ObserverEvent::Attempt { index, attempt });
    }

    fn on_attempt_failed(&self, index: usize, attempt: u32, _max_attempts: u32, error: &ProviderError) {
        self.push(ObserverEvent::AttemptFailed {
            index,
            attempt,
            message: error.to_string(),
        });
    }

    fn on_soft_timeout(&self, index: usize, elapsed: Duration, _count: u32) {
        self.push(ObserverEvent::SoftTimeout { index, elapsed });
    }

    fn on_chunk_done(&self, index: usize, _total: usize) {
        self.push(ObserverEvent::ChunkDone { index });
    }

    fn on_chunk_failed(&self, index: usize, error: &TranslationError) {
        self.push(ObserverEvent::ChunkFailed {
            index,
            message: error.to_string(),
        });
    }

    fn on_job_finished(&self, total: usize, failed: usize) {
        self.push(ObserverEvent::JobFinished { total, failed });
    }
}

/// Forwards every event to each inner observer in order
#[derive(Default, Clone)]
pub struct ObserverSet {
    observers: Vec<Arc<dyn TranslationObserver>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn TranslationObserver>) -> Self {
        self.observers.push(observer);
        self
    }
}

impl TranslationObserver for ObserverSet {
    fn on_job_started(&self, total: usize, restored: usize) {
        self.observers.iter().for_each(|o| o.on_job_started(total, restored));
    }

    fn on_attempt(&self, index: usize, total: usize, attempt: u32, at: DateTime<Local>) {
        self.observers.iter().for_each(|o| o.on_attempt(index, total, attempt, at));
    }

    fn on_attempt_failed(&self, index: usize, attempt: u32, max_attempts: u32, error: &ProviderError) {
        self.observers
            .iter()
            .for_each(|o| o.on_attempt_failed(index, attempt, max_attempts, error));
    }

    fn on_soft_timeout(&self, index: usize, elapsed: Duration, count: u32) {
        self.observers.iter().for_each(|o| o.on_soft_timeout(index, elapsed, count));
    }

    fn on_chunk_done(&self, index: usize, total: usize) {
        self.observers.iter().for_each(|o| o.on_chunk_done(index, total));
    }

    fn on_chunk_failed(&self, index: usize, error: &TranslationError) {
        self.observers.iter().for_each(|o| o.on_chunk_failed(index, error));
    }

    fn on_job_finished(&self, total: usize, failed: usize) {
        self.observers.iter().for_each(|o| o.on_job_finished(total, failed));
    }
}
