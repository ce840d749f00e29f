/*!
 * Batch translation of a whole document.
 *
 * `BatchTranslator` chunks the text, walks the chunks strictly in order and
 * drives each one to a terminal state:
 *
 * - a translation arrives within the soft timeout: the chunk is done
 * - the answer was too slow: the chunk stays pending, waits and is requested
 *   again (indefinitely unless `max_soft_timeouts` is set)
 * - every retry failed: the chunk holds the error sentinel and the run moves on
 *
 * The progress snapshot is rewritten after each terminal chunk, so a crashed
 * run can resume without requesting finished chunks again. `run_job` removes
 * the snapshot once the document is assembled; `translate_document` leaves it
 * for the caller to clear after the output has been written.
 */

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use log::debug;

use crate::app_config::Config;
use crate::errors::{AppError, TranslationError};
use crate::language_utils;
use crate::translation::chunker::TextSplitter;
use crate::translation::core::TranslationService;
use crate::translation::job::{AttemptOutcome, Chunk, ChunkState, TranslationJob};
use crate::translation::observer::TranslationObserver;
use crate::translation::progress::ProgressStore;

/// Ideographic (full-width) space
const FULLWIDTH_SPACE: char = '\u{3000}';

/// Orchestration settings
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Wait before re-requesting a chunk whose answer was too slow
    pub soft_timeout_backoff: Duration,

    /// Give up on a chunk after this many slow answers; unlimited when `None`
    pub max_soft_timeouts: Option<u32>,

    /// Text stored for chunks that could not be translated
    pub error_sentinel: String,

    /// Separator placed between translated chunks
    pub join_separator: String,

    /// Rewrite U+3000 to an ASCII space in the assembled text
    pub normalize_fullwidth_spaces: bool,
}

impl BatchOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            soft_timeout_backoff: config.translation.soft_timeout_backoff(),
            max_soft_timeouts: config.translation.max_soft_timeouts,
            error_sentinel: config.translation.error_sentinel.clone(),
            join_separator: config.output.join_separator.clone(),
            normalize_fullwidth_spaces: config.output.normalize_fullwidth_spaces,
        }
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Result of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    /// Assembled, post-processed translation
    pub text: String,
    /// Number of chunks in the document
    pub total_chunks: usize,
    /// Chunks taken from the progress snapshot
    pub restored: usize,
    /// Chunks translated during this run
    pub translated: usize,
    /// Chunks holding the error sentinel after this run
    pub failed: usize,
    /// Responses discarded for being too slow
    pub soft_timeouts: u32,
}

#[derive(Debug, Default)]
struct RunCounters {
    translated: usize,
    soft_timeouts: u32,
}

/// Sequential, resumable document translator
#[derive(Debug)]
pub struct BatchTranslator {
    /// The translation service to use
    service: TranslationService,

    /// Durable per-chunk progress
    store: ProgressStore,

    /// Chunker
    splitter: TextSplitter,

    /// Orchestration settings
    options: BatchOptions,
}

impl BatchTranslator {
    /// Create a new batch translator
    pub fn new(
        service: TranslationService,
        store: ProgressStore,
        splitter: TextSplitter,
        options: BatchOptions,
    ) -> Self {
        Self {
            service,
            store,
            splitter,
            options,
        }
    }

    /// Build a translator with the backend and settings from `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let target_language = language_utils::get_language_name(&config.target_language)?;
        let service = TranslationService::new(&config.translation, target_language)?;
        Self::with_service(config, service)
    }

    /// Build a translator from `config` around an existing service
    pub fn with_service(config: &Config, service: TranslationService) -> Result<Self> {
        let splitter = TextSplitter::new(config.chunking.chunk_size, config.chunking.overlap)?;

        Ok(Self::new(
            service,
            ProgressStore::new(&config.progress.path),
            splitter,
            BatchOptions::from_config(config),
        ))
    }

    /// Replace the notification sink
    pub fn with_observer(mut self, observer: Arc<dyn TranslationObserver>) -> Self {
        self.service = self.service.with_observer(observer);
        self
    }

    pub fn service(&self) -> &TranslationService {
        &self.service
    }

    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    pub fn splitter(&self) -> &TextSplitter {
        &self.splitter
    }

    /// Translate `text` and return the assembled document
    pub async fn run(&self, text: &str, context: &str, resume: bool) -> Result<String, AppError> {
        Ok(self.run_job(text, context, resume).await?.text)
    }

    /// Translate `text`, clear the progress snapshot and return the document
    /// with run counters
    pub async fn run_job(&self, text: &str, context: &str, resume: bool) -> Result<BatchOutcome, AppError> {
        let outcome = self.translate_document(text, context, resume).await?;
        self.clear_progress(&outcome)?;
        Ok(outcome)
    }

    /// Remove the snapshot of a finished document
    ///
    /// A run over blank text never touched the store, so it is left alone.
    pub fn clear_progress(&self, outcome: &BatchOutcome) -> Result<(), AppError> {
        if outcome.total_chunks > 0 {
            self.store.clear()?;
        }
        Ok(())
    }

    /// Translate `text` and return the document with run counters
    ///
    /// With `resume` set, chunks recorded in the progress snapshot are reused
    /// and never requested again. Without it, any snapshot on disk is ignored
    /// and overwritten. The snapshot is left complete on disk.
    pub async fn translate_document(
        &self,
        text: &str,
        context: &str,
        resume: bool,
    ) -> Result<BatchOutcome, AppError> {
        let mut job = TranslationJob::new(self.splitter.split(text), context);
        let total = job.len();

        if job.is_empty() {
            debug!("Nothing to translate");
            return Ok(BatchOutcome {
                text: String::new(),
                total_chunks: 0,
                restored: 0,
                translated: 0,
                failed: 0,
                soft_timeouts: 0,
            });
        }

        let restored = if resume {
            let snapshot = self.store.load(total)?;
            job.restore(snapshot)?
        } else {
            0
        };

        let observer = self.service.observer();
        observer.on_job_started(total, restored);

        let mut counters = RunCounters::default();
        for index in 0..total {
            if job.is_done(index) {
                continue;
            }

            let chunk = job.chunks()[index].clone();
            let output = self.translate_chunk(&chunk, total, job.context(), &mut counters).await;
            job.record(index, output);
            self.store.save(&job.snapshot())?;
        }

        let assembled = job
            .assemble(&self.options.join_separator)
            .ok_or_else(|| AppError::Unknown(format!("{} chunk(s) left untranslated", job.pending_count())))?;
        let text = self.post_process(assembled);

        let failed = job
            .results()
            .iter()
            .filter(|r| r.translated_text.as_deref() == Some(self.options.error_sentinel.as_str()))
            .count();
        observer.on_job_finished(total, failed);

        Ok(BatchOutcome {
            text,
            total_chunks: total,
            restored,
            translated: counters.translated,
            failed,
            soft_timeouts: counters.soft_timeouts,
        })
    }

    /// Drive one chunk to a terminal state and return the text to store
    async fn translate_chunk(
        &self,
        chunk: &Chunk,
        total: usize,
        context: &str,
        counters: &mut RunCounters,
    ) -> String {
        let observer = self.service.observer();
        let mut state = ChunkState::pending();

        while !state.is_terminal() {
            state = match self.service.translate(chunk, total, context).await {
                Ok(AttemptOutcome::Translated(text)) => {
                    counters.translated += 1;
                    observer.on_chunk_done(chunk.index, total);
                    ChunkState::Done(text)
                }
                Ok(AttemptOutcome::SoftTimeout { elapsed }) => {
                    counters.soft_timeouts += 1;
                    let next = state.after_soft_timeout(self.options.max_soft_timeouts, &self.options.error_sentinel);

                    match &next {
                        ChunkState::Pending { soft_timeouts } => {
                            observer.on_soft_timeout(chunk.index, elapsed, *soft_timeouts);
                            tokio::time::sleep(self.options.soft_timeout_backoff).await;
                        }
                        _ => {
                            // Only reachable with a cap, which is the count just hit
                            let count = self.options.max_soft_timeouts.unwrap_or(1);
                            observer.on_soft_timeout(chunk.index, elapsed, count);
                            observer.on_chunk_failed(
                                chunk.index,
                                &TranslationError::SoftTimeoutLimit {
                                    count,
                                    last_elapsed: elapsed,
                                },
                            );
                        }
                    }
                    next
                }
                Err(e) => {
                    observer.on_chunk_failed(chunk.index, &e);
                    ChunkState::Failed {
                        sentinel: self.options.error_sentinel.clone(),
                    }
                }
            };
        }

        state.into_output().unwrap_or_else(|| self.options.error_sentinel.clone())
    }

    fn post_process(&self, text: String) -> String {
        if self.options.normalize_fullwidth_spaces && text.contains(FULLWIDTH_SPACE) {
            text.replace(FULLWIDTH_SPACE, " ")
        } else {
            text
        }
    }
}
