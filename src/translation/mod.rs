/*!
 * Chunked document translation.
 *
 * This module contains the translation pipeline. It is split into several
 * submodules:
 *
 * - `chunker`: Splitting text into overlapping, size-bounded chunks
 * - `core`: Translating one chunk with soft timeout and retries
 * - `batch`: Driving every chunk to completion and assembling the output
 * - `progress`: Durable progress snapshot for resuming interrupted runs
 * - `job`: Chunk, result slot and per-chunk state types
 * - `prompts`: Prompt templates
 * - `observer`: Progress notifications
 */

// Re-export main types for easier usage
pub use self::batch::{BatchOptions, BatchOutcome, BatchTranslator};
pub use self::chunker::{split_text, TextSplitter};
pub use self::core::{TokenUsageStats, TranslationService};
pub use self::job::{AttemptOutcome, Chunk, ChunkResult, ChunkState, TranslationJob};
pub use self::observer::{EventRecorder, LogObserver, ObserverEvent, ObserverSet, TranslationObserver};
pub use self::progress::{ProgressSnapshot, ProgressStore};
pub use self::prompts::PromptTemplate;

// Submodules
pub mod batch;
pub mod chunker;
pub mod core;
pub mod job;
pub mod observer;
pub mod progress;
pub mod prompts;
