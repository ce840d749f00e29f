/*!
 * # doctrans - chunked document translation with LLMs
 *
 * A Rust library for translating long plain-text documents through a local
 * or remote text-generation backend.
 *
 * ## Features
 *
 * - Separator-aware chunking with overlap between consecutive chunks
 * - Translation through:
 *   - OpenAI-compatible chat completion servers (Ollama /v1, LM Studio, vLLM)
 *   - The native Ollama chat API
 * - Soft timeout detection: answers slower than a latency ceiling are discarded and requested again
 * - Bounded retries with an error sentinel for chunks that keep failing
 * - Durable progress snapshot, so interrupted runs resume without repeating finished chunks
 * - ISO 639-1 and ISO 639-2 language code support
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `translation`: The translation pipeline:
 *   - `translation::chunker`: Text splitting
 *   - `translation::core`: Single-chunk translation with soft timeout and retries
 *   - `translation::batch`: Whole-document orchestration
 *   - `translation::progress`: Progress snapshot store
 * - `providers`: Client implementations for the supported backends:
 *   - `providers::openai`: OpenAI-compatible API client
 *   - `providers::ollama`: Ollama API client
 *   - `providers::mock`: Test double
 * - `app_controller`: Main application controller
 * - `progress_display`: Terminal progress bar
 * - `file_utils`: File system operations
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod progress_display;
pub mod providers;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use errors::{AppError, ChunkingError, ProgressError, ProviderError, TranslationError};
pub use language_utils::get_language_name;
pub use translation::{split_text, BatchTranslator, ProgressStore, TextSplitter, TranslationService};
