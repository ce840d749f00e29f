/*!
 * Error types for the doctrans application.
 *
 * This module contains custom error types for the different layers of the
 * translation pipeline, using the thiserror crate for ergonomic error definitions.
 */

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when talking to a text-generation backend
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The backend answered but produced no text
    #[error("Backend returned an empty response")]
    EmptyResponse,
}

impl ProviderError {
    /// Map a transport-level reqwest failure onto a provider error
    pub fn from_transport(error: &reqwest::Error) -> Self {
        if error.is_connect() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }

    /// Map a non-success HTTP status onto a provider error
    pub fn from_status(status_code: u16, message: String) -> Self {
        match status_code {
            401 | 403 => Self::AuthenticationError(message),
            429 => Self::RateLimitExceeded(message),
            _ => Self::ApiError { status_code, message },
        }
    }
}

/// Errors that can occur while translating a single chunk
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Every attempt allowed for the chunk failed
    #[error("Translation failed after {attempts} attempt(s): {last_error}")]
    RetriesExhausted {
        /// Number of backend calls made
        attempts: u32,
        /// Error reported by the final attempt
        #[source]
        last_error: ProviderError,
    },

    /// The orchestrator gave up on a chunk whose attempts kept exceeding the latency ceiling
    #[error("Gave up after {count} slow attempt(s), last one took {last_elapsed:?}")]
    SoftTimeoutLimit {
        /// Number of soft timeouts observed for the chunk
        count: u32,
        /// Latency of the last attempt
        last_elapsed: Duration,
    },
}

/// Errors that can occur while reading or writing the progress snapshot
#[derive(Error, Debug)]
pub enum ProgressError {
    /// Filesystem failure on the snapshot file
    #[error("Progress file I/O error at {path:?}: {source}")]
    Io {
        /// Snapshot location
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The snapshot exists but is not valid JSON of the expected shape
    #[error("Progress file at {path:?} is corrupt: {source}")]
    Corrupt {
        /// Snapshot location
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The snapshot was written for a different chunk list
    #[error("Progress file holds {found} chunk(s) but the document splits into {expected}; run with --fresh to discard it")]
    SnapshotMismatch {
        /// Chunk count of the current document
        expected: usize,
        /// Entry count found in the snapshot
        found: usize,
    },
}

/// Errors raised for invalid chunking parameters
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ChunkingError {
    /// Chunk size must be positive
    #[error("Chunk size must be greater than zero")]
    ZeroChunkSize,

    /// Overlap must leave room for new text in every chunk
    #[error("Chunk overlap ({overlap}) must be smaller than chunk size ({chunk_size})")]
    OverlapTooLarge {
        /// Requested overlap
        overlap: usize,
        /// Requested chunk size
        chunk_size: usize,
    },
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Error from the progress store
    #[error("Progress error: {0}")]
    Progress(#[from] ProgressError),

    /// Error from the chunker
    #[error("Chunking error: {0}")]
    Chunking(#[from] ChunkingError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
