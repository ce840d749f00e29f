use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Target language code (ISO)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Chunking config
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Progress snapshot config
    #[serde(default)]
    pub progress: ProgressConfig,

    /// Output post-processing config
    #[serde(default)]
    pub output: OutputConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Backend protocol used to reach the text-generation server
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    // @backend: OpenAI-compatible chat completions (Ollama /v1, LM Studio, vLLM)
    #[default]
    OpenAI,
    // @backend: Native Ollama chat API
    Ollama,
}

impl BackendKind {
    // @returns: Capitalized backend name
    pub fn display_name(&self) -> &str {
        match self {
            Self::OpenAI => "OpenAI-compatible",
            Self::Ollama => "Ollama",
        }
    }

    // @returns: Lowercase backend identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::OpenAI => "openai".to_string(),
            Self::Ollama => "ollama".to_string(),
        }
    }

    // @returns: Default endpoint for the backend
    pub fn default_endpoint(&self) -> String {
        match self {
            Self::OpenAI => default_openai_endpoint(),
            Self::Ollama => default_ollama_endpoint(),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            _ => Err(anyhow!("Invalid backend type: {}", s)),
        }
    }
}

/// Translation client configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Backend protocol
    #[serde(default)]
    pub backend: BackendKind,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Service URL; empty means the backend default
    #[serde(default = "String::new")]
    pub endpoint: String,

    /// API key, sent as a bearer token when non-empty
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Temperature parameter for text generation
    /// Low values keep translations deterministic
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Latency ceiling in seconds; slower answers are discarded
    #[serde(default = "default_soft_timeout_secs")]
    pub soft_timeout_secs: u64,

    /// Hard transport timeout in seconds for hung connections
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Maximum backend attempts per translation call
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Fixed wait between failed attempts, in seconds
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,

    /// Wait before re-requesting a chunk after a soft timeout, in seconds
    #[serde(default = "default_soft_timeout_backoff_secs")]
    pub soft_timeout_backoff_secs: u64,

    /// Optional cap on soft timeouts per chunk; unlimited when absent
    #[serde(default)]
    pub max_soft_timeouts: Option<u32>,

    /// Placeholder written for chunks whose retries are exhausted
    #[serde(default = "default_error_sentinel")]
    pub error_sentinel: String,

    /// Persona/context instruction
    /// Placeholders: {context}, {target_language}
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Task instruction
    /// Placeholders: {text}, {target_language}
    #[serde(default = "default_task_prompt")]
    pub task_prompt: String,
}

impl TranslationConfig {
    /// Get the endpoint for the active backend
    pub fn get_endpoint(&self) -> String {
        if !self.endpoint.is_empty() {
            return self.endpoint.trim_end_matches('/').to_string();
        }
        self.backend.default_endpoint()
    }

    /// Soft timeout as a duration
    pub fn soft_timeout(&self) -> Duration {
        Duration::from_secs(self.soft_timeout_secs)
    }

    /// Retry backoff as a duration
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }

    /// Soft-timeout backoff as a duration
    pub fn soft_timeout_backoff(&self) -> Duration {
        Duration::from_secs(self.soft_timeout_backoff_secs)
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            model: default_model(),
            endpoint: String::new(),
            api_key: String::new(),
            temperature: default_temperature(),
            soft_timeout_secs: default_soft_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            retry_count: default_retry_count(),
            retry_backoff_secs: default_retry_backoff_secs(),
            soft_timeout_backoff_secs: default_soft_timeout_backoff_secs(),
            max_soft_timeouts: None,
            error_sentinel: default_error_sentinel(),
            system_prompt: default_system_prompt(),
            task_prompt: default_task_prompt(),
        }
    }
}

/// Chunking configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters repeated from the end of one chunk at the start of the next
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

/// Progress snapshot configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProgressConfig {
    /// Location of the snapshot file
    #[serde(default = "default_progress_path")]
    pub path: PathBuf,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            path: default_progress_path(),
        }
    }
}

/// Output assembly configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OutputConfig {
    /// Rewrite U+3000 ideographic spaces to ASCII spaces
    #[serde(default = "default_true")]
    pub normalize_fullwidth_spaces: bool,

    /// Separator placed between translated chunks
    #[serde(default = "default_join_separator")]
    pub join_separator: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            normalize_fullwidth_spaces: true,
            join_separator: default_join_separator(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Convert to the log crate's filter
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_target_language() -> String {
    "ja".to_string()
}

fn default_model() -> String {
    "gemma3".to_string()
}

fn default_openai_endpoint() -> String {
    // Ollama serves the OpenAI-compatible API under /v1
    "http://localhost:11434/v1".to_string()
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_soft_timeout_secs() -> u64 {
    30
}

fn default_request_timeout_secs() -> u64 {
    600
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_secs() -> u64 {
    5
}

fn default_soft_timeout_backoff_secs() -> u64 {
    5
}

fn default_error_sentinel() -> String {
    "[翻訳エラー]".to_string()
}

fn default_system_prompt() -> String {
    crate::translation::prompts::PromptTemplate::DEFAULT_SYSTEM.to_string()
}

fn default_task_prompt() -> String {
    crate::translation::prompts::PromptTemplate::DEFAULT_TASK.to_string()
}

fn default_chunk_size() -> usize {
    1000
}

fn default_overlap() -> usize {
    100
}

fn default_progress_path() -> PathBuf {
    PathBuf::from("progress.json")
}

fn default_join_separator() -> String {
    "\n".to_string()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let _target_name = crate::language_utils::get_language_name(&self.target_language)?;

        let endpoint = self.translation.get_endpoint();
        url::Url::parse(&endpoint)
            .map_err(|e| anyhow!("Invalid backend endpoint '{}': {}", endpoint, e))?;

        if self.translation.model.trim().is_empty() {
            return Err(anyhow!("Model name must not be empty"));
        }

        if self.translation.retry_count == 0 {
            return Err(anyhow!("retry_count must be at least 1"));
        }

        if !(0.0..=2.0).contains(&self.translation.temperature) {
            return Err(anyhow!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.translation.temperature
            ));
        }

        if self.translation.soft_timeout_secs == 0 {
            return Err(anyhow!("soft_timeout_secs must be at least 1"));
        }

        if self.translation.max_soft_timeouts == Some(0) {
            return Err(anyhow!("max_soft_timeouts must be at least 1 when set"));
        }

        if self.translation.error_sentinel.is_empty() {
            return Err(anyhow!("error_sentinel must not be empty"));
        }

        if !self.translation.task_prompt.contains("{text}") {
            return Err(anyhow!("task_prompt must contain the {{text}} placeholder"));
        }

        if !self.translation.system_prompt.contains("{context}") {
            return Err(anyhow!("system_prompt must contain the {{context}} placeholder"));
        }

        crate::translation::chunker::TextSplitter::new(self.chunking.chunk_size, self.chunking.overlap)?;

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            target_language: default_target_language(),
            translation: TranslationConfig::default(),
            chunking: ChunkingConfig::default(),
            progress: ProgressConfig::default(),
            output: OutputConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
