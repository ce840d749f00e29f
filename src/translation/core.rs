/*!
 * Core translation service.
 *
 * `TranslationService` turns one chunk into one translation. Each backend call
 * is timed: a response slower than the soft timeout is discarded and reported
 * as `AttemptOutcome::SoftTimeout` without further attempts, while backend
 * errors are retried with a fixed backoff until the attempt budget is spent.
 */

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Local;
use log::debug;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::app_config::TranslationConfig;
use crate::errors::{ProviderError, TranslationError};
use crate::providers::{self, CompletionRequest, Provider};
use crate::translation::job::{AttemptOutcome, Chunk};
use crate::translation::observer::{NoopObserver, TranslationObserver};
use crate::translation::prompts::PromptTemplate;

/// Token and latency usage statistics
#[derive(Debug, Clone)]
pub struct TokenUsageStats {
    /// Backend calls made
    pub requests: u64,

    /// Backend calls that failed or returned nothing
    pub failures: u64,

    /// Responses discarded for exceeding the soft timeout
    pub soft_timeouts: u64,

    /// Number of prompt tokens
    pub prompt_tokens: u64,

    /// Number of completion tokens
    pub completion_tokens: u64,

    /// Total number of tokens
    pub total_tokens: u64,

    /// Start time of token tracking
    pub start_time: Instant,

    /// Total time spent on API requests
    pub api_duration: Duration,

    /// Provider name
    pub provider: String,

    /// Model name
    pub model: String,
}

impl Default for TokenUsageStats {
    fn default() -> Self {
        Self::with_provider_info(String::new(), String::new())
    }
}

impl TokenUsageStats {
    /// Create new token usage stats with provider info
    pub fn with_provider_info(provider: String, model: String) -> Self {
        Self {
            requests: 0,
            failures: 0,
            soft_timeouts: 0,
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
            start_time: Instant::now(),
            api_duration: Duration::ZERO,
            provider,
            model,
        }
    }

    /// Add reported token counts
    pub fn add_token_usage(&mut self, prompt_tokens: Option<u64>, completion_tokens: Option<u64>) {
        if let Some(pt) = prompt_tokens {
            self.prompt_tokens += pt;
            self.total_tokens += pt;
        }

        if let Some(ct) = completion_tokens {
            self.completion_tokens += ct;
            self.total_tokens += ct;
        }
    }

    /// Calculate tokens per minute rate over API time
    pub fn tokens_per_minute(&self) -> f64 {
        let duration_minutes = self.api_duration.as_secs_f64() / 60.0;
        if duration_minutes > 0.0 {
            self.total_tokens as f64 / duration_minutes
        } else {
            0.0
        }
    }

    /// Generate a summary of usage
    pub fn summary(&self) -> String {
        let elapsed_minutes = self.start_time.elapsed().as_secs_f64() / 60.0;
        let api_minutes = self.api_duration.as_secs_f64() / 60.0;

        format!(
            "Usage Summary:\n\
             Provider: {}\n\
             Model: {}\n\
             Requests: {} ({} failed, {} too slow)\n\
             Prompt tokens: {}\n\
             Completion tokens: {}\n\
             Total tokens: {}\n\
             Elapsed time: {:.2} minutes\n\
             API request time: {:.2} minutes\n\
             Tokens per minute: {:.2}",
            self.provider,
            self.model,
            self.requests,
            self.failures,
            self.soft_timeouts,
            self.prompt_tokens,
            self.completion_tokens,
            self.total_tokens,
            elapsed_minutes,
            api_minutes,
            self.tokens_per_minute()
        )
    }
}

/// Translates single chunks through a backend
pub struct TranslationService {
    /// Backend client
    provider: Box<dyn Provider>,

    /// Retry, timeout and model settings
    config: TranslationConfig,

    /// Message templates
    prompts: PromptTemplate,

    /// Human-readable target language name used in prompts
    target_language: String,

    /// Notification sink
    observer: Arc<dyn TranslationObserver>,

    /// Usage counters
    usage: Mutex<TokenUsageStats>,
}

impl TranslationService {
    /// Create a service with the backend selected by `config`
    pub fn new(config: &TranslationConfig, target_language: impl Into<String>) -> Result<Self> {
        let provider = providers::from_config(config)?;
        Ok(Self::with_provider(provider, config, target_language))
    }

    /// Create a service around an existing provider
    pub fn with_provider(
        provider: Box<dyn Provider>,
        config: &TranslationConfig,
        target_language: impl Into<String>,
    ) -> Self {
        let usage = TokenUsageStats::with_provider_info(provider.name().to_string(), config.model.clone());

        Self {
            provider,
            config: config.clone(),
            prompts: PromptTemplate::new(&config.system_prompt, &config.task_prompt),
            target_language: target_language.into(),
            observer: Arc::new(NoopObserver),
            usage: Mutex::new(usage),
        }
    }

    /// Replace the notification sink
    pub fn with_observer(mut self, observer: Arc<dyn TranslationObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &TranslationConfig {
        &self.config
    }

    pub fn observer(&self) -> Arc<dyn TranslationObserver> {
        Arc::clone(&self.observer)
    }

    /// Snapshot of the usage counters
    pub fn usage(&self) -> TokenUsageStats {
        self.usage.lock().clone()
    }

    /// Test the connection to the backend
    pub async fn test_connection(&self) -> Result<(), ProviderError> {
        debug!(
            "Testing connection to {} with model {}",
            self.provider.name(),
            self.config.model
        );
        self.provider.test_connection().await
    }

    /// Translate one chunk
    ///
    /// # Arguments
    /// * `chunk` - The chunk to translate
    /// * `total` - Total chunk count, for progress reporting
    /// * `context` - Job context added to the system message
    ///
    /// # Returns
    /// * `Translated` with the trimmed text
    /// * `SoftTimeout` if the backend answered after the soft timeout
    /// * `RetriesExhausted` once every attempt failed
    pub async fn translate(
        &self,
        chunk: &Chunk,
        total: usize,
        context: &str,
    ) -> Result<AttemptOutcome, TranslationError> {
        let max_attempts = self.config.retry_count.max(1);
        let soft_timeout = self.config.soft_timeout();
        let messages = self.prompts.messages(&chunk.text, context, &self.target_language);

        let mut last_error = ProviderError::EmptyResponse;

        for attempt in 1..=max_attempts {
            self.observer.on_attempt(chunk.index, total, attempt, Local::now());

            let request = CompletionRequest {
                model: self.config.model.clone(),
                messages: messages.clone(),
                temperature: self.config.temperature,
            };

            let started = Instant::now();
            let result = self.provider.complete(request).await;
            let elapsed = started.elapsed();

            {
                let mut usage = self.usage.lock();
                usage.requests += 1;
                usage.api_duration += elapsed;
            }

            let error = match result {
                Ok(completion) => {
                    if elapsed > soft_timeout {
                        self.usage.lock().soft_timeouts += 1;
                        return Ok(AttemptOutcome::SoftTimeout { elapsed });
                    }

                    let text = completion.text.trim();
                    if !text.is_empty() {
                        self.usage
                            .lock()
                            .add_token_usage(completion.prompt_tokens, completion.completion_tokens);
                        debug!("Chunk {} translated in {:.2}s", chunk.index + 1, elapsed.as_secs_f64());
                        return Ok(AttemptOutcome::Translated(text.to_string()));
                    }
                    ProviderError::EmptyResponse
                }
                Err(e) => e,
            };

            self.usage.lock().failures += 1;
            self.observer.on_attempt_failed(chunk.index, attempt, max_attempts, &error);
            last_error = error;

            if attempt < max_attempts {
                tokio::time::sleep(self.config.retry_backoff()).await;
            }
        }

        Err(TranslationError::RetriesExhausted {
            attempts: max_attempts,
            last_error,
        })
    }
}

impl std::fmt::Debug for TranslationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationService")
            .field("provider", &self.provider)
            .field("model", &self.config.model)
            .field("target_language", &self.target_language)
            .finish()
    }
}
