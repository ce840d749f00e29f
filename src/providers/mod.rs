/*!
 * Provider implementations for text-generation backends.
 *
 * This module contains client implementations for the supported backends:
 * - OpenAI: OpenAI-compatible chat completions (also served by Ollama under /v1)
 * - Ollama: Native Ollama chat API
 * - Mock: Scripted double for tests
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::app_config::{BackendKind, TranslationConfig};
use crate::errors::ProviderError;

/// Chat message object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user or assistant)
    pub role: String,
    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Backend-neutral completion request
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Model name
    pub model: String,
    /// Conversation to complete
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature
    pub temperature: f32,
}

/// Backend-neutral completion result
#[derive(Debug, Clone, Default)]
pub struct Completion {
    /// Generated text, untrimmed
    pub text: String,
    /// Prompt tokens, when reported
    pub prompt_tokens: Option<u64>,
    /// Completion tokens, when reported
    pub completion_tokens: Option<u64>,
}

/// Common trait for all backends
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably by the translation service.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Complete a request using this provider
    ///
    /// # Arguments
    /// * `request` - The request to complete
    ///
    /// # Returns
    /// * `Result<Completion, ProviderError>` - The generated text or an error
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError>;

    /// Test the connection to the provider
    ///
    /// # Returns
    /// * `Result<(), ProviderError>` - Ok if the connection is successful, or an error
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Human-readable provider name for logs
    fn name(&self) -> &str;
}

/// Build the provider selected by the configuration
pub fn from_config(config: &TranslationConfig) -> Result<Box<dyn Provider>, ProviderError> {
    let endpoint = config.get_endpoint();
    let provider: Box<dyn Provider> = match config.backend {
        BackendKind::OpenAI => Box::new(openai::OpenAI::new(
            endpoint,
            config.api_key.clone(),
            config.request_timeout_secs,
        )?),
        BackendKind::Ollama => Box::new(ollama::Ollama::new(endpoint, config.request_timeout_secs)?),
    };
    Ok(provider)
}

pub mod mock;
pub mod ollama;
pub mod openai;
