/*!
 * Mock provider implementations for testing.
 *
 * This module provides mock providers that simulate different behaviors:
 * - `MockProvider::working()` - Always succeeds with translated text
 * - `MockProvider::failing()` - Always fails with an error
 * - `MockProvider::fail_first(n)` - Fails `n` times, then succeeds
 * - `MockProvider::slow_first(n, ms)` - Answers late `n` times, then promptly
 * - `MockProvider::scripted(steps)` - Plays back an explicit list of answers
 *
 * The working answer is `[TRANSLATED] ` followed by the content of the last
 * user message. Clones share the request counter, the request log and the
 * script.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::ProviderError;
use crate::providers::{Completion, CompletionRequest, Provider};

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a proper translation
    Working,
    /// Always fails with an error
    Failing,
    /// Fails the first `failures` requests, then succeeds
    FailFirst { failures: usize },
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Returns an empty response
    Empty,
    /// Simulates slow response (for timeout testing)
    Slow { delay_ms: u64 },
    /// The first `slow_calls` requests are slow, the rest answer at once
    SlowFirst { slow_calls: usize, delay_ms: u64 },
}

/// One scripted answer
#[derive(Debug, Clone, PartialEq)]
pub enum MockStep {
    /// Answer immediately with this text
    Reply(String),
    /// Answer with this text after a delay
    SlowReply { text: String, delay_ms: u64 },
    /// Fail with a server error
    Fail,
}

/// Mock provider for testing translation behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    /// Behavior once the script is exhausted
    behavior: MockBehavior,
    /// Request counter shared across clones
    request_count: Arc<AtomicUsize>,
    /// Every request received, in order
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
    /// Scripted answers consumed before `behavior` applies
    script: Arc<Mutex<VecDeque<MockStep>>>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            script: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a provider that fails `failures` times before succeeding
    pub fn fail_first(failures: usize) -> Self {
        Self::new(MockBehavior::FailFirst { failures })
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    /// Create a mock that returns empty responses
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Create a mock that always answers after `delay_ms`
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Create a mock whose first `slow_calls` answers arrive after `delay_ms`
    pub fn slow_first(slow_calls: usize, delay_ms: u64) -> Self {
        Self::new(MockBehavior::SlowFirst { slow_calls, delay_ms })
    }

    /// Create a working mock that first plays back `steps`
    pub fn scripted(steps: impl IntoIterator<Item = MockStep>) -> Self {
        let provider = Self::working();
        provider.script.lock().extend(steps);
        provider
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Copy of every request received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }

    /// Last user message of every request, in order
    pub fn user_messages(&self) -> Vec<String> {
        self.requests.lock().iter().map(last_user_message).collect()
    }

    fn translated(request: &CompletionRequest) -> Completion {
        let source = last_user_message(request);
        Completion {
            prompt_tokens: Some(source.chars().count() as u64),
            completion_tokens: Some((source.chars().count() / 2) as u64),
            text: format!("[TRANSLATED] {}", source),
        }
    }

    fn server_error(count: usize) -> ProviderError {
        ProviderError::ApiError {
            status_code: 503,
            message: format!("Simulated provider failure (request #{})", count + 1),
        }
    }
}

fn last_user_message(request: &CompletionRequest) -> String {
    request
        .messages
        .iter()
        .rev()
        .find(|m| m.role == "user")
        .map(|m| m.content.clone())
        .unwrap_or_default()
}

fn reply(text: impl Into<String>) -> Completion {
    Completion {
        text: text.into(),
        prompt_tokens: None,
        completion_tokens: None,
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        let step = self.script.lock().pop_front();
        if let Some(step) = step {
            return match step {
                MockStep::Reply(text) => Ok(reply(text)),
                MockStep::SlowReply { text, delay_ms } => {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    Ok(reply(text))
                }
                MockStep::Fail => Err(Self::server_error(count)),
            };
        }

        match self.behavior {
            MockBehavior::Working => Ok(Self::translated(&request)),

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::FailFirst { failures } => {
                if count < failures {
                    Err(Self::server_error(count))
                } else {
                    Ok(Self::translated(&request))
                }
            }

            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && count % fail_every == fail_every - 1 {
                    Err(Self::server_error(count))
                } else {
                    Ok(Self::translated(&request))
                }
            }

            MockBehavior::Empty => Ok(reply("")),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok(Self::translated(&request))
            }

            MockBehavior::SlowFirst { slow_calls, delay_ms } => {
                if count < slow_calls {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                Ok(Self::translated(&request))
            }
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing => Err(ProviderError::ConnectionError(
                "Simulated connection failure".to_string(),
            )),
            _ => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
