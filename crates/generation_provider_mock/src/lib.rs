//! Deterministic mock implementation of the shared `generation_provider` contract.
//!
//! This crate contains no transport logic and is intended for local runs and
//! contract-level integration testing. Replies are scripted in order; once the
//! script is exhausted the provider answers with a word rotation of the prompt.

use std::collections::VecDeque;
use std::sync::atomic::Ordering;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use generation_provider::{
    CancelSignal, GenerationError, GenerationFuture, GenerationProvider, GenerationRequest,
    GenerationResponse, ProviderProfile, Usage,
};
use tokio::time::Instant;

/// Stable provider identifier used for explicit startup selection.
pub const MOCK_PROVIDER_ID: &str = "mock";

/// Delay applied to unscripted replies.
pub const DEFAULT_REPLY_DELAY: Duration = Duration::from_millis(600);

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOutcome {
    Content(String),
    Failure(String),
}

/// One scripted reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockReply {
    pub delay: Duration,
    pub outcome: MockOutcome,
    /// Model echoed back; defaults to the requested model.
    pub model: Option<String>,
}

impl MockReply {
    #[must_use]
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            delay: Duration::ZERO,
            outcome: MockOutcome::Content(text.into()),
            model: None,
        }
    }

    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            delay: Duration::ZERO,
            outcome: MockOutcome::Failure(message.into()),
            model: None,
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Deterministic mock provider used by `mutation_wheel` tests and local runs.
#[derive(Debug)]
pub struct MockProvider {
    model_id: String,
    replies: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<GenerationRequest>>,
    honor_cancel: bool,
    fallback_delay: Duration,
}

impl MockProvider {
    /// Creates a mock provider answering with the given replies in order.
    #[must_use]
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            model_id: "mock-wheel".to_string(),
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            honor_cancel: true,
            fallback_delay: DEFAULT_REPLY_DELAY,
        }
    }

    /// Makes every call run to completion even after its cancel signal is set.
    ///
    /// Useful to exercise late resolutions of superseded calls.
    #[must_use]
    pub fn ignoring_cancellation(mut self) -> Self {
        self.honor_cancel = false;
        self
    }

    #[must_use]
    pub fn with_fallback_delay(mut self, delay: Duration) -> Self {
        self.fallback_delay = delay;
        self
    }

    #[must_use]
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    /// Requests observed so far, in call order.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        lock_unpoisoned(&self.requests).clone()
    }

    pub fn call_count(&self) -> usize {
        lock_unpoisoned(&self.requests).len()
    }

    fn next_reply(&self, call_index: usize, req: &GenerationRequest) -> MockReply {
        if let Some(reply) = lock_unpoisoned(&self.replies).pop_front() {
            return reply;
        }

        MockReply::content(rotate_words(&req.params.user_text, call_index + 1))
            .with_delay(self.fallback_delay)
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl GenerationProvider for MockProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: MOCK_PROVIDER_ID.to_string(),
            model_id: self.model_id.clone(),
        }
    }

    fn generate(&self, req: GenerationRequest, cancel: CancelSignal) -> GenerationFuture<'_> {
        let call_index = {
            let mut requests = lock_unpoisoned(&self.requests);
            requests.push(req.clone());
            requests.len() - 1
        };
        let reply = self.next_reply(call_index, &req);

        Box::pin(async move {
            if self.honor_cancel {
                sleep_or_cancel(reply.delay, &cancel).await?;
            } else if !reply.delay.is_zero() {
                tokio::time::sleep(reply.delay).await;
            }

            match reply.outcome {
                MockOutcome::Content(content) => {
                    let words = content.split_whitespace().count() as u64;
                    let model = reply
                        .model
                        .or_else(|| Some(req.params.model).filter(|model| !model.trim().is_empty()))
                        .unwrap_or_else(|| self.model_id.clone());

                    Ok(GenerationResponse {
                        content,
                        model,
                        usage: Some(Usage {
                            prompt_tokens: None,
                            completion_tokens: Some(words),
                            total_tokens: Some(words),
                        }),
                    })
                }
                MockOutcome::Failure(message) => Err(GenerationError::Failed(message)),
            }
        })
    }
}

async fn sleep_or_cancel(delay: Duration, cancel: &CancelSignal) -> Result<(), GenerationError> {
    let deadline = Instant::now() + delay;

    loop {
        if cancel.load(Ordering::Acquire) {
            return Err(GenerationError::Cancelled);
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(());
        }

        tokio::time::sleep((deadline - now).min(CANCEL_POLL_INTERVAL)).await;
    }
}

fn rotate_words(text: &str, shift: usize) -> String {
    let mut words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return String::new();
    }

    let len = words.len();
    words.rotate_left(shift % len);
    words.join(" ")
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
