//! Single-flight generation client.
//!
//! Each dispatch gets a fresh [`RunId`] and cancel flag. Dispatching again
//! flips the flag of the previous call before the new one starts, so at most
//! one call is live per client. Resolutions are reported with their run id;
//! whoever applies them must still compare it against the run it expects.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use generation_provider::{
    CancelSignal, GenerationError, GenerationParams, GenerationProvider, GenerationRequest,
    ProviderProfile, RunId, Usage,
};
use tokio::time::Instant;

/// Lifecycle of the most recent generation attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequestState {
    #[default]
    Idle,
    InFlight {
        run_id: RunId,
    },
    Completed,
    Aborted,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Completed {
        /// Trimmed; may be empty.
        content: String,
        model: String,
        usage: Option<Usage>,
    },
    Failed {
        error: String,
    },
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationReport {
    pub run_id: RunId,
    pub outcome: GenerationOutcome,
    /// Dispatch to resolution. `None` for cancelled calls.
    pub latency: Option<Duration>,
}

pub type ReportFuture = Pin<Box<dyn Future<Output = GenerationReport> + Send + 'static>>;

struct ActiveCall {
    run_id: RunId,
    cancel: CancelSignal,
}

pub struct GenerationClient {
    provider: Arc<dyn GenerationProvider>,
    next_run_id: AtomicU64,
    active: Mutex<Option<ActiveCall>>,
}

impl GenerationClient {
    pub fn new(provider: Arc<dyn GenerationProvider>) -> Arc<Self> {
        Arc::new(Self {
            provider,
            next_run_id: AtomicU64::new(1),
            active: Mutex::new(None),
        })
    }

    pub fn profile(&self) -> ProviderProfile {
        self.provider.profile()
    }

    /// Starts a call and returns its id with a future resolving to the report.
    ///
    /// Any call this client issued earlier and that is still pending is
    /// cancelled first. The returned future owns everything it needs and can be
    /// spawned.
    pub fn dispatch(self: &Arc<Self>, params: GenerationParams) -> (RunId, ReportFuture) {
        let run_id = self.next_run_id.fetch_add(1, Ordering::SeqCst);
        let cancel: CancelSignal = Arc::new(AtomicBool::new(false));

        {
            let mut active = self.lock_active();
            if let Some(previous) = active.replace(ActiveCall {
                run_id,
                cancel: Arc::clone(&cancel),
            }) {
                previous.cancel.store(true, Ordering::SeqCst);
                tracing::debug!(
                    superseded = previous.run_id,
                    run_id,
                    "cancelled pending generation"
                );
            }
        }

        let client = Arc::clone(self);
        let provider = Arc::clone(&self.provider);
        let request = GenerationRequest { run_id, params };

        let future = Box::pin(async move {
            let started = Instant::now();
            let result = provider.generate(request, Arc::clone(&cancel)).await;
            let latency = started.elapsed();
            client.clear_active_if_matching(run_id);

            let cancelled = cancel.load(Ordering::SeqCst);
            let (outcome, latency) = match result {
                _ if cancelled => (GenerationOutcome::Cancelled, None),
                Err(GenerationError::Cancelled) => (GenerationOutcome::Cancelled, None),
                Err(GenerationError::Failed(error)) => {
                    (GenerationOutcome::Failed { error }, Some(latency))
                }
                Ok(response) => (
                    GenerationOutcome::Completed {
                        content: response.content.trim().to_string(),
                        model: response.model,
                        usage: response.usage,
                    },
                    Some(latency),
                ),
            };

            GenerationReport {
                run_id,
                outcome,
                latency,
            }
        });

        (run_id, future)
    }

    /// Flags the pending call, if any, as cancelled and returns its id.
    pub fn cancel_active(&self) -> Option<RunId> {
        let active = self.lock_active().take()?;
        active.cancel.store(true, Ordering::SeqCst);
        Some(active.run_id)
    }

    pub fn active_run_id(&self) -> Option<RunId> {
        self.lock_active().as_ref().map(|active| active.run_id)
    }

    fn clear_active_if_matching(&self, run_id: RunId) {
        let mut active = self.lock_active();
        if active.as_ref().map(|call| call.run_id) == Some(run_id) {
            active.take();
        }
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<ActiveCall>> {
        lock_unpoisoned(&self.active)
    }
}

pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;
    use generation_provider_mock::{MockProvider, MockReply};
    use pretty_assertions::assert_eq;

    use super::*;

    fn params(text: &str) -> GenerationParams {
        GenerationParams {
            system_instructions: "rules".to_string(),
            user_text: text.to_string(),
            model: "llama-3.1-8b-instant".to_string(),
            temperature: 0.75,
            max_output_tokens: 700,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn completed_call_reports_trimmed_content_and_latency() {
        let provider = MockProvider::new(vec![MockReply::content("  nuovo testo \n")
            .with_delay(Duration::from_millis(120))
            .with_model("served")]);
        let client = GenerationClient::new(Arc::new(provider));

        let (run_id, future) = client.dispatch(params("seed"));
        assert_eq!(client.active_run_id(), Some(run_id));

        let report = future.await;

        assert_eq!(report.run_id, run_id);
        assert_matches!(
            report.outcome,
            GenerationOutcome::Completed { ref content, ref model, .. }
                if content == "nuovo testo" && model == "served"
        );
        assert_eq!(report.latency, Some(Duration::from_millis(120)));
        assert_eq!(client.active_run_id(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_is_reported_with_latency() {
        let provider = MockProvider::new(vec![
            MockReply::failure("HTTP 500 boom").with_delay(Duration::from_millis(40))
        ]);
        let client = GenerationClient::new(Arc::new(provider));

        let (_, future) = client.dispatch(params("seed"));
        let report = future.await;

        assert_eq!(
            report.outcome,
            GenerationOutcome::Failed {
                error: "HTTP 500 boom".to_string()
            }
        );
        assert_eq!(report.latency, Some(Duration::from_millis(40)));
    }

    #[tokio::test(start_paused = true)]
    async fn new_dispatch_cancels_the_previous_call() {
        let provider = MockProvider::new(vec![
            MockReply::content("alpha").with_delay(Duration::from_millis(300)),
            MockReply::content("beta").with_delay(Duration::from_millis(100)),
        ]);
        let client = GenerationClient::new(Arc::new(provider));

        let (first_id, first) = client.dispatch(params("seed"));
        let (second_id, second) = client.dispatch(params("seed"));
        assert!(second_id > first_id);

        let (first, second) = tokio::join!(first, second);

        assert_eq!(first.outcome, GenerationOutcome::Cancelled);
        assert_eq!(first.latency, None);
        assert_matches!(
            second.outcome,
            GenerationOutcome::Completed { ref content, .. } if content == "beta"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn late_content_from_a_cancelled_call_is_reported_as_cancelled() {
        let provider = MockProvider::new(vec![
            MockReply::content("alpha").with_delay(Duration::from_millis(300))
        ])
        .ignoring_cancellation();
        let client = GenerationClient::new(Arc::new(provider));

        let (run_id, future) = client.dispatch(params("seed"));
        assert_eq!(client.cancel_active(), Some(run_id));
        assert_eq!(client.cancel_active(), None);

        let report = future.await;
        assert_eq!(report.outcome, GenerationOutcome::Cancelled);
    }
}
