//! Groq-backed implementation of the shared `generation_provider` contract.
//!
//! This adapter translates one `groq_api` chat completion into the
//! provider-neutral `GenerationResponse`/`GenerationError` pair expected by
//! `mutation_wheel`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use generation_provider::{
    CancelSignal, GenerationError, GenerationFuture, GenerationProvider, GenerationRequest,
    GenerationResponse, ProviderInitError, ProviderProfile, Usage,
};
use groq_api::models::default_model_id;
use groq_api::payload::CompletionUsage;
use groq_api::{
    ChatCompletionRequest, ChatCompletionResponse, GroqApiClient, GroqApiConfig, GroqApiError,
};

/// Stable provider identifier used by startup selection.
pub const GROQ_PROVIDER_ID: &str = "groq";

/// Runtime configuration for the Groq provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroqProviderConfig {
    /// May be empty; calls then fail with `Missing GROQ_API_KEY` when dispatched.
    pub api_key: String,
    pub default_model: Option<String>,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
}

impl GroqProviderConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            default_model: None,
            base_url: None,
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn into_groq_api_config(self) -> GroqApiConfig {
        let mut config = GroqApiConfig::new(self.api_key);

        if let Some(base_url) = self.base_url {
            config = config.with_base_url(base_url);
        }

        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }

        config
    }
}

type CompletionFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ChatCompletionResponse, GroqApiError>> + Send + 'a>>;

trait CompletionClient: Send + Sync {
    fn complete(&self, request: ChatCompletionRequest, cancel: CancelSignal) -> CompletionFuture<'_>;
}

#[derive(Debug)]
struct DefaultCompletionClient {
    client: GroqApiClient,
}

impl CompletionClient for DefaultCompletionClient {
    fn complete(&self, request: ChatCompletionRequest, cancel: CancelSignal) -> CompletionFuture<'_> {
        Box::pin(async move { self.client.complete(&request, Some(&cancel)).await })
    }
}

/// `GenerationProvider` adapter backed by `groq_api` transport primitives.
pub struct GroqProvider {
    default_model: String,
    client: Arc<dyn CompletionClient>,
}

impl GroqProvider {
    /// Creates a provider using real Groq transport.
    ///
    /// A missing API key is not rejected here; it surfaces as a generation
    /// failure on the first call.
    pub fn new(config: GroqProviderConfig) -> Result<Self, ProviderInitError> {
        let default_model = sanitize_model_id(config.default_model.clone());
        let client = Arc::new(DefaultCompletionClient {
            client: GroqApiClient::new(config.into_groq_api_config()).map_err(map_init_error)?,
        });

        Ok(Self {
            default_model,
            client,
        })
    }

    #[cfg(test)]
    fn with_client_for_tests(default_model: Option<String>, client: Arc<dyn CompletionClient>) -> Self {
        Self {
            default_model: sanitize_model_id(default_model),
            client,
        }
    }

    fn completion_request(&self, req: &GenerationRequest) -> ChatCompletionRequest {
        let model = match req.params.model.trim() {
            "" => self.default_model.clone(),
            model => model.to_string(),
        };

        ChatCompletionRequest::new(
            model,
            req.params.system_instructions.clone(),
            req.params.user_text.clone(),
        )
        .with_temperature(req.params.temperature)
        .with_max_tokens(req.params.max_output_tokens)
    }
}

impl GenerationProvider for GroqProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: GROQ_PROVIDER_ID.to_string(),
            model_id: self.default_model.clone(),
        }
    }

    fn generate(&self, req: GenerationRequest, cancel: CancelSignal) -> GenerationFuture<'_> {
        let request = self.completion_request(&req);
        let run_id = req.run_id;

        Box::pin(async move {
            tracing::debug!(run_id, model = %request.model, "dispatching groq completion");
            let requested_model = request.model.clone();

            match self.client.complete(request, cancel).await {
                Ok(response) => Ok(map_response(response, requested_model)),
                Err(GroqApiError::Cancelled) => Err(GenerationError::Cancelled),
                Err(error) => Err(GenerationError::failed(error.to_string())),
            }
        })
    }
}

fn map_response(response: ChatCompletionResponse, requested_model: String) -> GenerationResponse {
    let content = response.first_content().unwrap_or_default().to_string();
    let model = response
        .model
        .filter(|model| !model.trim().is_empty())
        .unwrap_or(requested_model);

    GenerationResponse {
        content,
        model,
        usage: response.usage.map(map_usage),
    }
}

fn map_usage(usage: CompletionUsage) -> Usage {
    Usage {
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        total_tokens: usage.total_tokens,
    }
}

fn sanitize_model_id(model: Option<String>) -> String {
    model
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default_model_id().to_string())
}

fn map_init_error(error: GroqApiError) -> ProviderInitError {
    ProviderInitError::new(format!("Failed to initialize groq provider: {error}"))
}
