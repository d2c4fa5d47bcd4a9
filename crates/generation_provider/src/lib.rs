//! Minimal provider-agnostic contract for executing a single generation call.
//!
//! This crate defines only the request/response shapes, the cancellation
//! handle, and the dispatch-boundary validation shared by every provider. It
//! excludes provider transport details and any scheduling or single-flight
//! orchestration concerns.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{atomic::AtomicBool, Arc};

use serde_json::Value;

/// Identifier for one generation call. Monotonic per client.
pub type RunId = u64;

/// Shared cancellation flag for a generation call.
pub type CancelSignal = Arc<AtomicBool>;

/// Boxed future returned by [`GenerationProvider::generate`].
pub type GenerationFuture<'a> =
    Pin<Box<dyn Future<Output = Result<GenerationResponse, GenerationError>> + Send + 'a>>;

pub const MIN_TEMPERATURE: f64 = 0.0;
pub const MAX_TEMPERATURE: f64 = 2.0;
pub const MIN_MAX_OUTPUT_TOKENS: u32 = 16;
pub const MAX_MAX_OUTPUT_TOKENS: u32 = 32_768;

/// Temperature applied at the dispatch boundary when the caller omits one.
pub const DISPATCH_DEFAULT_TEMPERATURE: f64 = 0.7;
/// Output size applied at the dispatch boundary when the caller omits one.
pub const DISPATCH_DEFAULT_MAX_OUTPUT_TOKENS: u32 = 700;

/// Error returned while constructing/configuring a provider before any call starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInitError {
    message: String,
}

impl ProviderInitError {
    /// Creates a new provider initialization error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the underlying error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ProviderInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ProviderInitError {}

impl From<String> for ProviderInitError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ProviderInitError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Validated parameters for one generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub system_instructions: String,
    pub user_text: String,
    pub model: String,
    /// Always within `MIN_TEMPERATURE..=MAX_TEMPERATURE`.
    pub temperature: f64,
    /// Always within `MIN_MAX_OUTPUT_TOKENS..=MAX_MAX_OUTPUT_TOKENS`.
    pub max_output_tokens: u32,
}

/// Input handed to a provider for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub run_id: RunId,
    pub params: GenerationParams,
}

/// Token accounting reported by the service. Every field is optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

/// Successful provider result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResponse {
    pub content: String,
    /// Model that actually served the call, as echoed by the service.
    pub model: String,
    pub usage: Option<Usage>,
}

/// Provider failure for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// The call observed its cancel signal before resolving.
    Cancelled,
    /// Transport, configuration, or service failure with a human-readable message.
    Failed(String),
}

impl GenerationError {
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => f.write_str("generation was cancelled"),
            Self::Failed(message) => f.write_str(message),
        }
    }
}

impl std::error::Error for GenerationError {}

/// Immutable metadata describing a generation provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub provider_id: String,
    pub model_id: String,
}

/// Provider interface for executing one generation request.
pub trait GenerationProvider: Send + Sync + 'static {
    /// Returns provider/model identity metadata.
    fn profile(&self) -> ProviderProfile;

    /// Executes one request.
    ///
    /// Providers should poll `cancel` while waiting and resolve with
    /// [`GenerationError::Cancelled`] once it is set. Callers must still treat
    /// any resolution of a cancelled call as stale.
    fn generate(&self, req: GenerationRequest, cancel: CancelSignal) -> GenerationFuture<'_>;
}

/// Clamps a temperature into the accepted range. Non-finite input maps to the dispatch default.
#[must_use]
pub fn clamp_temperature(value: f64) -> f64 {
    if !value.is_finite() {
        return DISPATCH_DEFAULT_TEMPERATURE;
    }
    value.clamp(MIN_TEMPERATURE, MAX_TEMPERATURE)
}

/// Clamps an output size into the accepted range.
#[must_use]
pub fn clamp_max_output_tokens(value: i64) -> u32 {
    let clamped = value.clamp(
        i64::from(MIN_MAX_OUTPUT_TOKENS),
        i64::from(MAX_MAX_OUTPUT_TOKENS),
    );
    u32::try_from(clamped).unwrap_or(MAX_MAX_OUTPUT_TOKENS)
}

/// Rejection produced by [`validate_dispatch_body`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchError {
    field: &'static str,
}

impl DispatchError {
    #[must_use]
    pub fn field(&self) -> &'static str {
        self.field
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid '{}' (must be string)", self.field)
    }
}

impl std::error::Error for DispatchError {}

/// Validates a loosely-typed dispatch body into [`GenerationParams`].
///
/// Expected keys: `text`, `superPrompt`, `model` (strings, required) and
/// `temperature`, `maxTokens` (numbers, optional). Numbers are clamped;
/// missing or non-numeric values fall back to the dispatch defaults.
pub fn validate_dispatch_body(body: &Value) -> Result<GenerationParams, DispatchError> {
    let user_text = required_string(body, "text")?;
    let system_instructions = required_string(body, "superPrompt")?;
    let model = required_string(body, "model")?;

    let temperature = body
        .get("temperature")
        .and_then(Value::as_f64)
        .map(clamp_temperature)
        .unwrap_or(DISPATCH_DEFAULT_TEMPERATURE);

    let max_output_tokens = match body.get("maxTokens") {
        Some(value) => match (value.as_i64(), value.as_f64()) {
            (Some(whole), _) => clamp_max_output_tokens(whole),
            (None, Some(fractional)) if fractional.is_finite() => {
                clamp_max_output_tokens(fractional.round() as i64)
            }
            _ => DISPATCH_DEFAULT_MAX_OUTPUT_TOKENS,
        },
        None => DISPATCH_DEFAULT_MAX_OUTPUT_TOKENS,
    };

    Ok(GenerationParams {
        system_instructions,
        user_text,
        model,
        temperature,
        max_output_tokens,
    })
}

fn required_string(body: &Value, field: &'static str) -> Result<String, DispatchError> {
    body.get(field)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or(DispatchError { field })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    struct MinimalProvider;

    impl GenerationProvider for MinimalProvider {
        fn profile(&self) -> ProviderProfile {
            ProviderProfile {
                provider_id: "minimal".to_string(),
                model_id: "minimal-model".to_string(),
            }
        }

        fn generate(&self, req: GenerationRequest, _cancel: CancelSignal) -> GenerationFuture<'_> {
            Box::pin(async move {
                Ok(GenerationResponse {
                    content: req.params.user_text,
                    model: req.params.model,
                    usage: None,
                })
            })
        }
    }

    #[test]
    fn provider_init_error_preserves_message() {
        let error = ProviderInitError::new("missing key");
        assert_eq!(error.message(), "missing key");
        assert_eq!(error.to_string(), "missing key");
    }

    #[test]
    fn generation_error_display_is_the_message() {
        assert_eq!(GenerationError::failed("HTTP 500").to_string(), "HTTP 500");
        assert!(GenerationError::Cancelled.is_cancelled());
        assert!(!GenerationError::failed("boom").is_cancelled());
    }

    #[test]
    fn minimal_provider_reports_profile() {
        let provider = MinimalProvider;
        assert_eq!(provider.profile().model_id, "minimal-model");
    }

    #[test]
    fn clamp_temperature_bounds_and_non_finite_default() {
        assert_eq!(clamp_temperature(-1.0), 0.0);
        assert_eq!(clamp_temperature(2.5), 2.0);
        assert_eq!(clamp_temperature(0.75), 0.75);
        assert_eq!(clamp_temperature(f64::NAN), DISPATCH_DEFAULT_TEMPERATURE);
    }

    #[test]
    fn clamp_max_output_tokens_bounds() {
        assert_eq!(clamp_max_output_tokens(0), 16);
        assert_eq!(clamp_max_output_tokens(-40), 16);
        assert_eq!(clamp_max_output_tokens(700), 700);
        assert_eq!(clamp_max_output_tokens(1_000_000), 32_768);
    }

    #[test]
    fn dispatch_body_applies_defaults_when_numbers_are_missing() {
        let params = validate_dispatch_body(&json!({
            "text": "seed",
            "superPrompt": "rules",
            "model": "llama-3.1-8b-instant",
        }))
        .expect("valid body");

        assert_eq!(params.user_text, "seed");
        assert_eq!(params.system_instructions, "rules");
        assert_eq!(params.model, "llama-3.1-8b-instant");
        assert_eq!(params.temperature, DISPATCH_DEFAULT_TEMPERATURE);
        assert_eq!(params.max_output_tokens, DISPATCH_DEFAULT_MAX_OUTPUT_TOKENS);
    }

    #[test]
    fn dispatch_body_clamps_numbers() {
        let params = validate_dispatch_body(&json!({
            "text": "seed",
            "superPrompt": "rules",
            "model": "m",
            "temperature": 9.0,
            "maxTokens": 4,
        }))
        .expect("valid body");

        assert_eq!(params.temperature, 2.0);
        assert_eq!(params.max_output_tokens, 16);
    }

    #[test]
    fn dispatch_body_ignores_non_numeric_numbers() {
        let params = validate_dispatch_body(&json!({
            "text": "seed",
            "superPrompt": "rules",
            "model": "m",
            "temperature": "hot",
            "maxTokens": null,
        }))
        .expect("valid body");

        assert_eq!(params.temperature, DISPATCH_DEFAULT_TEMPERATURE);
        assert_eq!(params.max_output_tokens, DISPATCH_DEFAULT_MAX_OUTPUT_TOKENS);
    }

    #[test]
    fn dispatch_body_rejects_non_string_fields_in_order() {
        let error = validate_dispatch_body(&json!({ "text": 3 })).expect_err("text is not a string");
        assert_eq!(error.field(), "text");
        assert_eq!(error.to_string(), "Invalid 'text' (must be string)");

        let error = validate_dispatch_body(&json!({ "text": "a", "model": "m" }))
            .expect_err("superPrompt is missing");
        assert_eq!(error.to_string(), "Invalid 'superPrompt' (must be string)");

        let error = validate_dispatch_body(&json!({ "text": "a", "superPrompt": "b", "model": [] }))
            .expect_err("model is not a string");
        assert_eq!(error.field(), "model");
    }
}
