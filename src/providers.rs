//! Startup provider selection.

use std::sync::Arc;

use generation_provider::{GenerationProvider, ProviderInitError};
use generation_provider_groq::{GroqProvider, GroqProviderConfig, GROQ_PROVIDER_ID};
use generation_provider_mock::{MockProvider, MOCK_PROVIDER_ID};

use crate::config::EnvConfig;

/// Builds the provider named by `config.provider`.
pub fn provider_from_config(
    config: &EnvConfig,
) -> Result<Arc<dyn GenerationProvider>, ProviderInitError> {
    match config.provider.as_str() {
        GROQ_PROVIDER_ID => {
            let mut groq = GroqProviderConfig::new(config.groq_api_key.clone())
                .with_default_model(config.params.model.clone());
            if let Some(base_url) = &config.groq_base_url {
                groq = groq.with_base_url(base_url.clone());
            }
            if let Some(timeout) = config.groq_timeout {
                groq = groq.with_timeout(timeout);
            }
            Ok(Arc::new(GroqProvider::new(groq)?))
        }
        MOCK_PROVIDER_ID => Ok(Arc::new(MockProvider::default())),
        other => Err(ProviderInitError::new(format!(
            "Unknown provider '{other}' (expected '{GROQ_PROVIDER_ID}' or '{MOCK_PROVIDER_ID}')"
        ))),
    }
}

pub fn provider_from_env() -> Result<Arc<dyn GenerationProvider>, ProviderInitError> {
    provider_from_config(&EnvConfig::from_env())
}
