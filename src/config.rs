//! Environment configuration.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::core::params::SessionParams;

pub const INTERVAL_MS_ENV: &str = "MUTATION_WHEEL_INTERVAL_MS";
pub const WORDS_PER_TICK_ENV: &str = "MUTATION_WHEEL_WORDS_PER_TICK";
pub const TEMPERATURE_ENV: &str = "MUTATION_WHEEL_TEMPERATURE";
pub const MAX_TOKENS_ENV: &str = "MUTATION_WHEEL_MAX_TOKENS";
pub const MODEL_ENV: &str = "MUTATION_WHEEL_MODEL";
pub const SEED_ENV: &str = "MUTATION_WHEEL_SEED";
pub const SYSTEM_INSTRUCTIONS_ENV: &str = "MUTATION_WHEEL_SYSTEM_INSTRUCTIONS";
pub const PROVIDER_ENV: &str = "MUTATION_WHEEL_PROVIDER";
pub const GROQ_API_KEY_ENV: &str = "GROQ_API_KEY";
pub const GROQ_BASE_URL_ENV: &str = "GROQ_BASE_URL";
pub const GROQ_TIMEOUT_SEC_ENV: &str = "GROQ_TIMEOUT_SEC";

pub const DEFAULT_PROVIDER: &str = "groq";

#[derive(Debug, Clone, PartialEq)]
pub struct EnvConfig {
    pub params: SessionParams,
    pub provider: String,
    /// Empty when unset; the first generation then fails instead of startup.
    pub groq_api_key: String,
    pub groq_base_url: Option<String>,
    pub groq_timeout: Option<Duration>,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        let defaults = SessionParams::default();
        let params = SessionParams {
            interval_ms: env_parse(INTERVAL_MS_ENV).unwrap_or(defaults.interval_ms),
            words_per_tick: env_parse(WORDS_PER_TICK_ENV).unwrap_or(defaults.words_per_tick),
            temperature: env_parse(TEMPERATURE_ENV).unwrap_or(defaults.temperature),
            max_output_tokens: env_parse(MAX_TOKENS_ENV).unwrap_or(defaults.max_output_tokens),
            model: env_string_opt(MODEL_ENV)
                .map(|model| model.trim().to_string())
                .unwrap_or(defaults.model),
            seed_text: env_string_opt(SEED_ENV).unwrap_or(defaults.seed_text),
            system_instructions: env_string_opt(SYSTEM_INSTRUCTIONS_ENV)
                .unwrap_or(defaults.system_instructions),
        }
        .normalized();

        Self {
            params,
            provider: env_string_opt(PROVIDER_ENV)
                .map(|provider| provider.trim().to_ascii_lowercase())
                .unwrap_or_else(|| DEFAULT_PROVIDER.to_string()),
            groq_api_key: env_string_opt(GROQ_API_KEY_ENV).unwrap_or_default(),
            groq_base_url: env_string_opt(GROQ_BASE_URL_ENV),
            groq_timeout: env_parse::<u64>(GROQ_TIMEOUT_SEC_ENV)
                .filter(|seconds| *seconds > 0)
                .map(Duration::from_secs),
        }
    }
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let value = env_string_opt(key)?;
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!(key, value = %value, "ignoring unparsable environment value");
            None
        }
    }
}
