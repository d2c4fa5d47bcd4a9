use std::collections::BTreeMap;
use std::time::Duration;

use crate::url::DEFAULT_GROQ_BASE_URL;

/// Environment variable conventionally holding the API key.
pub const API_KEY_ENV_VAR: &str = "GROQ_API_KEY";

/// Transport configuration for Groq API requests.
#[derive(Debug, Clone)]
pub struct GroqApiConfig {
    /// Bearer token passed to `Authorization`. May be empty; requests then
    /// fail with [`crate::GroqApiError::MissingApiKey`] when dispatched.
    pub api_key: String,
    /// Base URL for Groq endpoints.
    pub base_url: String,
    /// Optional `User-Agent` override.
    pub user_agent: Option<String>,
    /// Additional headers merged into request headers.
    pub extra_headers: BTreeMap<String, String>,
    /// Optional request timeout.
    pub timeout: Option<Duration>,
}

impl Default for GroqApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_GROQ_BASE_URL.to_string(),
            user_agent: None,
            extra_headers: BTreeMap::new(),
            timeout: None,
        }
    }
}

impl GroqApiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn insert_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(key.into(), value.into());
        self
    }
}
