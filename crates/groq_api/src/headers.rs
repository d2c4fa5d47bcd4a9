use std::collections::BTreeMap;

use crate::config::GroqApiConfig;
use crate::error::GroqApiError;

pub const HEADER_ACCEPT: &str = "accept";
pub const HEADER_CONTENT_TYPE: &str = "content-type";
pub const HEADER_AUTHORIZATION: &str = "authorization";
pub const HEADER_USER_AGENT: &str = "user-agent";

/// Build a deterministic header map for Groq transport requests.
pub fn build_headers(
    config: &GroqApiConfig,
    user_agent: Option<&str>,
) -> Result<BTreeMap<String, String>, GroqApiError> {
    let api_key = config.api_key.trim();
    if api_key.is_empty() {
        return Err(GroqApiError::MissingApiKey);
    }

    let mut headers = BTreeMap::new();
    headers.insert(HEADER_AUTHORIZATION.to_owned(), format!("Bearer {api_key}"));
    headers.insert(HEADER_ACCEPT.to_owned(), "application/json".to_owned());
    headers.insert(
        HEADER_CONTENT_TYPE.to_owned(),
        "application/json".to_owned(),
    );

    let ua = match (user_agent, config.user_agent.as_deref()) {
        (Some(explicit), _) if !explicit.trim().is_empty() => explicit.trim().to_owned(),
        (None, Some(explicit)) if !explicit.trim().is_empty() => explicit.trim().to_owned(),
        _ => default_user_agent(),
    };
    headers.insert(HEADER_USER_AGENT.to_owned(), ua);

    for (key, value) in &config.extra_headers {
        headers.insert(key.trim().to_ascii_lowercase(), value.trim().to_owned());
    }

    Ok(headers)
}

fn default_user_agent() -> String {
    format!(
        "mutation-wheel/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_is_rejected_at_build_time() {
        let error = build_headers(&GroqApiConfig::new("   "), None).expect_err("empty key");
        assert!(matches!(error, GroqApiError::MissingApiKey));
        assert_eq!(error.to_string(), "Missing GROQ_API_KEY");
    }

    #[test]
    fn explicit_user_agent_wins_over_config() {
        let config = GroqApiConfig::new("key").with_user_agent("configured");
        let headers = build_headers(&config, Some("explicit")).expect("headers");
        assert_eq!(headers[HEADER_USER_AGENT], "explicit");

        let headers = build_headers(&config, None).expect("headers");
        assert_eq!(headers[HEADER_USER_AGENT], "configured");
    }

    #[test]
    fn default_user_agent_names_the_crate_version() {
        let headers = build_headers(&GroqApiConfig::new("key"), None).expect("headers");
        assert!(headers[HEADER_USER_AGENT].starts_with("mutation-wheel/"));
    }
}
