use std::future::Future;
use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;

use crate::config::GroqApiConfig;
use crate::error::{parse_error_message, GroqApiError};
use crate::headers::build_headers;
use crate::payload::{ChatCompletionRequest, ChatCompletionResponse};
use crate::url::normalize_chat_completions_url;

/// Optional cancellation signal shared with the awaiting caller.
pub type CancellationSignal = Arc<AtomicBool>;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug)]
pub struct GroqApiClient {
    http: Client,
    config: GroqApiConfig,
}

impl GroqApiClient {
    pub fn new(config: GroqApiConfig) -> Result<Self, GroqApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(GroqApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &GroqApiConfig {
        &self.config
    }

    pub fn normalized_endpoint(&self) -> String {
        normalize_chat_completions_url(&self.config.base_url)
    }

    pub fn build_headers(&self, user_agent: Option<&str>) -> Result<HeaderMap, GroqApiError> {
        let headers = build_headers(&self.config, user_agent)?;
        let mut out = HeaderMap::new();
        for (key, value) in headers {
            out.insert(
                HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| GroqApiError::InvalidHeader(format!("invalid header key: {key}")))?,
                HeaderValue::from_str(&value).map_err(|_| {
                    GroqApiError::InvalidHeader(format!("invalid header value for {key}"))
                })?,
            );
        }
        Ok(out)
    }

    pub fn build_request(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<reqwest::RequestBuilder, GroqApiError> {
        validate_request(request)?;

        let headers = self.build_headers(self.config.user_agent.as_deref())?;
        let mut payload = request.clone();
        payload.stream = false;
        Ok(self
            .http
            .post(self.normalized_endpoint())
            .headers(headers)
            .json(&payload))
    }

    /// Sends one completion request. No retries are attempted.
    pub async fn complete(
        &self,
        request: &ChatCompletionRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<ChatCompletionResponse, GroqApiError> {
        if is_cancelled(cancellation) {
            return Err(GroqApiError::Cancelled);
        }

        let response = self.build_request(request)?.send();
        let response = await_or_cancel(response, cancellation)
            .await?
            .map_err(GroqApiError::from)?;

        let status = response.status();
        let body = await_or_cancel(response.text(), cancellation).await?;

        if !status.is_success() {
            let body = body.unwrap_or_default();
            return Err(GroqApiError::Status(
                status,
                parse_error_message(status, &body),
            ));
        }

        let body = body.map_err(GroqApiError::from)?;
        serde_json::from_str(&body).map_err(GroqApiError::from)
    }
}

fn validate_request(request: &ChatCompletionRequest) -> Result<(), GroqApiError> {
    if request.model.trim().is_empty() {
        return Err(GroqApiError::InvalidRequest(
            "'model' must be a non-empty string".to_string(),
        ));
    }
    if request.messages.is_empty() {
        return Err(GroqApiError::InvalidRequest(
            "'messages' must contain at least one message".to_string(),
        ));
    }
    Ok(())
}

fn is_cancelled(cancel: Option<&CancellationSignal>) -> bool {
    cancel.is_some_and(|token| token.load(Ordering::Acquire))
}

async fn await_or_cancel<F>(
    future: F,
    cancellation: Option<&CancellationSignal>,
) -> Result<F::Output, GroqApiError>
where
    F: Future,
{
    if cancellation.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancellation) {
            return Err(GroqApiError::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancellation) {
                return Err(GroqApiError::Cancelled);
            }
            return Ok(output);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_request_rejects_blank_model() {
        let request = ChatCompletionRequest::new("  ", "sys", "user");
        let error = validate_request(&request).expect_err("blank model");
        assert!(error.to_string().contains("'model'"));
    }

    #[test]
    fn validate_request_rejects_empty_messages() {
        let mut request = ChatCompletionRequest::new("m", "sys", "user");
        request.messages.clear();
        assert!(matches!(
            validate_request(&request),
            Err(GroqApiError::InvalidRequest(_))
        ));
    }

    #[test]
    fn is_cancelled_reads_the_shared_flag() {
        let signal: CancellationSignal = Arc::new(AtomicBool::new(false));
        assert!(!is_cancelled(Some(&signal)));
        signal.store(true, Ordering::Release);
        assert!(is_cancelled(Some(&signal)));
        assert!(!is_cancelled(None));
    }

    #[tokio::test]
    async fn await_or_cancel_returns_output_when_not_cancelled() {
        let signal: CancellationSignal = Arc::new(AtomicBool::new(false));
        let output = await_or_cancel(async { 7 }, Some(&signal))
            .await
            .expect("not cancelled");
        assert_eq!(output, 7);
    }

    #[tokio::test]
    async fn await_or_cancel_stops_waiting_once_flag_is_set() {
        let signal: CancellationSignal = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&signal);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(40)).await;
            flag.store(true, Ordering::Release);
        });

        let result = await_or_cancel(std::future::pending::<()>(), Some(&signal)).await;
        assert!(matches!(result, Err(GroqApiError::Cancelled)));
    }

    #[tokio::test]
    async fn complete_short_circuits_when_already_cancelled() {
        let client = GroqApiClient::new(GroqApiConfig::new("key")).expect("client");
        let signal: CancellationSignal = Arc::new(AtomicBool::new(true));
        let request = ChatCompletionRequest::new("m", "sys", "user");

        let result = client.complete(&request, Some(&signal)).await;
        assert!(matches!(result, Err(GroqApiError::Cancelled)));
    }
}
