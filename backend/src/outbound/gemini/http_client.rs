//! Reqwest-backed Gemini model adapter.
//!
//! This adapter owns transport details only: request serialisation, timeout
//! and HTTP error mapping, and decoding replies (whole or streamed) into text.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use reqwest::{Client, StatusCode, Url};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::dto::{GenerateRequestDto, GenerateResponseDto};
use super::sse::SseDecoder;
use crate::outbound::http_support::status_message;
use crate::domain::ports::{ModelClient, ModelClientError, ModelPrompt, TextStream};

/// Model used when none is configured.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
/// Public Generative Language API root.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";
const API_KEY_HEADER: &str = "x-goog-api-key";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Gemini adapter performing `generateContent` and `streamGenerateContent`
/// calls against one model.
pub struct GeminiHttpClient {
    client: Client,
    generate_url: Url,
    stream_url: Url,
    api_key: Zeroizing<String>,
    request_timeout: Duration,
}

impl GeminiHttpClient {
    /// Build an adapter for `model` under `base_url`.
    ///
    /// `request_timeout` bounds complete generations; streams are bounded by
    /// the connect timeout only so long answers are not cut off.
    ///
    /// # Errors
    ///
    /// Returns an error when the URL cannot be joined or the reqwest client
    /// cannot be constructed.
    pub fn new(
        base_url: &Url,
        model: &str,
        api_key: Zeroizing<String>,
        request_timeout: Duration,
    ) -> Result<Self, ModelClientError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|err| ModelClientError::transport(err.to_string()))?;
        let join = |suffix: &str| {
            base_url
                .join(&format!("models/{model}:{suffix}"))
                .map_err(|err| ModelClientError::invalid_request(format!("invalid model url: {err}")))
        };
        Ok(Self {
            client,
            generate_url: join("generateContent")?,
            stream_url: join("streamGenerateContent?alt=sse")?,
            api_key,
            request_timeout,
        })
    }

    async fn post(
        &self,
        url: &Url,
        prompt: &ModelPrompt,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response, ModelClientError> {
        let mut request = self
            .client
            .post(url.clone())
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(&GenerateRequestDto::from_prompt(prompt));
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.bytes().await.map_err(map_transport_error)?;
        Err(map_status_error(status, body.as_ref()))
    }
}

#[async_trait]
impl ModelClient for GeminiHttpClient {
    async fn generate(&self, prompt: &ModelPrompt) -> Result<String, ModelClientError> {
        let response = self
            .post(&self.generate_url, prompt, Some(self.request_timeout))
            .await?;
        let body = response.bytes().await.map_err(map_transport_error)?;
        let text = parse_text(body.as_ref())?;
        if text.trim().is_empty() {
            return Err(ModelClientError::empty_response());
        }
        debug!(chars = text.chars().count(), "model reply received");
        Ok(text)
    }

    async fn stream(&self, prompt: &ModelPrompt) -> Result<TextStream, ModelClientError> {
        let response = self.post(&self.stream_url, prompt, None).await?;
        let state = StreamState {
            bytes: response
                .bytes_stream()
                .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
                .boxed(),
            decoder: SseDecoder::default(),
            pending: VecDeque::new(),
            done: false,
        };
        Ok(stream::unfold(state, next_text).boxed())
    }
}

struct StreamState {
    bytes: BoxStream<'static, Result<Vec<u8>, reqwest::Error>>,
    decoder: SseDecoder,
    pending: VecDeque<Result<String, ModelClientError>>,
    done: bool,
}

async fn next_text(
    mut state: StreamState,
) -> Option<(Result<String, ModelClientError>, StreamState)> {
    loop {
        if let Some(item) = state.pending.pop_front() {
            return Some((item, state));
        }
        if state.done {
            return None;
        }
        match state.bytes.next().await {
            Some(Ok(chunk)) => {
                let payloads = state.decoder.push(&chunk);
                state.queue(payloads);
            }
            Some(Err(err)) => {
                warn!(error = %err, "model stream interrupted");
                state.done = true;
                return Some((Err(map_transport_error(err)), state));
            }
            None => {
                state.done = true;
                let tail = state.decoder.finish();
                state.queue(tail);
            }
        }
    }
}

impl StreamState {
    fn queue(&mut self, payloads: impl IntoIterator<Item = String>) {
        for payload in payloads {
            match parse_text(payload.as_bytes()) {
                Ok(text) if text.is_empty() => {}
                other => self.pending.push_back(other),
            }
        }
    }
}

fn parse_text(body: &[u8]) -> Result<String, ModelClientError> {
    let decoded: GenerateResponseDto = serde_json::from_slice(body).map_err(|error| {
        ModelClientError::decode(format!("invalid Gemini JSON payload: {error}"))
    })?;
    if let Some(reason) = decoded.block_reason() {
        return Err(ModelClientError::invalid_request(format!(
            "prompt blocked: {reason}"
        )));
    }
    Ok(decoded.into_text())
}

fn map_transport_error(error: reqwest::Error) -> ModelClientError {
    if error.is_timeout() {
        ModelClientError::timeout(error.to_string())
    } else {
        ModelClientError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> ModelClientError {
    let message = status_message(status, body);

    match status {
        StatusCode::TOO_MANY_REQUESTS => ModelClientError::rate_limited(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            ModelClientError::timeout(message)
        }
        _ if status.is_client_error() => ModelClientError::invalid_request(message),
        _ => ModelClientError::transport(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::rate_limited(StatusCode::TOO_MANY_REQUESTS, "rate_limited")]
    #[case::gateway_timeout(StatusCode::GATEWAY_TIMEOUT, "timeout")]
    #[case::bad_request(StatusCode::BAD_REQUEST, "invalid_request")]
    #[case::server_error(StatusCode::SERVICE_UNAVAILABLE, "transport")]
    fn maps_http_statuses(#[case] status: StatusCode, #[case] expected: &str) {
        let error = map_status_error(status, b"{\"error\":{\"message\":\"quota\"}}");
        let kind = match error {
            ModelClientError::RateLimited { .. } => "rate_limited",
            ModelClientError::Timeout { .. } => "timeout",
            ModelClientError::InvalidRequest { .. } => "invalid_request",
            ModelClientError::Transport { .. } => "transport",
            _ => "other",
        };
        assert_eq!(kind, expected);
    }

    #[test]
    fn blocked_prompt_is_rejected() {
        let body = br#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        assert!(matches!(
            parse_text(body),
            Err(ModelClientError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn builds_model_urls() {
        let base = Url::parse(DEFAULT_GEMINI_BASE_URL).expect("base url");
        let client = GeminiHttpClient::new(
            &base,
            DEFAULT_GEMINI_MODEL,
            Zeroizing::new("key".to_owned()),
            Duration::from_secs(30),
        )
        .expect("client builds");

        assert_eq!(
            client.generate_url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
        assert_eq!(client.stream_url.query(), Some("alt=sse"));
    }

    #[test]
    fn stream_state_skips_empty_chunks() {
        let mut state = StreamState {
            bytes: stream::empty().boxed(),
            decoder: SseDecoder::default(),
            pending: VecDeque::new(),
            done: false,
        };
        state.queue([
            r#"{"candidates":[{"content":{"parts":[{"text":""}]}}]}"#.to_owned(),
            r#"{"candidates":[{"content":{"parts":[{"text":"やあ"}]}}]}"#.to_owned(),
        ]);
        assert_eq!(state.pending.len(), 1);
    }
}
