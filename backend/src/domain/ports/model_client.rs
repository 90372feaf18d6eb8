//! Port for the generative model behind grading and chat.
//!
//! Adapters translate a [`ModelPrompt`] into the provider's wire format. The
//! domain never sees provider DTOs; it only hands over text turns with
//! optional inline images and reads text back.

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};

use super::define_port_error;

define_port_error! {
    /// Errors raised by model adapters.
    pub enum ModelClientError {
        /// Network failure or unexpected upstream status.
        Transport { message: String } => "model transport failed: {message}",
        /// Upstream throttled the request.
        RateLimited { message: String } => "model rate limited: {message}",
        /// Upstream did not answer in time.
        Timeout { message: String } => "model request timed out: {message}",
        /// Upstream rejected the request.
        InvalidRequest { message: String } => "model rejected request: {message}",
        /// Upstream answered with an unreadable payload.
        Decode { message: String } => "model response could not be decoded: {message}",
        /// Upstream returned no text.
        EmptyResponse => "model returned no text",
    }
}

/// Base64 media sent inline with a turn: a photo, or a PDF document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    /// Base64 payload without a data-URL prefix.
    pub data: String,
}

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Model,
}

/// One conversation turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelTurn {
    pub role: TurnRole,
    pub text: String,
    pub images: Vec<InlineImage>,
}

impl ModelTurn {
    /// A user turn with optional images.
    pub fn user(text: impl Into<String>, images: Vec<InlineImage>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
            images,
        }
    }

    /// A model turn.
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            text: text.into(),
            images: Vec::new(),
        }
    }
}

/// A complete request to the model.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModelPrompt {
    pub system: Option<String>,
    pub turns: Vec<ModelTurn>,
    /// Ask the model to answer with a JSON document.
    pub json_response: bool,
    /// Let the model ground its answer in a web search. Providers may not
    /// combine this with `json_response`.
    pub web_search: bool,
}

/// Incremental text from a streamed answer.
pub type TextStream = BoxStream<'static, Result<String, ModelClientError>>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Generate a complete answer.
    async fn generate(&self, prompt: &ModelPrompt) -> Result<String, ModelClientError>;

    /// Stream an answer as text chunks.
    async fn stream(&self, prompt: &ModelPrompt) -> Result<TextStream, ModelClientError>;
}

/// Canned answer that satisfies every grading schema.
const FIXTURE_ANALYSIS: &str = r#"{
  "transcribed_text": "I think students should read more books.",
  "topic_recognition": "読書の重要性",
  "detected_word_limit": null,
  "score": {"content": 2, "structure": 2, "vocabulary": 2, "grammar": 2, "total": 8},
  "is_passing_level": true,
  "corrections": [],
  "advice": "理由を二つ挙げると説得力が増します。",
  "model_answer": "I think students should read more books because reading broadens their views."
}"#;

/// Offline model used when no provider key is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureModelClient;

#[async_trait]
impl ModelClient for FixtureModelClient {
    async fn generate(&self, _prompt: &ModelPrompt) -> Result<String, ModelClientError> {
        Ok(FIXTURE_ANALYSIS.to_owned())
    }

    async fn stream(&self, _prompt: &ModelPrompt) -> Result<TextStream, ModelClientError> {
        let chunks = ["いい質問だね！", "まずは問題文を一緒に読んでみよう。"];
        Ok(stream::iter(chunks.map(|chunk| Ok(chunk.to_owned()))).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::TryStreamExt;

    #[tokio::test]
    async fn fixture_answer_is_json() {
        let answer = FixtureModelClient
            .generate(&ModelPrompt::default())
            .await
            .expect("fixture answer");
        let value: serde_json::Value = serde_json::from_str(&answer).expect("valid json");
        assert_eq!(value["score"]["total"], 8);
    }

    #[tokio::test]
    async fn fixture_stream_yields_text() {
        let chunks: Vec<String> = FixtureModelClient
            .stream(&ModelPrompt::default())
            .await
            .expect("stream")
            .try_collect()
            .await
            .expect("chunks");
        assert_eq!(chunks.len(), 2);
    }
}
