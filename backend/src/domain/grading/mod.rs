//! AI grading of handwritten English compositions.
//!
//! Each request is rendered into a prompt, sent to the model in JSON mode,
//! and the reply is extracted and validated. Unusable replies are retried a
//! bounded number of times with linear backoff; the caller only ever sees a
//! validated analysis or a generic internal error.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::domain::Error;
use crate::domain::exam::{ExamSettings, ExamType};
use crate::domain::ports::{InlineImage, ModelClient, ModelPrompt, ModelTurn};

mod extract;
pub mod prompts;
mod runtime;

pub use extract::{
    ExtractError, GradedOutput, extract_json_object, parse_json, parse_reply, strip_code_fences,
};
pub use runtime::{GenerationExhausted, RetryPolicy, RetryingGenerator, Sleeper, TokioSleeper};

/// Most images accepted per request.
pub const MAX_IMAGES: usize = 2;
const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// Four-criterion score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub content: u32,
    pub structure: u32,
    pub vocabulary: u32,
    pub grammar: u32,
    #[serde(default)]
    pub total: u32,
}

/// What a correction addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorrectionType {
    Grammar,
    Vocabulary,
    Structure,
    Content,
    #[serde(other)]
    Other,
}

/// One suggested fix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correction {
    pub original: String,
    pub fixed: String,
    #[serde(rename = "type")]
    pub kind: CorrectionType,
    #[serde(default)]
    pub explanation: String,
}

/// Transcription and quick score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicAnalysis {
    pub transcribed_text: String,
    #[serde(default, deserialize_with = "extract::lenient_string")]
    pub topic_recognition: Option<String>,
    #[serde(default, deserialize_with = "extract::lenient_string")]
    pub detected_word_limit: Option<String>,
    pub score: Score,
    #[serde(default)]
    pub is_passing_level: bool,
}

/// Corrections for already transcribed text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailAnalysis {
    #[serde(default)]
    pub corrections: Vec<Correction>,
    pub advice: String,
    pub model_answer: String,
}

/// Transcription, score, and corrections in one reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullAnalysis {
    pub transcribed_text: String,
    #[serde(default, deserialize_with = "extract::lenient_string")]
    pub topic_recognition: Option<String>,
    pub score: Score,
    #[serde(default)]
    pub is_passing_level: bool,
    #[serde(default)]
    pub corrections: Vec<Correction>,
    pub advice: String,
    pub model_answer: String,
}

/// Validation failures for grading input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    #[error("at least one image is required")]
    NoImages,
    #[error("at most {max} images are accepted")]
    TooManyImages { max: usize },
    #[error("image {index} is not valid base64")]
    InvalidImage { index: usize },
    #[error("transcribed text must not be empty")]
    EmptyText,
}

/// Split an optional `data:<mime>;base64,` prefix and check the payload.
///
/// # Examples
/// ```
/// use edulens::domain::grading::decode_image;
///
/// let image = decode_image("data:image/png;base64,aGVsbG8=").expect("valid image");
/// assert_eq!(image.mime_type, "image/png");
/// assert_eq!(image.data, "aGVsbG8=");
/// ```
pub fn decode_image(raw: &str) -> Option<InlineImage> {
    let raw = raw.trim();
    let (mime_type, data) = match raw.strip_prefix("data:") {
        Some(rest) => {
            let (header, data) = rest.split_once(',')?;
            let mime = header.strip_suffix(";base64")?;
            (Some(mime).filter(|m| !m.is_empty()), data)
        }
        None => (None, raw),
    };
    let decoded = STANDARD.decode(data).ok()?;
    if decoded.is_empty() {
        return None;
    }
    Some(InlineImage {
        mime_type: mime_type.unwrap_or(DEFAULT_IMAGE_MIME).to_owned(),
        data: data.to_owned(),
    })
}

/// Images plus exam settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSubmission {
    images: Vec<InlineImage>,
    settings: ExamSettings,
}

impl ImageSubmission {
    /// Validate the image count and encoding.
    pub fn new(raw_images: &[String], settings: ExamSettings) -> Result<Self, SubmissionError> {
        if raw_images.is_empty() {
            return Err(SubmissionError::NoImages);
        }
        if raw_images.len() > MAX_IMAGES {
            return Err(SubmissionError::TooManyImages { max: MAX_IMAGES });
        }
        let images = raw_images
            .iter()
            .enumerate()
            .map(|(index, raw)| decode_image(raw).ok_or(SubmissionError::InvalidImage { index }))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { images, settings })
    }

    pub fn images(&self) -> &[InlineImage] {
        &self.images
    }

    pub fn settings(&self) -> &ExamSettings {
        &self.settings
    }
}

/// Transcribed text plus exam settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSubmission {
    text: String,
    settings: ExamSettings,
}

impl TextSubmission {
    /// Reject blank text.
    pub fn new(text: &str, settings: ExamSettings) -> Result<Self, SubmissionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SubmissionError::EmptyText);
        }
        Ok(Self {
            text: text.to_owned(),
            settings,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn settings(&self) -> &ExamSettings {
        &self.settings
    }
}

/// Grading use-cases over a [`ModelClient`].
#[derive(Clone)]
pub struct GradingService {
    generator: RetryingGenerator,
}

impl GradingService {
    /// Service with Tokio sleeping and the default retry policy.
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self::with_runtime(model, Arc::new(TokioSleeper), RetryPolicy::default())
    }

    /// Service with injected sleeping and retry policy.
    pub fn with_runtime(
        model: Arc<dyn ModelClient>,
        sleeper: Arc<dyn Sleeper>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            generator: RetryingGenerator::new(model, sleeper, policy),
        }
    }

    /// Transcribe and quickly score.
    pub async fn analyze_basic(&self, submission: &ImageSubmission) -> Result<BasicAnalysis, Error> {
        let settings = submission.settings();
        let prompt = json_prompt(
            prompts::basic_prompt(settings),
            submission.images().to_vec(),
        );
        self.generate_validated(&prompt, settings.exam_type, "basic")
            .await
    }

    /// Correct already transcribed text.
    pub async fn analyze_detail(&self, submission: &TextSubmission) -> Result<DetailAnalysis, Error> {
        let settings = submission.settings();
        let prompt = json_prompt(
            prompts::detail_prompt(settings, submission.text()),
            Vec::new(),
        );
        self.generate_validated(&prompt, settings.exam_type, "detail")
            .await
    }

    /// Transcribe, score, and correct in one call.
    pub async fn analyze_full(&self, submission: &ImageSubmission) -> Result<FullAnalysis, Error> {
        let settings = submission.settings();
        let prompt = json_prompt(
            prompts::full_prompt(settings, submission.images().len()),
            submission.images().to_vec(),
        );
        self.generate_validated(&prompt, settings.exam_type, "full")
            .await
    }

    async fn generate_validated<T: GradedOutput + Send>(
        &self,
        prompt: &ModelPrompt,
        exam_type: ExamType,
        mode: &'static str,
    ) -> Result<T, Error> {
        self.generator
            .generate(prompt, mode, |reply| parse_reply::<T>(reply, exam_type))
            .await
            .map_err(|_| Error::internal("failed to generate a valid analysis"))
    }
}

fn json_prompt(text: String, images: Vec<InlineImage>) -> ModelPrompt {
    ModelPrompt {
        system: None,
        turns: vec![ModelTurn::user(text, images)],
        json_response: true,
        ..ModelPrompt::default()
    }
}

#[cfg(test)]
mod tests;
