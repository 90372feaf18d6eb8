//! JSON extraction and validation for model replies.
//!
//! Models asked for JSON still wrap it in code fences or prose now and then.
//! The reply is reduced to the span between the first `{` and the last `}`
//! before parsing, and parsed scores are checked against the exam's range.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use crate::domain::exam::ExamType;

use super::{BasicAnalysis, DetailAnalysis, FullAnalysis, Score};

/// Why a reply could not be used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("reply contains no JSON object")]
    NoJson,
    #[error("reply JSON does not match the expected shape: {0}")]
    Malformed(String),
    #[error("{criterion} score {value} exceeds {max}")]
    ScoreOutOfRange {
        criterion: &'static str,
        value: u32,
        max: u32,
    },
    #[error("reply content was rejected: {0}")]
    Rejected(String),
}

/// Remove markdown code fences, keeping their content.
pub fn strip_code_fences(reply: &str) -> String {
    reply.replace("```json", "").replace("```", "").trim().to_owned()
}

/// Return the span from the first `{` to the last `}`.
///
/// # Examples
/// ```
/// use edulens::domain::grading::extract_json_object;
///
/// let reply = "```json\n{\"a\": {\"b\": 1}}\n```\nHope this helps!";
/// assert_eq!(extract_json_object(reply).as_deref(), Some("{\"a\": {\"b\": 1}}"));
/// ```
pub fn extract_json_object(reply: &str) -> Option<String> {
    let cleaned = strip_code_fences(reply);
    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    (start < end).then(|| cleaned[start..=end].to_owned())
}

/// Grading outputs that carry checks beyond their JSON shape.
pub trait GradedOutput: DeserializeOwned {
    /// Check ranges and normalise derived fields.
    fn validate(&mut self, exam_type: ExamType) -> Result<(), ExtractError>;
}

impl Score {
    /// Check every criterion and recompute the total from them.
    pub fn validate(&mut self, exam_type: ExamType) -> Result<(), ExtractError> {
        let max = exam_type.criterion_max();
        for (criterion, value) in [
            ("content", self.content),
            ("structure", self.structure),
            ("vocabulary", self.vocabulary),
            ("grammar", self.grammar),
        ] {
            if value > max {
                return Err(ExtractError::ScoreOutOfRange {
                    criterion,
                    value,
                    max,
                });
            }
        }
        self.total = self.content + self.structure + self.vocabulary + self.grammar;
        Ok(())
    }
}

impl GradedOutput for BasicAnalysis {
    fn validate(&mut self, exam_type: ExamType) -> Result<(), ExtractError> {
        self.score.validate(exam_type)
    }
}

impl GradedOutput for FullAnalysis {
    fn validate(&mut self, exam_type: ExamType) -> Result<(), ExtractError> {
        self.score.validate(exam_type)
    }
}

impl GradedOutput for DetailAnalysis {
    fn validate(&mut self, _exam_type: ExamType) -> Result<(), ExtractError> {
        Ok(())
    }
}

/// Extract and parse the JSON object of one reply.
pub fn parse_json<T: DeserializeOwned>(reply: &str) -> Result<T, ExtractError> {
    let json = extract_json_object(reply).ok_or(ExtractError::NoJson)?;
    serde_json::from_str(&json).map_err(|err| ExtractError::Malformed(err.to_string()))
}

/// Extract, parse, and validate one reply.
pub fn parse_reply<T: GradedOutput>(reply: &str, exam_type: ExamType) -> Result<T, ExtractError> {
    let mut parsed: T = parse_json(reply)?;
    parsed.validate(exam_type)?;
    Ok(parsed)
}

/// Accept a string, a number, or null for free-text fields.
pub(super) fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(text)) => Some(text).filter(|t| !t.trim().is_empty()),
        Some(other) => Some(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const BODY: &str = r#"{"transcribed_text":"I agree.","topic_recognition":"","detected_word_limit":80,"score":{"content":3,"structure":2,"vocabulary":2,"grammar":1,"total":99},"is_passing_level":false}"#;

    #[rstest]
    #[case::bare(BODY.to_owned())]
    #[case::fenced(format!("```json\n{BODY}\n```"))]
    #[case::prose(format!("Sure! Here is the result:\n{BODY}\nGood luck."))]
    #[case::fenced_and_prose(format!("結果です\n```\n{BODY}\n```"))]
    fn extraction_ignores_wrapping(#[case] reply: String) {
        let parsed: BasicAnalysis =
            parse_reply(&reply, ExamType::Eiken).expect("reply should parse");
        assert_eq!(parsed.transcribed_text, "I agree.");
        assert_eq!(parsed.score.total, 8);
        assert_eq!(parsed.detected_word_limit.as_deref(), Some("80"));
        assert!(parsed.topic_recognition.is_none());
    }

    #[rstest]
    #[case::no_braces("I cannot grade this image.")]
    #[case::reversed("} nothing {")]
    fn replies_without_objects_fail(#[case] reply: &str) {
        assert_eq!(
            parse_reply::<BasicAnalysis>(reply, ExamType::Eiken),
            Err(ExtractError::NoJson)
        );
    }

    #[rstest]
    fn eiken_scores_above_four_are_rejected() {
        let reply = BODY.replace("\"content\":3", "\"content\":7");
        assert!(matches!(
            parse_reply::<BasicAnalysis>(&reply, ExamType::Eiken),
            Err(ExtractError::ScoreOutOfRange {
                criterion: "content",
                ..
            })
        ));
        let university: BasicAnalysis =
            parse_reply(&reply, ExamType::University).expect("within university range");
        assert_eq!(university.score.total, 12);
    }

    #[rstest]
    fn missing_fields_are_malformed() {
        assert!(matches!(
            parse_reply::<DetailAnalysis>("{\"advice\": \"a\"}", ExamType::Eiken),
            Err(ExtractError::Malformed(_))
        ));
    }
}
