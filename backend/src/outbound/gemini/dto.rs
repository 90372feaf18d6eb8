//! DTOs for the Gemini `generateContent` wire format.
//!
//! Requests borrow from the domain prompt; responses decode into transport
//! DTOs first and are reduced to plain text in one pass.

use serde::{Deserialize, Serialize};

use crate::domain::ports::{ModelPrompt, ModelTurn, TurnRole};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GenerateRequestDto<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) system_instruction: Option<ContentDto<'a>>,
    pub(super) contents: Vec<ContentDto<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) generation_config: Option<GenerationConfigDto>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(super) tools: Vec<ToolDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ToolDto {
    pub(super) google_search: GoogleSearchDto,
}

#[derive(Debug, Serialize)]
pub(super) struct GoogleSearchDto {}

#[derive(Debug, Serialize)]
pub(super) struct ContentDto<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) role: Option<&'static str>,
    pub(super) parts: Vec<PartDto<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(super) enum PartDto<'a> {
    Text {
        text: &'a str,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineDataDto<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct InlineDataDto<'a> {
    pub(super) mime_type: &'a str,
    pub(super) data: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GenerationConfigDto {
    pub(super) response_mime_type: &'static str,
}

impl<'a> GenerateRequestDto<'a> {
    pub(super) fn from_prompt(prompt: &'a ModelPrompt) -> Self {
        Self {
            system_instruction: prompt.system.as_deref().map(|text| ContentDto {
                role: None,
                parts: vec![PartDto::Text { text }],
            }),
            contents: prompt.turns.iter().map(turn_to_content).collect(),
            generation_config: prompt.json_response.then_some(GenerationConfigDto {
                response_mime_type: "application/json",
            }),
            tools: if prompt.web_search {
                vec![ToolDto {
                    google_search: GoogleSearchDto {},
                }]
            } else {
                Vec::new()
            },
        }
    }
}

fn turn_to_content(turn: &ModelTurn) -> ContentDto<'_> {
    let role = match turn.role {
        TurnRole::User => "user",
        TurnRole::Model => "model",
    };
    let mut parts = Vec::with_capacity(turn.images.len() + 1);
    if !turn.text.is_empty() {
        parts.push(PartDto::Text { text: &turn.text });
    }
    parts.extend(turn.images.iter().map(|image| PartDto::InlineData {
        inline_data: InlineDataDto {
            mime_type: &image.mime_type,
            data: &image.data,
        },
    }));
    ContentDto {
        role: Some(role),
        parts,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GenerateResponseDto {
    #[serde(default)]
    pub(super) candidates: Vec<CandidateDto>,
    pub(super) prompt_feedback: Option<PromptFeedbackDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CandidateDto {
    pub(super) content: Option<CandidateContentDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CandidateContentDto {
    #[serde(default)]
    pub(super) parts: Vec<CandidatePartDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CandidatePartDto {
    pub(super) text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PromptFeedbackDto {
    pub(super) block_reason: Option<String>,
}

impl GenerateResponseDto {
    /// Text of the first candidate, parts concatenated.
    pub(super) fn into_text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    pub(super) fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::InlineImage;
    use serde_json::json;

    #[test]
    fn serialises_system_turns_images_and_json_mode() {
        let prompt = ModelPrompt {
            system: Some("grade this".to_owned()),
            turns: vec![ModelTurn::user(
                "essay",
                vec![InlineImage {
                    mime_type: "image/png".to_owned(),
                    data: "AAAA".to_owned(),
                }],
            )],
            json_response: true,
            web_search: false,
        };

        let value = serde_json::to_value(GenerateRequestDto::from_prompt(&prompt))
            .expect("request serialises");

        assert_eq!(
            value,
            json!({
                "systemInstruction": {"parts": [{"text": "grade this"}]},
                "contents": [{
                    "role": "user",
                    "parts": [
                        {"text": "essay"},
                        {"inlineData": {"mimeType": "image/png", "data": "AAAA"}}
                    ]
                }],
                "generationConfig": {"responseMimeType": "application/json"}
            })
        );
    }

    #[test]
    fn web_search_adds_the_search_tool() {
        let prompt = ModelPrompt {
            turns: vec![ModelTurn::user("find it", Vec::new())],
            web_search: true,
            ..ModelPrompt::default()
        };

        let value = serde_json::to_value(GenerateRequestDto::from_prompt(&prompt))
            .expect("request serialises");

        assert_eq!(value["tools"], json!([{"googleSearch": {}}]));
        assert!(value.get("generationConfig").is_none());
    }

    #[test]
    fn concatenates_first_candidate_parts() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"{\"a\":"},{"text":"1}"}]}}]}"#;
        let decoded: GenerateResponseDto = serde_json::from_str(body).expect("decodes");
        assert_eq!(decoded.into_text(), "{\"a\":1}");
    }
}
