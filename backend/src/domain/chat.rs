//! Naruhodo Lens tutoring chat.
//!
//! Clients post the whole conversation on every turn. Messages come from a
//! chat SDK whose shape varies between versions: text may sit in `content`
//! or in `parts`, and images may arrive as attachments, file parts, or
//! content items. [`Conversation::from_json`] accepts all of them.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use super::grading::decode_image;
use super::ports::{InlineImage, ModelClient, ModelClientError, ModelPrompt, ModelTurn, TextStream};
use super::quota::{ChatMeter, QuotaService};
use super::{Error, PlanTier, Viewer};

/// Persona and teaching flow for the tutor.
pub const SYSTEM_PROMPT: &str = "# あなたの役割
あなたは学習支援AI「ナルホドレンズ」です。
親しみやすい先輩のような口調（「〜だよ」「〜だね」「〜かな？」）で、生徒が理解できるまで丁寧に教えます。

# 出力形式の絶対ルール（厳守）
1. マークダウン記法は一切禁止：太字、見出し、箇条書きなどの記号は使わず、改行と空行だけで構造を表現してください。
2. 数式は必ずLaTeX形式で出力し、インライン数式は $...$、独立した数式は $$...$$ で囲んでください。
3. 日本の教科書基準に従ってください。
4. 一次関数は $y = ax + b$、二次関数は $y = ax^2 + bx + c$、比例は $y = ax$ と表記してください。

# 進行フロー
## Phase 1: 画像認識と学年確認
学年が不明なら「問題を受け取ったよ！解説する前に、今の学年を教えてくれるかな？」と確認してください。

## Phase 1.5: 解説画像の分析
解説や答えの画像が含まれていれば、その解法に沿って解説し「送ってくれた解説の通りに説明するね！」と添えてください。
解法が学年範囲外なら、その旨を伝えて学年相応の解法を提案してください。

## Phase 2: 小問の構成確認
(1), (2) のように複数の小問がある場合はまとめて解説せず、「まずは(1)から解説するね！」と宣言して(1)だけに集中してください。

## Phase 3: ステップ・バイ・ステップ対話
小問を3〜5つのステップに分け、1ステップずつ出力して必ず「ここまで大丈夫？」で止めてください。
小問の最後のステップでも次に進むか尋ねず「ここまで大丈夫？」で終えてください。

## Phase 4: ユーザー反応への対応
「はい」なら次へ進み、「いいえ」なら現在のステップを噛み砕いて再説明してください。
否定的な反応が3回連続したら「ごめん、僕の説明だとこれが限界かも💦 先生に直接聞いてみてね！ [END]」と伝えて終了してください。
";

/// Name of the cookie that identifies a guest between requests.
pub const GUEST_COOKIE_NAME: &str = "naruhodo_guest_id";
/// Guest cookie lifetime in seconds (one year).
pub const GUEST_COOKIE_MAX_AGE_SECS: u64 = 31_536_000;

static BOT_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

/// Whether a user agent looks automated. Empty agents count as bots.
pub fn is_bot_user_agent(user_agent: &str) -> bool {
    if user_agent.trim().is_empty() {
        return true;
    }
    BOT_PATTERN
        .get_or_init(|| Regex::new(r"(?i)bot|crawler|spider|curl|wget|python-requests").ok())
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(user_agent))
}

/// Validation failures for a chat request body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversationError {
    #[error("messages are required")]
    MissingMessages,
}

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

/// One normalised chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
    /// Inline images that could be decoded.
    pub images: Vec<InlineImage>,
    /// Whether the client attached any image, decodable or not.
    pub has_image: bool,
}

/// A conversation as posted by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    /// Parse the `messages` array. System messages and unknown roles are
    /// dropped.
    pub fn from_json(messages: Option<&Value>) -> Result<Self, ConversationError> {
        let items = messages
            .and_then(Value::as_array)
            .ok_or(ConversationError::MissingMessages)?;
        Ok(Self {
            messages: items.iter().filter_map(parse_message).collect(),
        })
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Only questions that carry an image are metered.
    pub fn last_has_image(&self) -> bool {
        self.messages.last().is_some_and(|message| message.has_image)
    }

    /// Render the conversation for the model.
    pub fn to_prompt(&self) -> ModelPrompt {
        ModelPrompt {
            system: Some(SYSTEM_PROMPT.to_owned()),
            turns: self
                .messages
                .iter()
                .map(|message| match message.role {
                    ChatRole::User => ModelTurn::user(message.text.clone(), message.images.clone()),
                    ChatRole::Assistant => ModelTurn::model(message.text.clone()),
                })
                .collect(),
            ..ModelPrompt::default()
        }
    }
}

fn parse_message(value: &Value) -> Option<ChatMessage> {
    let role = match value.get("role").and_then(Value::as_str)? {
        "user" => ChatRole::User,
        "assistant" | "model" => ChatRole::Assistant,
        _ => return None,
    };

    let mut texts = Vec::new();
    let mut raw_images = Vec::new();
    let mut has_image = false;

    if let Some(attachments) = value.get("experimental_attachments").and_then(Value::as_array) {
        has_image |= !attachments.is_empty();
        raw_images.extend(attachments.iter().filter_map(|a| a.get("url")).filter_map(Value::as_str));
    }

    if let Some(parts) = value.get("parts").and_then(Value::as_array) {
        for part in parts {
            match part.get("type").and_then(Value::as_str) {
                Some("text") => texts.extend(part.get("text").and_then(Value::as_str)),
                Some("file" | "image") => {
                    has_image = true;
                    raw_images.extend(image_source(part));
                }
                _ => {}
            }
        }
    }

    match value.get("content") {
        Some(Value::String(text)) => texts.push(text.as_str()),
        Some(Value::Array(items)) => {
            for item in items {
                if item.get("type").and_then(Value::as_str) == Some("text") {
                    texts.extend(item.get("text").and_then(Value::as_str));
                } else if is_image_item(item) {
                    has_image = true;
                    raw_images.extend(image_source(item));
                }
            }
        }
        _ => {}
    }

    let images = raw_images.into_iter().filter_map(decode_image).collect();
    Some(ChatMessage {
        role,
        text: texts.join("\n"),
        images,
        has_image,
    })
}

fn is_image_item(item: &Value) -> bool {
    item.get("type").and_then(Value::as_str) == Some("image")
        || item
            .get("mimeType")
            .and_then(Value::as_str)
            .is_some_and(|mime| mime.starts_with("image/"))
        || item.get("image").is_some()
}

fn image_source(item: &Value) -> Option<&str> {
    ["url", "image", "data"]
        .into_iter()
        .find_map(|key| item.get(key).and_then(Value::as_str))
}

/// Who is asking, as seen by the chat endpoint.
#[derive(Debug, Clone, Copy)]
pub struct ChatCaller<'a> {
    pub viewer: Option<&'a Viewer>,
    pub guest_id: &'a str,
    pub client_ip: &'a str,
    pub user_agent: &'a str,
}

/// Admission checks and streaming for the tutor.
#[derive(Clone)]
pub struct ChatService {
    model: Arc<dyn ModelClient>,
    quota: QuotaService,
}

impl ChatService {
    pub fn new(model: Arc<dyn ModelClient>, quota: QuotaService) -> Self {
        Self { model, quota }
    }

    /// Apply the bot filter, the burst guard, and, for image questions, the
    /// daily quota of the caller's tier.
    pub async fn admit(
        &self,
        conversation: &Conversation,
        caller: &ChatCaller<'_>,
    ) -> Result<(), Error> {
        if is_bot_user_agent(caller.user_agent) {
            debug!("chat request rejected by user-agent filter");
            return Err(Error::forbidden("Access Denied"));
        }
        self.quota.check_chat_burst(caller.client_ip).await?;
        if !conversation.last_has_image() {
            return Ok(());
        }

        let meter = match (PlanTier::for_viewer(caller.viewer), caller.viewer) {
            (PlanTier::Pro, Some(viewer)) => ChatMeter::Pro(viewer.user_id),
            (PlanTier::Free, Some(viewer)) => ChatMeter::Free(viewer.user_id),
            _ => ChatMeter::Guest {
                guest_id: caller.guest_id,
                client_ip: caller.client_ip,
            },
        };
        self.quota.check_chat_question(&meter).await
    }

    /// Stream the tutor's answer.
    pub async fn respond(&self, conversation: &Conversation) -> Result<TextStream, Error> {
        self.model
            .stream(&conversation.to_prompt())
            .await
            .map_err(map_model_error)
    }
}

fn map_model_error(error: ModelClientError) -> Error {
    warn!(%error, "chat model call failed");
    match error {
        ModelClientError::Transport { .. }
        | ModelClientError::RateLimited { .. }
        | ModelClientError::Timeout { .. } => {
            Error::service_unavailable("the tutor is temporarily unavailable")
        }
        _ => Error::internal("chat failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::{FixtureModelClient, MockRateLimiter, RateLimitDecision};
    use chrono::Utc;
    use rstest::rstest;
    use serde_json::json;

    const BROWSER: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)";

    #[rstest]
    #[case::empty("", true)]
    #[case::curl("curl/8.4.0", true)]
    #[case::googlebot("Mozilla/5.0 (compatible; Googlebot/2.1)", true)]
    #[case::requests("python-requests/2.31", true)]
    #[case::browser(BROWSER, false)]
    fn filters_automated_agents(#[case] agent: &str, #[case] expected: bool) {
        assert_eq!(is_bot_user_agent(agent), expected);
    }

    #[rstest]
    #[case::missing(None)]
    #[case::object(Some(json!({"role": "user"})))]
    fn messages_must_be_an_array(#[case] body: Option<Value>) {
        assert_eq!(
            Conversation::from_json(body.as_ref()),
            Err(ConversationError::MissingMessages)
        );
    }

    #[rstest]
    #[case::attachments(json!({"role": "user", "content": "これ", "experimental_attachments": [{"url": "data:image/png;base64,aGk=", "contentType": "image/png"}]}))]
    #[case::file_part(json!({"role": "user", "parts": [{"type": "text", "text": "これ"}, {"type": "file", "mediaType": "image/png", "url": "data:image/png;base64,aGk="}]}))]
    #[case::content_item(json!({"role": "user", "content": [{"type": "text", "text": "これ"}, {"type": "image", "image": "data:image/png;base64,aGk="}]}))]
    fn detects_images_in_every_message_shape(#[case] message: Value) {
        let body = json!([message]);
        let conversation = Conversation::from_json(Some(&body)).expect("valid messages");

        assert!(conversation.last_has_image());
        let last = &conversation.messages()[0];
        assert_eq!(last.text, "これ");
        assert_eq!(last.images.len(), 1);
        assert_eq!(last.images[0].mime_type, "image/png");
    }

    #[rstest]
    fn prompt_carries_persona_and_turns() {
        let body = json!([
            {"role": "system", "content": "ignored"},
            {"role": "user", "content": "問題です"},
            {"role": "assistant", "content": "学年を教えてね"},
            {"role": "user", "parts": [{"type": "text", "text": "中2"}]},
        ]);
        let conversation = Conversation::from_json(Some(&body)).expect("valid messages");
        let prompt = conversation.to_prompt();

        assert!(!conversation.last_has_image());
        assert_eq!(prompt.turns.len(), 3);
        assert_eq!(prompt.turns[1], ModelTurn::model("学年を教えてね"));
        assert!(prompt.system.as_deref().is_some_and(|s| s.contains("ナルホドレンズ")));
    }

    fn service(limiter: MockRateLimiter) -> ChatService {
        ChatService::new(
            Arc::new(FixtureModelClient),
            QuotaService::new(Arc::new(limiter), "https://mistap.jp"),
        )
    }

    fn allowed() -> RateLimitDecision {
        RateLimitDecision {
            allowed: true,
            limit: 10,
            remaining: 9,
            reset_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn bots_are_rejected_before_any_quota_hit() {
        let mut limiter = MockRateLimiter::new();
        limiter.expect_hit().never();
        let conversation = Conversation::from_json(Some(&json!([]))).expect("empty list");

        let error = service(limiter)
            .admit(
                &conversation,
                &ChatCaller {
                    viewer: None,
                    guest_id: "g",
                    client_ip: "10.0.0.1",
                    user_agent: "wget/1.21",
                },
            )
            .await
            .expect_err("bot rejected");

        assert_eq!(error.code(), ErrorCode::Forbidden);
        assert_eq!(error.message(), "Access Denied");
    }

    #[tokio::test]
    async fn text_questions_only_pass_the_burst_guard() {
        let mut limiter = MockRateLimiter::new();
        limiter
            .expect_hit()
            .withf(|rule, _| rule.prefix == "naruhodo_burst")
            .times(1)
            .returning(|_, _| Ok(allowed()));
        let body = json!([{"role": "user", "content": "こんにちは"}]);
        let conversation = Conversation::from_json(Some(&body)).expect("valid messages");

        service(limiter)
            .admit(
                &conversation,
                &ChatCaller {
                    viewer: None,
                    guest_id: "g",
                    client_ip: "10.0.0.1",
                    user_agent: BROWSER,
                },
            )
            .await
            .expect("admitted");
    }
}
