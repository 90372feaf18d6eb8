//! Streaming tutor chat.
//!
//! ```text
//! POST /api/naruhodo-lens/chat {"messages":[{"role":"user","content":"..."}]}
//! data: {"text":"..."}
//! data: [DONE]
//! ```

use std::convert::Infallible;

use actix_web::cookie::{Cookie, SameSite, time::Duration as CookieDuration};
use actix_web::web::Bytes;
use actix_web::{HttpRequest, HttpResponse, post, web};
use futures_util::{StreamExt, stream};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::Error;
use crate::domain::chat::{
    ChatCaller, Conversation, GUEST_COOKIE_MAX_AGE_SECS, GUEST_COOKIE_NAME,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::{bearer_token, resolve_viewer};
use crate::inbound::http::client::{client_ip, user_agent};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, missing_field_error};

const MESSAGES: FieldName = FieldName::new("messages");
const DONE_FRAME: &[u8] = b"data: [DONE]\n\n";

/// Chat request body. Messages are parsed leniently by the domain.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ChatRequest {
    #[schema(value_type = Object)]
    pub messages: Option<Value>,
    /// Access token for clients that cannot set headers on streaming calls.
    pub token: Option<String>,
}

fn sse_frame(payload: &Value) -> Bytes {
    Bytes::from(format!("data: {payload}\n\n"))
}

fn guest_cookie(id: &str) -> Cookie<'static> {
    let max_age = i64::try_from(GUEST_COOKIE_MAX_AGE_SECS).unwrap_or(i64::MAX);
    Cookie::build(GUEST_COOKIE_NAME, id.to_owned())
        .path("/")
        .max_age(CookieDuration::seconds(max_age))
        .same_site(SameSite::Lax)
        .finish()
}

/// Ask the tutor a question and stream the answer as Server-Sent Events.
#[utoipa::path(
    post,
    path = "/api/naruhodo-lens/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Event stream of text chunks", content_type = "text/event-stream"),
        (status = 400, description = "Missing messages", body = Error),
        (status = 403, description = "Automated client", body = Error),
        (status = 429, description = "Burst or daily limit reached", body = Error),
        (status = 503, description = "Tutor unavailable", body = Error)
    ),
    tags = ["chat"],
    operation_id = "chat"
)]
#[post("/naruhodo-lens/chat")]
pub async fn chat(
    state: web::Data<HttpState>,
    req: HttpRequest,
    payload: web::Json<ChatRequest>,
) -> ApiResult<HttpResponse> {
    let body = payload.into_inner();
    let conversation = Conversation::from_json(body.messages.as_ref())
        .map_err(|_| missing_field_error(MESSAGES))?;

    let token = body
        .token
        .filter(|token| !token.trim().is_empty())
        .or_else(|| bearer_token(&req));
    let viewer = resolve_viewer(&state, token.as_deref()).await?;

    let existing_guest = req
        .cookie(GUEST_COOKIE_NAME)
        .map(|cookie| cookie.value().to_owned())
        .filter(|value| !value.is_empty());
    let new_guest = match (&viewer, &existing_guest) {
        (None, None) => Some(Uuid::new_v4().to_string()),
        _ => None,
    };
    let guest_id = existing_guest
        .as_deref()
        .or(new_guest.as_deref())
        .unwrap_or_default();

    let ip = client_ip(&req);
    let agent = user_agent(&req);
    let caller = ChatCaller {
        viewer: viewer.as_ref(),
        guest_id,
        client_ip: &ip,
        user_agent: &agent,
    };
    state.chat.admit(&conversation, &caller).await?;

    let answer = state.chat.respond(&conversation).await?;
    let frames = answer
        .map(|chunk| {
            let frame = match chunk {
                Ok(text) => sse_frame(&json!({ "text": text })),
                Err(error) => {
                    warn!(%error, "chat stream interrupted");
                    sse_frame(&json!({ "error": "stream interrupted" }))
                }
            };
            Ok::<_, Infallible>(frame)
        })
        .chain(stream::once(async {
            Ok::<_, Infallible>(Bytes::from_static(DONE_FRAME))
        }));

    let mut response = HttpResponse::Ok();
    response
        .content_type("text/event-stream")
        .insert_header(("cache-control", "no-cache"));
    if let Some(id) = new_guest {
        debug!("issuing guest chat cookie");
        response.cookie(guest_cookie(&id));
    }
    Ok(response.streaming(frames))
}
