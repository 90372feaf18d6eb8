//! Community board endpoints.
//!
//! ```text
//! GET    /api/community/posts?limit=20&offset=0
//! GET    /api/community/posts/{id}
//! POST   /api/community/posts {"title":"質問","body":"..."}
//! POST   /api/community/posts {"body":"返信","parentId":"..."}
//! DELETE /api/community/posts/{id}
//! ```

use actix_web::{HttpResponse, delete, get, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Error;
use crate::domain::community::{CommunityPost, ThreadSummary};
use crate::domain::community_service::NewPost;
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::CurrentViewer;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_optional_uuid, parse_uuid};

const ID: FieldName = FieldName::new("id");
const PARENT_ID: FieldName = FieldName::new("parentId");

/// A post or reply.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostDto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub author_name: String,
    pub title: Option<String>,
    pub body: String,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<CommunityPost> for PostDto {
    fn from(post: CommunityPost) -> Self {
        Self {
            id: post.id,
            user_id: *post.user_id.as_uuid(),
            author_name: post.author_name,
            title: post.title,
            body: post.body,
            parent_id: post.parent_id,
            created_at: post.created_at,
        }
    }
}

/// A thread starter with its reply count.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ThreadSummaryDto {
    #[serde(flatten)]
    pub post: PostDto,
    pub reply_count: i64,
}

impl From<ThreadSummary> for ThreadSummaryDto {
    fn from(summary: ThreadSummary) -> Self {
        Self {
            post: summary.post.into(),
            reply_count: summary.reply_count,
        }
    }
}

/// A thread with its replies.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ThreadDto {
    pub post: PostDto,
    pub replies: Vec<PostDto>,
}

/// Paging for the thread list.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct PageQuery {
    /// Defaults to 20, capped at 100.
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Body for a new thread or reply.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    /// Ignored for replies.
    pub title: Option<String>,
    #[serde(default)]
    pub body: String,
    pub parent_id: Option<String>,
}

/// Thread starters, newest first, with reply counts.
#[utoipa::path(
    get,
    path = "/api/community/posts",
    params(PageQuery),
    responses((status = 200, description = "Threads", body = [ThreadSummaryDto])),
    tags = ["community"],
    operation_id = "listThreads",
    security([])
)]
#[get("/community/posts")]
pub async fn list_threads(
    state: web::Data<HttpState>,
    query: web::Query<PageQuery>,
) -> ApiResult<web::Json<Vec<ThreadSummaryDto>>> {
    let threads = state.community.threads(query.limit, query.offset).await?;
    Ok(web::Json(
        threads.into_iter().map(ThreadSummaryDto::from).collect(),
    ))
}

/// A thread with replies, oldest first.
#[utoipa::path(
    get,
    path = "/api/community/posts/{id}",
    params(("id" = Uuid, Path, description = "Thread id")),
    responses(
        (status = 200, description = "Thread", body = ThreadDto),
        (status = 404, description = "Unknown thread", body = Error)
    ),
    tags = ["community"],
    operation_id = "getThread",
    security([])
)]
#[get("/community/posts/{id}")]
pub async fn get_thread(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<ThreadDto>> {
    let id = parse_uuid(&path.into_inner(), ID)?;
    let thread = state.community.thread(&id).await?;
    Ok(web::Json(ThreadDto {
        post: thread.post.into(),
        replies: thread.replies.into_iter().map(PostDto::from).collect(),
    }))
}

/// Start a thread or reply to one. Replies to replies are refused.
#[utoipa::path(
    post,
    path = "/api/community/posts",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Created post", body = PostDto),
        (status = 400, description = "Invalid post or nested reply", body = Error),
        (status = 401, description = "Login required", body = Error),
        (status = 404, description = "Unknown parent", body = Error)
    ),
    tags = ["community"],
    operation_id = "createPost"
)]
#[post("/community/posts")]
pub async fn create_post(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
    payload: web::Json<CreatePostRequest>,
) -> ApiResult<HttpResponse> {
    let body = payload.into_inner();
    let draft = NewPost {
        parent_id: parse_optional_uuid(body.parent_id.as_deref(), PARENT_ID)?,
        title: body.title,
        body: body.body,
    };
    let post = state.community.create(&viewer.0, draft).await?;
    Ok(HttpResponse::Created().json(PostDto::from(post)))
}

/// Delete a post and its replies. Author or admin only.
#[utoipa::path(
    delete,
    path = "/api/community/posts/{id}",
    params(("id" = Uuid, Path, description = "Post id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not the author", body = Error),
        (status = 404, description = "Unknown post", body = Error)
    ),
    tags = ["community"],
    operation_id = "deletePost"
)]
#[delete("/community/posts/{id}")]
pub async fn delete_post(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = parse_uuid(&path.into_inner(), ID)?;
    state.community.delete(&viewer.0, &id).await?;
    Ok(HttpResponse::NoContent().finish())
}
