//! Blog endpoints backed by the CMS cache.
//!
//! ```text
//! GET  /api/blogs?limit=10&offset=0
//! GET  /api/blogs/{id}
//! POST /api/revalidate?secret=...        (or X-MICROCMS-Webhook-Signature)
//! ```

use actix_web::{HttpRequest, get, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Error;
use crate::domain::ports::{BlogPage, BlogPost};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;

const SIGNATURE_HEADER: &str = "x-microcms-webhook-signature";

/// Paging for `GET /api/blogs`.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct BlogListQuery {
    /// Defaults to 10, capped at 100.
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Query for `POST /api/revalidate`.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct RevalidateQuery {
    pub secret: Option<String>,
}

/// Result of a cache revalidation.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RevalidateResponse {
    pub revalidated: bool,
    pub now: DateTime<Utc>,
}

/// A page of published posts, newest first.
#[utoipa::path(
    get,
    path = "/api/blogs",
    params(BlogListQuery),
    responses(
        (status = 200, description = "Posts"),
        (status = 503, description = "CMS unavailable", body = Error)
    ),
    tags = ["blogs"],
    operation_id = "listBlogs",
    security([])
)]
#[get("/blogs")]
pub async fn list_blogs(
    state: web::Data<HttpState>,
    query: web::Query<BlogListQuery>,
) -> ApiResult<web::Json<BlogPage>> {
    let page = state.content.list(query.limit, query.offset).await?;
    Ok(web::Json(page))
}

#[utoipa::path(
    get,
    path = "/api/blogs/{id}",
    params(("id" = String, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post"),
        (status = 404, description = "Unknown post", body = Error)
    ),
    tags = ["blogs"],
    operation_id = "getBlog",
    security([])
)]
#[get("/blogs/{id}")]
pub async fn get_blog(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<BlogPost>> {
    let post = state.content.get(&path.into_inner()).await?;
    Ok(web::Json(post))
}

/// Drop cached CMS responses. Accepts the shared secret in the query or a
/// signed CMS webhook body.
#[utoipa::path(
    post,
    path = "/api/revalidate",
    params(RevalidateQuery),
    request_body = Vec<u8>,
    responses(
        (status = 200, description = "Cache cleared", body = RevalidateResponse),
        (status = 401, description = "Invalid token", body = Error)
    ),
    tags = ["blogs"],
    operation_id = "revalidateBlogs",
    security([])
)]
#[post("/revalidate")]
pub async fn revalidate(
    state: web::Data<HttpState>,
    req: HttpRequest,
    query: web::Query<RevalidateQuery>,
    body: web::Bytes,
) -> ApiResult<web::Json<RevalidateResponse>> {
    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    let now = state
        .content
        .revalidate(query.secret.as_deref(), signature, &body)?;
    Ok(web::Json(RevalidateResponse {
        revalidated: true,
        now,
    }))
}
