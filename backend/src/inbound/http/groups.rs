//! Study group endpoints.
//!
//! ```text
//! POST  /api/groups {"name":"3年A組"}
//! GET   /api/groups
//! PATCH /api/groups/{id} {"name":"3年B組"}
//! POST  /api/groups/join {"inviteCode":"K7M2QX"}
//! GET   /api/groups/{id}/ranking
//! GET   /api/groups/ranking
//! ```

use actix_web::{HttpResponse, get, patch, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Error;
use crate::domain::groups::{Group, RankingEntry};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::CurrentViewer;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_uuid, require_text};

const NAME: FieldName = FieldName::new("name");
const INVITE_CODE: FieldName = FieldName::new("inviteCode");
const GROUP_ID: FieldName = FieldName::new("id");

/// A study group.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupDto {
    pub id: Uuid,
    pub name: String,
    pub invite_code: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<Group> for GroupDto {
    fn from(group: Group) -> Self {
        Self {
            id: group.id,
            name: group.name,
            invite_code: group.invite_code,
            owner_id: *group.owner_id.as_uuid(),
            created_at: group.created_at,
        }
    }
}

/// Body for creating or renaming a group.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct GroupNameRequest {
    pub name: Option<String>,
}

/// Body for `POST /api/groups/join`.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinGroupRequest {
    pub invite_code: Option<String>,
}

/// Join result.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct JoinGroupResponse {
    pub group: GroupDto,
    /// False when the caller was already a member.
    pub joined: bool,
}

/// Create a group owned by the caller.
#[utoipa::path(
    post,
    path = "/api/groups",
    request_body = GroupNameRequest,
    responses(
        (status = 201, description = "Created group", body = GroupDto),
        (status = 400, description = "Invalid name", body = Error),
        (status = 401, description = "Login required", body = Error)
    ),
    tags = ["groups"],
    operation_id = "createGroup"
)]
#[post("/groups")]
pub async fn create_group(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
    payload: web::Json<GroupNameRequest>,
) -> ApiResult<HttpResponse> {
    let name = require_text(payload.into_inner().name, NAME)?;
    let group = state.groups.create(viewer.0.user_id, &name).await?;
    Ok(HttpResponse::Created().json(GroupDto::from(group)))
}

/// Groups the caller owns or has joined.
#[utoipa::path(
    get,
    path = "/api/groups",
    responses(
        (status = 200, description = "Groups", body = [GroupDto]),
        (status = 401, description = "Login required", body = Error)
    ),
    tags = ["groups"],
    operation_id = "listGroups"
)]
#[get("/groups")]
pub async fn list_groups(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
) -> ApiResult<web::Json<Vec<GroupDto>>> {
    let groups = state.groups.list(&viewer.0.user_id).await?;
    Ok(web::Json(groups.into_iter().map(GroupDto::from).collect()))
}

/// Join a group with its invite code. Joining twice is harmless.
#[utoipa::path(
    post,
    path = "/api/groups/join",
    request_body = JoinGroupRequest,
    responses(
        (status = 200, description = "Membership", body = JoinGroupResponse),
        (status = 400, description = "Malformed code", body = Error),
        (status = 401, description = "Login required", body = Error),
        (status = 404, description = "Unknown code", body = Error)
    ),
    tags = ["groups"],
    operation_id = "joinGroup"
)]
#[post("/groups/join")]
pub async fn join_group(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
    payload: web::Json<JoinGroupRequest>,
) -> ApiResult<web::Json<JoinGroupResponse>> {
    let code = require_text(payload.into_inner().invite_code, INVITE_CODE)?;
    let outcome = state.groups.join(viewer.0.user_id, &code).await?;
    Ok(web::Json(JoinGroupResponse {
        group: outcome.group.into(),
        joined: outcome.joined,
    }))
}

/// Ranking across every group the caller belongs to.
#[utoipa::path(
    get,
    path = "/api/groups/ranking",
    responses(
        (status = 200, description = "Members by test count"),
        (status = 401, description = "Login required", body = Error)
    ),
    tags = ["groups"],
    operation_id = "overallRanking"
)]
#[get("/groups/ranking")]
pub async fn overall_ranking(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
) -> ApiResult<web::Json<Vec<RankingEntry>>> {
    let ranking = state.groups.overall_ranking(&viewer.0.user_id).await?;
    Ok(web::Json(ranking))
}

/// Rename a group. Owner only.
#[utoipa::path(
    patch,
    path = "/api/groups/{id}",
    params(("id" = Uuid, Path, description = "Group id")),
    request_body = GroupNameRequest,
    responses(
        (status = 200, description = "Renamed group", body = GroupDto),
        (status = 400, description = "Invalid name", body = Error),
        (status = 403, description = "Not the owner", body = Error),
        (status = 404, description = "Unknown group", body = Error)
    ),
    tags = ["groups"],
    operation_id = "renameGroup"
)]
#[patch("/groups/{id}")]
pub async fn rename_group(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
    path: web::Path<String>,
    payload: web::Json<GroupNameRequest>,
) -> ApiResult<web::Json<GroupDto>> {
    let id = parse_uuid(&path.into_inner(), GROUP_ID)?;
    let name = require_text(payload.into_inner().name, NAME)?;
    let group = state.groups.rename(&viewer.0.user_id, &id, &name).await?;
    Ok(web::Json(group.into()))
}

/// Members ranked by test count. Members only.
#[utoipa::path(
    get,
    path = "/api/groups/{id}/ranking",
    params(("id" = Uuid, Path, description = "Group id")),
    responses(
        (status = 200, description = "Members by test count"),
        (status = 403, description = "Not a member", body = Error),
        (status = 404, description = "Unknown group", body = Error)
    ),
    tags = ["groups"],
    operation_id = "groupRanking"
)]
#[get("/groups/{id}/ranking")]
pub async fn group_ranking(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
    path: web::Path<String>,
) -> ApiResult<web::Json<Vec<RankingEntry>>> {
    let id = parse_uuid(&path.into_inner(), GROUP_ID)?;
    let ranking = state.groups.ranking(&viewer.0.user_id, &id).await?;
    Ok(web::Json(ranking))
}
