//! Site notices: public listing plus admin CRUD.
//!
//! ```text
//! GET    /api/announcements
//! GET    /api/admin/announcements
//! POST   /api/admin/announcements {"title":"メンテナンス","message":"...","type":"warning"}
//! PATCH  /api/admin/announcements/{id} {"isActive":false,"endDate":null}
//! DELETE /api/admin/announcements/{id}
//! ```

use actix_web::{HttpResponse, delete, get, patch, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::domain::Error;
use crate::domain::announcements::{Announcement, AnnouncementKind, AnnouncementPatch};
use crate::domain::announcements_service::NewAnnouncement;
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::CurrentViewer;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, invalid_value_error, parse_optional_rfc3339_timestamp, parse_rfc3339_timestamp,
    parse_uuid, require_text,
};

const ID: FieldName = FieldName::new("id");
const TITLE: FieldName = FieldName::new("title");
const MESSAGE: FieldName = FieldName::new("message");
const KIND: FieldName = FieldName::new("type");
const START_DATE: FieldName = FieldName::new("startDate");
const END_DATE: FieldName = FieldName::new("endDate");

/// A notice.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementDto {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    #[schema(value_type = String, example = "info")]
    pub kind: AnnouncementKind,
    pub is_active: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Announcement> for AnnouncementDto {
    fn from(value: Announcement) -> Self {
        Self {
            id: value.id,
            title: value.title,
            message: value.message,
            kind: value.kind,
            is_active: value.is_active,
            start_date: value.start_date,
            end_date: value.end_date,
            created_at: value.created_at,
        }
    }
}

fn dtos(items: Vec<Announcement>) -> Vec<AnnouncementDto> {
    items.into_iter().map(AnnouncementDto::from).collect()
}

fn parse_kind(raw: Option<&str>) -> ApiResult<Option<AnnouncementKind>> {
    raw.map(|value| {
        value
            .parse::<AnnouncementKind>()
            .map_err(|err| invalid_value_error(KIND, format!("type: {err}")))
    })
    .transpose()
}

/// Body for creating a notice.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnnouncementRequest {
    pub title: Option<String>,
    pub message: Option<String>,
    /// `info` (default), `warning`, `success`, or `error`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Defaults to true.
    pub is_active: Option<bool>,
    /// RFC 3339 timestamp.
    pub start_date: Option<String>,
    /// RFC 3339 timestamp.
    pub end_date: Option<String>,
}

impl TryFrom<CreateAnnouncementRequest> for NewAnnouncement {
    type Error = Error;

    fn try_from(value: CreateAnnouncementRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            title: require_text(value.title, TITLE)?,
            message: require_text(value.message, MESSAGE)?,
            kind: parse_kind(value.kind.as_deref())?.unwrap_or_default(),
            is_active: value.is_active.unwrap_or(true),
            start_date: parse_optional_rfc3339_timestamp(value.start_date.as_deref(), START_DATE)?,
            end_date: parse_optional_rfc3339_timestamp(value.end_date.as_deref(), END_DATE)?,
        })
    }
}

/// Distinguish an absent field from an explicit `null`.
fn explicit_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Body for `PATCH`. Omitted fields are kept; a `null` date clears it.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAnnouncementRequest {
    pub title: Option<String>,
    pub message: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "explicit_null")]
    #[schema(value_type = Option<String>)]
    pub start_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit_null")]
    #[schema(value_type = Option<String>)]
    pub end_date: Option<Option<String>>,
}

fn window_bound(
    value: Option<Option<String>>,
    field: FieldName,
) -> ApiResult<Option<Option<DateTime<Utc>>>> {
    match value {
        None => Ok(None),
        Some(None) => Ok(Some(None)),
        Some(Some(raw)) => parse_rfc3339_timestamp(&raw, field).map(|ts| Some(Some(ts))),
    }
}

impl TryFrom<UpdateAnnouncementRequest> for AnnouncementPatch {
    type Error = Error;

    fn try_from(value: UpdateAnnouncementRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            title: value.title,
            message: value.message,
            kind: parse_kind(value.kind.as_deref())?,
            is_active: value.is_active,
            start_date: window_bound(value.start_date, START_DATE)?,
            end_date: window_bound(value.end_date, END_DATE)?,
        })
    }
}

/// Notices visible now, newest first.
#[utoipa::path(
    get,
    path = "/api/announcements",
    responses((status = 200, description = "Active notices", body = [AnnouncementDto])),
    tags = ["announcements"],
    operation_id = "listActiveAnnouncements",
    security([])
)]
#[get("/announcements")]
pub async fn list_active(
    state: web::Data<HttpState>,
) -> ApiResult<web::Json<Vec<AnnouncementDto>>> {
    Ok(web::Json(dtos(state.announcements.active().await?)))
}

/// Every notice. Admin only.
#[utoipa::path(
    get,
    path = "/api/admin/announcements",
    responses(
        (status = 200, description = "All notices", body = [AnnouncementDto]),
        (status = 403, description = "Admin role required", body = Error)
    ),
    tags = ["announcements"],
    operation_id = "listAllAnnouncements"
)]
#[get("/admin/announcements")]
pub async fn list_all(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
) -> ApiResult<web::Json<Vec<AnnouncementDto>>> {
    Ok(web::Json(dtos(state.announcements.list_all(&viewer.0).await?)))
}

/// Publish a notice. Admin only.
#[utoipa::path(
    post,
    path = "/api/admin/announcements",
    request_body = CreateAnnouncementRequest,
    responses(
        (status = 201, description = "Created notice", body = AnnouncementDto),
        (status = 400, description = "Invalid notice", body = Error),
        (status = 403, description = "Admin role required", body = Error)
    ),
    tags = ["announcements"],
    operation_id = "createAnnouncement"
)]
#[post("/admin/announcements")]
pub async fn create(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
    payload: web::Json<CreateAnnouncementRequest>,
) -> ApiResult<HttpResponse> {
    viewer.0.require_admin()?;
    let draft = NewAnnouncement::try_from(payload.into_inner())?;
    let created = state.announcements.create(&viewer.0, draft).await?;
    Ok(HttpResponse::Created().json(AnnouncementDto::from(created)))
}

/// Edit a notice. Admin only.
#[utoipa::path(
    patch,
    path = "/api/admin/announcements/{id}",
    params(("id" = Uuid, Path, description = "Announcement id")),
    request_body = UpdateAnnouncementRequest,
    responses(
        (status = 200, description = "Updated notice", body = AnnouncementDto),
        (status = 400, description = "Invalid change", body = Error),
        (status = 403, description = "Admin role required", body = Error),
        (status = 404, description = "Unknown notice", body = Error)
    ),
    tags = ["announcements"],
    operation_id = "updateAnnouncement"
)]
#[patch("/admin/announcements/{id}")]
pub async fn update(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
    path: web::Path<String>,
    payload: web::Json<UpdateAnnouncementRequest>,
) -> ApiResult<web::Json<AnnouncementDto>> {
    viewer.0.require_admin()?;
    let id = parse_uuid(&path.into_inner(), ID)?;
    let patch = AnnouncementPatch::try_from(payload.into_inner())?;
    let updated = state.announcements.update(&viewer.0, &id, patch).await?;
    Ok(web::Json(updated.into()))
}

/// Remove a notice. Admin only.
#[utoipa::path(
    delete,
    path = "/api/admin/announcements/{id}",
    params(("id" = Uuid, Path, description = "Announcement id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Admin role required", body = Error),
        (status = 404, description = "Unknown notice", body = Error)
    ),
    tags = ["announcements"],
    operation_id = "deleteAnnouncement"
)]
#[delete("/admin/announcements/{id}")]
pub async fn remove(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = parse_uuid(&path.into_inner(), ID)?;
    state.announcements.delete(&viewer.0, &id).await?;
    Ok(HttpResponse::NoContent().finish())
}
