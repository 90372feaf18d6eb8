//! Exam countdowns, entrance exam schedules, and their admin upkeep.
//!
//! ```text
//! GET    /api/countdowns/{slug}
//! GET    /api/countdowns/{slug}/{session}
//! GET    /api/high-school-exams/{prefecture}/{year}
//! GET    /api/admin/exam-sessions
//! PUT    /api/admin/exam-sessions {"slug":"eiken","sessionSlug":"2027-1",...}
//! DELETE /api/admin/exam-sessions/{id}
//! GET    /api/admin/official-exams?year=2027&prefectureId=28
//! PUT    /api/admin/official-exams {"exams":[...]}
//! DELETE /api/admin/official-exams/{id}
//! POST   /api/admin/exams/import {"url":"https://..."}
//! POST   /api/admin/exams/search-sources {"prefecture":"兵庫県","year":2027}
//! ```

use actix_web::{HttpResponse, delete, get, post, put, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Error;
use crate::domain::exam_calendar::{Countdown, ExamCategory, ExamSession, OfficialExam};
use crate::domain::exam_calendar_service::{
    ExamSessionDraft, OfficialExamCountdown, OfficialExamDraft, PrefectureSchedule,
    SessionCountdown,
};
use crate::domain::exam_import::{ImportedExam, ImportedSchedule, SourceLink};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::CurrentViewer;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, invalid_value_error, missing_field_error, parse_optional_date,
    parse_optional_uuid, parse_uuid, require_text,
};

const ID: FieldName = FieldName::new("id");
const YEAR: FieldName = FieldName::new("year");
const CATEGORY: FieldName = FieldName::new("category");
const PREFECTURE_ID: FieldName = FieldName::new("prefectureId");
const PRIMARY_EXAM_DATE: FieldName = FieldName::new("primaryExamDate");
const RESULT_DATE: FieldName = FieldName::new("resultDate");
const EXAM_DATE: FieldName = FieldName::new("examDate");
const APPLICATION_START: FieldName = FieldName::new("applicationStart");
const APPLICATION_END: FieldName = FieldName::new("applicationEnd");
const URL: FieldName = FieldName::new("url");
const PREFECTURE: FieldName = FieldName::new("prefecture");

fn required_date(raw: Option<&str>, field: FieldName) -> ApiResult<NaiveDate> {
    parse_optional_date(raw, field)?.ok_or_else(|| missing_field_error(field))
}

fn parse_year(raw: &str) -> ApiResult<i32> {
    raw.trim()
        .parse()
        .map_err(|_| invalid_value_error(YEAR, "year must be a number"))
}

/// A session with its countdown.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionCountdownDto {
    pub slug: String,
    pub session_slug: String,
    pub exam_name: String,
    pub session_name: String,
    pub primary_exam_date: NaiveDate,
    pub result_date: Option<NaiveDate>,
    pub days_remaining: i64,
    pub is_over: bool,
}

impl From<SessionCountdown> for SessionCountdownDto {
    fn from(value: SessionCountdown) -> Self {
        let SessionCountdown {
            session,
            countdown: Countdown {
                days_remaining,
                is_over,
            },
        } = value;
        Self {
            slug: session.slug,
            session_slug: session.session_slug,
            exam_name: session.exam_name,
            session_name: session.session_name,
            primary_exam_date: session.primary_exam_date,
            result_date: session.result_date,
            days_remaining,
            is_over,
        }
    }
}

/// A session as administrators see it.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExamSessionDto {
    pub id: Uuid,
    pub slug: String,
    pub session_slug: String,
    pub exam_name: String,
    pub session_name: String,
    pub primary_exam_date: NaiveDate,
    pub result_date: Option<NaiveDate>,
    pub is_active: bool,
}

impl From<ExamSession> for ExamSessionDto {
    fn from(value: ExamSession) -> Self {
        Self {
            id: value.id,
            slug: value.slug,
            session_slug: value.session_slug,
            exam_name: value.exam_name,
            session_name: value.session_name,
            primary_exam_date: value.primary_exam_date,
            result_date: value.result_date,
            is_active: value.is_active,
        }
    }
}

/// A public high-school entrance exam.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OfficialExamDto {
    pub id: Uuid,
    pub year: i32,
    pub prefecture_id: i32,
    #[schema(value_type = String, example = "public_general")]
    pub category: ExamCategory,
    pub name: String,
    pub exam_date: NaiveDate,
    pub result_date: Option<NaiveDate>,
    pub application_start: Option<NaiveDate>,
    pub application_end: Option<NaiveDate>,
    /// Present on public schedules only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_remaining: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_over: Option<bool>,
}

impl From<OfficialExam> for OfficialExamDto {
    fn from(value: OfficialExam) -> Self {
        Self {
            id: value.id,
            year: value.year,
            prefecture_id: value.prefecture_id,
            category: value.category,
            name: value.name,
            exam_date: value.exam_date,
            result_date: value.result_date,
            application_start: value.application_start,
            application_end: value.application_end,
            days_remaining: None,
            is_over: None,
        }
    }
}

impl From<OfficialExamCountdown> for OfficialExamDto {
    fn from(value: OfficialExamCountdown) -> Self {
        Self {
            days_remaining: Some(value.countdown.days_remaining),
            is_over: Some(value.countdown.is_over),
            ..value.exam.into()
        }
    }
}

/// A prefecture reference.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct PrefectureDto {
    pub id: i32,
    pub name: String,
    pub slug: String,
}

/// A prefecture's entrance exams for one year.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct PrefectureScheduleDto {
    pub prefecture: PrefectureDto,
    pub year: i32,
    pub exams: Vec<OfficialExamDto>,
}

impl From<PrefectureSchedule> for PrefectureScheduleDto {
    fn from(value: PrefectureSchedule) -> Self {
        Self {
            prefecture: PrefectureDto {
                id: value.prefecture.id,
                name: value.prefecture.name.to_owned(),
                slug: value.prefecture.slug.to_owned(),
            },
            year: value.year,
            exams: value.exams.into_iter().map(OfficialExamDto::from).collect(),
        }
    }
}

/// Body for `PUT /api/admin/exam-sessions`. Without `id` a session is created.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveExamSessionRequest {
    pub id: Option<String>,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub session_slug: String,
    #[serde(default)]
    pub exam_name: String,
    #[serde(default)]
    pub session_name: String,
    /// `YYYY-MM-DD`.
    pub primary_exam_date: Option<String>,
    /// `YYYY-MM-DD`.
    pub result_date: Option<String>,
    /// Defaults to true.
    pub is_active: Option<bool>,
}

impl TryFrom<SaveExamSessionRequest> for ExamSessionDraft {
    type Error = Error;

    fn try_from(value: SaveExamSessionRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_optional_uuid(value.id.as_deref(), ID)?,
            slug: value.slug,
            session_slug: value.session_slug,
            exam_name: value.exam_name,
            session_name: value.session_name,
            primary_exam_date: required_date(
                value.primary_exam_date.as_deref(),
                PRIMARY_EXAM_DATE,
            )?,
            result_date: parse_optional_date(value.result_date.as_deref(), RESULT_DATE)?,
            is_active: value.is_active.unwrap_or(true),
        })
    }
}

/// One entrance exam to store. Without `id` it is created.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OfficialExamRequest {
    pub id: Option<String>,
    pub year: Option<i32>,
    pub prefecture_id: Option<i32>,
    /// `public_general`, `public_recommendation`, or `other`.
    pub category: Option<String>,
    #[serde(default)]
    pub name: String,
    pub exam_date: Option<String>,
    pub result_date: Option<String>,
    pub application_start: Option<String>,
    pub application_end: Option<String>,
}

impl TryFrom<OfficialExamRequest> for OfficialExamDraft {
    type Error = Error;

    fn try_from(value: OfficialExamRequest) -> Result<Self, Self::Error> {
        let category = match value.category.as_deref() {
            None => ExamCategory::default(),
            Some(raw) => raw
                .parse()
                .map_err(|err| invalid_value_error(CATEGORY, format!("category: {err}")))?,
        };
        Ok(Self {
            id: parse_optional_uuid(value.id.as_deref(), ID)?,
            year: value.year.ok_or_else(|| missing_field_error(YEAR))?,
            prefecture_id: value
                .prefecture_id
                .ok_or_else(|| missing_field_error(PREFECTURE_ID))?,
            category,
            name: value.name,
            exam_date: required_date(value.exam_date.as_deref(), EXAM_DATE)?,
            result_date: parse_optional_date(value.result_date.as_deref(), RESULT_DATE)?,
            application_start: parse_optional_date(
                value.application_start.as_deref(),
                APPLICATION_START,
            )?,
            application_end: parse_optional_date(
                value.application_end.as_deref(),
                APPLICATION_END,
            )?,
        })
    }
}

/// Body for `PUT /api/admin/official-exams`.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SaveOfficialExamsRequest {
    #[serde(default)]
    pub exams: Vec<OfficialExamRequest>,
}

/// Filter for the admin exam listing.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct OfficialExamsQuery {
    pub year: Option<i32>,
    pub prefecture_id: Option<i32>,
}

/// Body for `POST /api/admin/exams/import`.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ImportExamRequest {
    pub url: Option<String>,
}

/// An exam read from a guideline, not yet stored.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportedExamDto {
    #[schema(value_type = String, example = "public_general")]
    pub category: ExamCategory,
    pub name: String,
    pub date: NaiveDate,
    pub result_date: Option<NaiveDate>,
    pub application_start: Option<NaiveDate>,
    pub application_end: Option<NaiveDate>,
}

impl From<ImportedExam> for ImportedExamDto {
    fn from(value: ImportedExam) -> Self {
        Self {
            category: value.category,
            name: value.name,
            date: value.exam_date,
            result_date: value.result_date,
            application_start: value.application_start,
            application_end: value.application_end,
        }
    }
}

/// Extracted schedule for review.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportedScheduleDto {
    /// `pdf` or `html`.
    pub content_type: &'static str,
    pub prefecture: Option<String>,
    pub prefecture_id: Option<i32>,
    pub year: Option<i32>,
    pub exams: Vec<ImportedExamDto>,
}

impl From<ImportedSchedule> for ImportedScheduleDto {
    fn from(value: ImportedSchedule) -> Self {
        Self {
            content_type: value.source.as_str(),
            prefecture: value.prefecture,
            prefecture_id: value.prefecture_id,
            year: value.year,
            exams: value.exams.into_iter().map(ImportedExamDto::from).collect(),
        }
    }
}

/// Body for `POST /api/admin/exams/search-sources`.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SearchSourcesRequest {
    pub prefecture: Option<String>,
    pub year: Option<i32>,
}

/// A candidate guideline page.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SourceLinkDto {
    pub title: String,
    pub url: String,
    pub description: String,
}

impl From<SourceLink> for SourceLinkDto {
    fn from(value: SourceLink) -> Self {
        Self {
            title: value.title,
            url: value.url,
            description: value.description,
        }
    }
}

/// Upcoming sessions of one exam, soonest first.
#[utoipa::path(
    get,
    path = "/api/countdowns/{slug}",
    params(("slug" = String, Path, description = "Exam slug, e.g. `eiken`")),
    responses((status = 200, description = "Upcoming sessions", body = [SessionCountdownDto])),
    tags = ["exams"],
    operation_id = "listExamCountdowns",
    security([])
)]
#[get("/countdowns/{slug}")]
pub async fn list_countdowns(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<Vec<SessionCountdownDto>>> {
    let sessions = state.exam_calendar.upcoming_sessions(&path).await?;
    Ok(web::Json(
        sessions.into_iter().map(SessionCountdownDto::from).collect(),
    ))
}

/// Countdown for one session.
#[utoipa::path(
    get,
    path = "/api/countdowns/{slug}/{session}",
    params(
        ("slug" = String, Path, description = "Exam slug"),
        ("session" = String, Path, description = "Session slug, e.g. `2027-1`")
    ),
    responses(
        (status = 200, description = "Session countdown", body = SessionCountdownDto),
        (status = 404, description = "Unknown or hidden session", body = Error)
    ),
    tags = ["exams"],
    operation_id = "getExamCountdown",
    security([])
)]
#[get("/countdowns/{slug}/{session}")]
pub async fn get_countdown(
    state: web::Data<HttpState>,
    path: web::Path<(String, String)>,
) -> ApiResult<web::Json<SessionCountdownDto>> {
    let (slug, session) = path.into_inner();
    let countdown = state.exam_calendar.session(&slug, &session).await?;
    Ok(web::Json(countdown.into()))
}

/// A prefecture's public high-school entrance exams.
#[utoipa::path(
    get,
    path = "/api/high-school-exams/{prefecture}/{year}",
    params(
        ("prefecture" = String, Path, description = "Prefecture slug, e.g. `hyogo`"),
        ("year" = i32, Path, description = "School year of enrolment")
    ),
    responses(
        (status = 200, description = "Entrance exams", body = PrefectureScheduleDto),
        (status = 400, description = "Invalid year", body = Error),
        (status = 404, description = "Unknown prefecture", body = Error)
    ),
    tags = ["exams"],
    operation_id = "getHighSchoolExams",
    security([])
)]
#[get("/high-school-exams/{prefecture}/{year}")]
pub async fn high_school_exams(
    state: web::Data<HttpState>,
    path: web::Path<(String, String)>,
) -> ApiResult<web::Json<PrefectureScheduleDto>> {
    let (prefecture, year) = path.into_inner();
    let year = parse_year(&year)?;
    let schedule = state
        .exam_calendar
        .prefecture_schedule(&prefecture, year)
        .await?;
    Ok(web::Json(schedule.into()))
}

/// Every session. Admin only.
#[utoipa::path(
    get,
    path = "/api/admin/exam-sessions",
    responses(
        (status = 200, description = "All sessions", body = [ExamSessionDto]),
        (status = 403, description = "Admin role required", body = Error)
    ),
    tags = ["exams"],
    operation_id = "listExamSessions"
)]
#[get("/admin/exam-sessions")]
pub async fn list_sessions(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
) -> ApiResult<web::Json<Vec<ExamSessionDto>>> {
    let sessions = state.exam_calendar.all_sessions(&viewer.0).await?;
    Ok(web::Json(sessions.into_iter().map(ExamSessionDto::from).collect()))
}

/// Create or replace a session. Admin only.
#[utoipa::path(
    put,
    path = "/api/admin/exam-sessions",
    request_body = SaveExamSessionRequest,
    responses(
        (status = 200, description = "Stored session", body = ExamSessionDto),
        (status = 400, description = "Invalid session", body = Error),
        (status = 403, description = "Admin role required", body = Error),
        (status = 409, description = "Session slug already used", body = Error)
    ),
    tags = ["exams"],
    operation_id = "saveExamSession"
)]
#[put("/admin/exam-sessions")]
pub async fn save_session(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
    payload: web::Json<SaveExamSessionRequest>,
) -> ApiResult<web::Json<ExamSessionDto>> {
    viewer.0.require_admin()?;
    let draft = ExamSessionDraft::try_from(payload.into_inner())?;
    let stored = state.exam_calendar.save_session(&viewer.0, draft).await?;
    Ok(web::Json(stored.into()))
}

#[utoipa::path(
    delete,
    path = "/api/admin/exam-sessions/{id}",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Admin role required", body = Error),
        (status = 404, description = "Unknown session", body = Error)
    ),
    tags = ["exams"],
    operation_id = "deleteExamSession"
)]
#[delete("/admin/exam-sessions/{id}")]
pub async fn delete_session(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = parse_uuid(&path.into_inner(), ID)?;
    state.exam_calendar.delete_session(&viewer.0, &id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Entrance exams of a year. Admin only.
#[utoipa::path(
    get,
    path = "/api/admin/official-exams",
    params(OfficialExamsQuery),
    responses(
        (status = 200, description = "Entrance exams", body = [OfficialExamDto]),
        (status = 400, description = "Missing year", body = Error),
        (status = 403, description = "Admin role required", body = Error)
    ),
    tags = ["exams"],
    operation_id = "listOfficialExams"
)]
#[get("/admin/official-exams")]
pub async fn list_official_exams(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
    query: web::Query<OfficialExamsQuery>,
) -> ApiResult<web::Json<Vec<OfficialExamDto>>> {
    viewer.0.require_admin()?;
    let OfficialExamsQuery {
        year,
        prefecture_id,
    } = query.into_inner();
    let year = year.ok_or_else(|| missing_field_error(YEAR))?;
    let exams = state
        .exam_calendar
        .official_exams(&viewer.0, year, prefecture_id)
        .await?;
    Ok(web::Json(exams.into_iter().map(OfficialExamDto::from).collect()))
}

/// Store reviewed entrance exams. Admin only.
#[utoipa::path(
    put,
    path = "/api/admin/official-exams",
    request_body = SaveOfficialExamsRequest,
    responses(
        (status = 200, description = "Stored exams", body = [OfficialExamDto]),
        (status = 400, description = "Invalid exam", body = Error),
        (status = 403, description = "Admin role required", body = Error)
    ),
    tags = ["exams"],
    operation_id = "saveOfficialExams"
)]
#[put("/admin/official-exams")]
pub async fn save_official_exams(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
    payload: web::Json<SaveOfficialExamsRequest>,
) -> ApiResult<web::Json<Vec<OfficialExamDto>>> {
    viewer.0.require_admin()?;
    let drafts = payload
        .into_inner()
        .exams
        .into_iter()
        .map(OfficialExamDraft::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    let stored = state
        .exam_calendar
        .save_official_exams(&viewer.0, drafts)
        .await?;
    Ok(web::Json(stored.into_iter().map(OfficialExamDto::from).collect()))
}

#[utoipa::path(
    delete,
    path = "/api/admin/official-exams/{id}",
    params(("id" = Uuid, Path, description = "Exam id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Admin role required", body = Error),
        (status = 404, description = "Unknown exam", body = Error)
    ),
    tags = ["exams"],
    operation_id = "deleteOfficialExam"
)]
#[delete("/admin/official-exams/{id}")]
pub async fn delete_official_exam(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = parse_uuid(&path.into_inner(), ID)?;
    state
        .exam_calendar
        .delete_official_exam(&viewer.0, &id)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Extract a schedule from a guideline PDF or page. Admin only.
#[utoipa::path(
    post,
    path = "/api/admin/exams/import",
    request_body = ImportExamRequest,
    responses(
        (status = 200, description = "Extracted schedule", body = ImportedScheduleDto),
        (status = 400, description = "Unusable URL or document", body = Error),
        (status = 403, description = "Admin role required", body = Error),
        (status = 500, description = "No usable model reply", body = Error),
        (status = 503, description = "Source unreachable", body = Error)
    ),
    tags = ["exams"],
    operation_id = "importExamSchedule"
)]
#[post("/admin/exams/import")]
pub async fn import_schedule(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
    payload: web::Json<ImportExamRequest>,
) -> ApiResult<web::Json<ImportedScheduleDto>> {
    viewer.0.require_admin()?;
    let url = require_text(payload.into_inner().url, URL)?;
    let schedule = state.exam_import.import(&viewer.0, &url).await?;
    Ok(web::Json(schedule.into()))
}

/// Ask the model to find official guideline pages. Admin only.
#[utoipa::path(
    post,
    path = "/api/admin/exams/search-sources",
    request_body = SearchSourcesRequest,
    responses(
        (status = 200, description = "Candidate pages", body = [SourceLinkDto]),
        (status = 400, description = "Missing prefecture or year", body = Error),
        (status = 403, description = "Admin role required", body = Error)
    ),
    tags = ["exams"],
    operation_id = "searchExamSources"
)]
#[post("/admin/exams/search-sources")]
pub async fn search_sources(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
    payload: web::Json<SearchSourcesRequest>,
) -> ApiResult<web::Json<Vec<SourceLinkDto>>> {
    viewer.0.require_admin()?;
    let SearchSourcesRequest { prefecture, year } = payload.into_inner();
    let prefecture = require_text(prefecture, PREFECTURE)?;
    let year = year.ok_or_else(|| missing_field_error(YEAR))?;
    let links = state
        .exam_import
        .search_sources(&viewer.0, &prefecture, year)
        .await?;
    Ok(web::Json(links.into_iter().map(SourceLinkDto::from).collect()))
}
