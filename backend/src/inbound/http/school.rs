//! School workbook, daily log, and task endpoints.
//!
//! ```text
//! GET   /api/subjects
//! GET   /api/school/workbooks
//! POST  /api/school/workbooks {"subjectId":3,"title":"ワーク","targetPage":120,"deadline":"2026-11-30"}
//! PATCH /api/school/workbooks/{id}/page {"currentPage":42}
//! PUT   /api/school/daily-logs {"subjectId":3,"handRaisedCount":2,"submissionStatus":"done"}
//! GET   /api/school/tasks
//! POST  /api/school/tasks {"taskType":"report","title":"読書感想文"}
//! POST  /api/school/tasks/{id}/complete
//! GET    /api/school/test-results
//! POST   /api/school/test-results {"testName":"二学期中間","testDate":"2026-10-14","scores":{"english":82}}
//! DELETE /api/school/test-results/{id}
//! ```

use std::str::FromStr;

use actix_web::{HttpResponse, delete, get, patch, post, put, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Error;
use crate::domain::school::{
    DailyLog, OneOffTask, Subject, SubjectScores, SubmissionStatus, TaskType, TestRecord,
    Workbook,
};
use crate::domain::school_service::{DailyLogEntry, NewTask, NewTestRecord, NewWorkbook};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::CurrentViewer;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, invalid_value_error, missing_field_error, parse_date, parse_optional_date,
    parse_uuid,
};

const ID: FieldName = FieldName::new("id");
const SUBJECT_ID: FieldName = FieldName::new("subjectId");
const TARGET_PAGE: FieldName = FieldName::new("targetPage");
const CURRENT_PAGE: FieldName = FieldName::new("currentPage");
const DEADLINE: FieldName = FieldName::new("deadline");
const LOG_DATE: FieldName = FieldName::new("logDate");
const SUBMISSION_STATUS: FieldName = FieldName::new("submissionStatus");
const TASK_TYPE: FieldName = FieldName::new("taskType");
const TEST_DATE: FieldName = FieldName::new("testDate");

/// A workbook and the bookmark within it.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkbookDto {
    pub id: Uuid,
    pub subject_id: i32,
    pub title: String,
    pub current_page: i32,
    pub target_page: i32,
    pub deadline: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl From<Workbook> for WorkbookDto {
    fn from(workbook: Workbook) -> Self {
        Self {
            id: workbook.id,
            subject_id: workbook.subject_id,
            title: workbook.title,
            current_page: workbook.current_page,
            target_page: workbook.target_page,
            deadline: workbook.deadline,
            created_at: workbook.created_at,
        }
    }
}

/// Body for `POST /api/school/workbooks`.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkbookRequest {
    pub subject_id: Option<i32>,
    #[serde(default)]
    pub title: String,
    pub target_page: Option<i32>,
    /// `YYYY-MM-DD`.
    pub deadline: Option<String>,
}

impl TryFrom<CreateWorkbookRequest> for NewWorkbook {
    type Error = Error;

    fn try_from(value: CreateWorkbookRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            subject_id: value
                .subject_id
                .ok_or_else(|| missing_field_error(SUBJECT_ID))?,
            title: value.title,
            target_page: value
                .target_page
                .ok_or_else(|| missing_field_error(TARGET_PAGE))?,
            deadline: parse_optional_date(value.deadline.as_deref(), DEADLINE)?,
        })
    }
}

/// Body for `PATCH /api/school/workbooks/{id}/page`.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetPageRequest {
    pub current_page: Option<i32>,
}

/// A stored daily log.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailyLogDto {
    pub id: Uuid,
    pub subject_id: i32,
    pub log_date: NaiveDate,
    pub hand_raised_count: i32,
    #[schema(value_type = String, example = "done")]
    pub submission_status: SubmissionStatus,
    pub attitude_score: Option<i32>,
}

impl From<DailyLog> for DailyLogDto {
    fn from(log: DailyLog) -> Self {
        Self {
            id: log.id,
            subject_id: log.subject_id,
            log_date: log.log_date,
            hand_raised_count: log.hand_raised_count,
            submission_status: log.submission_status,
            attitude_score: log.attitude_score,
        }
    }
}

/// Body for `PUT /api/school/daily-logs`. The date defaults to today in Tokyo.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailyLogRequest {
    pub subject_id: Option<i32>,
    pub log_date: Option<String>,
    #[serde(default)]
    pub hand_raised_count: i32,
    /// `none`, `done`, `forgot`, or `incomplete`.
    pub submission_status: Option<String>,
    pub attitude_score: Option<i32>,
}

impl TryFrom<DailyLogRequest> for DailyLogEntry {
    type Error = Error;

    fn try_from(value: DailyLogRequest) -> Result<Self, Self::Error> {
        let submission_status = match value.submission_status.as_deref() {
            None | Some("") => SubmissionStatus::default(),
            Some(raw) => SubmissionStatus::from_str(raw).map_err(|_| {
                invalid_value_error(
                    SUBMISSION_STATUS,
                    format!("unsupported submission status: {raw}"),
                )
            })?,
        };
        Ok(Self {
            subject_id: value
                .subject_id
                .ok_or_else(|| missing_field_error(SUBJECT_ID))?,
            log_date: parse_optional_date(value.log_date.as_deref(), LOG_DATE)?,
            hand_raised_count: value.hand_raised_count,
            submission_status,
            attitude_score: value.attitude_score,
        })
    }
}

/// A one-off task.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskDto {
    pub id: Uuid,
    #[schema(value_type = String, example = "print")]
    pub task_type: TaskType,
    pub title: String,
    pub deadline: Option<NaiveDate>,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
}

impl From<OneOffTask> for TaskDto {
    fn from(task: OneOffTask) -> Self {
        Self {
            id: task.id,
            task_type: task.task_type,
            title: task.title,
            deadline: task.deadline,
            is_completed: task.is_completed,
            created_at: task.created_at,
        }
    }
}

/// Body for `POST /api/school/tasks`.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    /// `print`, `report`, `work`, or `other` (default).
    pub task_type: Option<String>,
    #[serde(default)]
    pub title: String,
    pub deadline: Option<String>,
}

impl TryFrom<CreateTaskRequest> for NewTask {
    type Error = Error;

    fn try_from(value: CreateTaskRequest) -> Result<Self, Self::Error> {
        let task_type = match value.task_type.as_deref() {
            None | Some("") => TaskType::default(),
            Some(raw) => TaskType::from_str(raw).map_err(|_| {
                invalid_value_error(TASK_TYPE, format!("unsupported task type: {raw}"))
            })?,
        };
        Ok(Self {
            task_type,
            title: value.title,
            deadline: parse_optional_date(value.deadline.as_deref(), DEADLINE)?,
        })
    }
}

/// A school test with its per-subject marks and totals.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestRecordDto {
    pub id: Uuid,
    pub test_name: String,
    pub test_date: NaiveDate,
    #[schema(value_type = Object)]
    pub scores: SubjectScores,
    /// English, maths, Japanese, science, and social studies.
    pub total5: Option<i32>,
    /// All nine subjects.
    pub total9: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl From<TestRecord> for TestRecordDto {
    fn from(record: TestRecord) -> Self {
        Self {
            id: record.id,
            total5: record.scores.total5(),
            total9: record.scores.total9(),
            test_name: record.test_name,
            test_date: record.test_date,
            scores: record.scores,
            created_at: record.created_at,
        }
    }
}

/// Body for `POST /api/school/test-results`. Omitted subjects were not examined.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTestRecordRequest {
    #[serde(default)]
    pub test_name: String,
    /// `YYYY-MM-DD`.
    pub test_date: Option<String>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub scores: SubjectScores,
}

impl TryFrom<CreateTestRecordRequest> for NewTestRecord {
    type Error = Error;

    fn try_from(value: CreateTestRecordRequest) -> Result<Self, Self::Error> {
        let raw_date = value
            .test_date
            .filter(|raw| !raw.trim().is_empty())
            .ok_or_else(|| missing_field_error(TEST_DATE))?;
        Ok(Self {
            test_name: value.test_name,
            test_date: parse_date(&raw_date, TEST_DATE)?,
            scores: value.scores,
        })
    }
}

/// The subject catalogue.
#[utoipa::path(
    get,
    path = "/api/subjects",
    responses((status = 200, description = "Subjects")),
    tags = ["school"],
    operation_id = "listSubjects",
    security([])
)]
#[get("/subjects")]
pub async fn list_subjects(state: web::Data<HttpState>) -> ApiResult<web::Json<Vec<Subject>>> {
    Ok(web::Json(state.school.subjects().await?))
}

/// The caller's workbooks.
#[utoipa::path(
    get,
    path = "/api/school/workbooks",
    responses(
        (status = 200, description = "Workbooks", body = [WorkbookDto]),
        (status = 401, description = "Login required", body = Error)
    ),
    tags = ["school"],
    operation_id = "listWorkbooks"
)]
#[get("/school/workbooks")]
pub async fn list_workbooks(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
) -> ApiResult<web::Json<Vec<WorkbookDto>>> {
    let workbooks = state.school.workbooks(&viewer.0.user_id).await?;
    Ok(web::Json(workbooks.into_iter().map(WorkbookDto::from).collect()))
}

/// Start tracking a workbook.
#[utoipa::path(
    post,
    path = "/api/school/workbooks",
    request_body = CreateWorkbookRequest,
    responses(
        (status = 201, description = "Created workbook", body = WorkbookDto),
        (status = 400, description = "Invalid workbook", body = Error),
        (status = 401, description = "Login required", body = Error)
    ),
    tags = ["school"],
    operation_id = "createWorkbook"
)]
#[post("/school/workbooks")]
pub async fn create_workbook(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
    payload: web::Json<CreateWorkbookRequest>,
) -> ApiResult<HttpResponse> {
    let draft = NewWorkbook::try_from(payload.into_inner())?;
    let workbook = state
        .school
        .create_workbook(&viewer.0.user_id, draft)
        .await?;
    Ok(HttpResponse::Created().json(WorkbookDto::from(workbook)))
}

/// Move a workbook's bookmark.
#[utoipa::path(
    patch,
    path = "/api/school/workbooks/{id}/page",
    params(("id" = Uuid, Path, description = "Workbook id")),
    request_body = SetPageRequest,
    responses(
        (status = 200, description = "Updated workbook", body = WorkbookDto),
        (status = 400, description = "Negative page", body = Error),
        (status = 404, description = "Not one of the caller's workbooks", body = Error)
    ),
    tags = ["school"],
    operation_id = "setWorkbookPage"
)]
#[patch("/school/workbooks/{id}/page")]
pub async fn set_workbook_page(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
    path: web::Path<String>,
    payload: web::Json<SetPageRequest>,
) -> ApiResult<web::Json<WorkbookDto>> {
    let id = parse_uuid(&path.into_inner(), ID)?;
    let page = payload
        .current_page
        .ok_or_else(|| missing_field_error(CURRENT_PAGE))?;
    let workbook = state.school.set_page(&viewer.0.user_id, &id, page).await?;
    Ok(web::Json(workbook.into()))
}

/// Record how a subject went on a day. Re-sending replaces the entry.
#[utoipa::path(
    put,
    path = "/api/school/daily-logs",
    request_body = DailyLogRequest,
    responses(
        (status = 200, description = "Stored log", body = DailyLogDto),
        (status = 400, description = "Invalid log", body = Error),
        (status = 401, description = "Login required", body = Error)
    ),
    tags = ["school"],
    operation_id = "recordDailyLog"
)]
#[put("/school/daily-logs")]
pub async fn record_daily_log(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
    payload: web::Json<DailyLogRequest>,
) -> ApiResult<web::Json<DailyLogDto>> {
    let entry = DailyLogEntry::try_from(payload.into_inner())?;
    let log = state
        .school
        .record_daily_log(&viewer.0.user_id, entry)
        .await?;
    Ok(web::Json(log.into()))
}

/// The caller's one-off tasks.
#[utoipa::path(
    get,
    path = "/api/school/tasks",
    responses(
        (status = 200, description = "Tasks", body = [TaskDto]),
        (status = 401, description = "Login required", body = Error)
    ),
    tags = ["school"],
    operation_id = "listTasks"
)]
#[get("/school/tasks")]
pub async fn list_tasks(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
) -> ApiResult<web::Json<Vec<TaskDto>>> {
    let tasks = state.school.tasks(&viewer.0.user_id).await?;
    Ok(web::Json(tasks.into_iter().map(TaskDto::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/school/tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Created task", body = TaskDto),
        (status = 400, description = "Invalid task", body = Error),
        (status = 401, description = "Login required", body = Error)
    ),
    tags = ["school"],
    operation_id = "createTask"
)]
#[post("/school/tasks")]
pub async fn create_task(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
    payload: web::Json<CreateTaskRequest>,
) -> ApiResult<HttpResponse> {
    let draft = NewTask::try_from(payload.into_inner())?;
    let task = state.school.create_task(&viewer.0.user_id, draft).await?;
    Ok(HttpResponse::Created().json(TaskDto::from(task)))
}

#[utoipa::path(
    post,
    path = "/api/school/tasks/{id}/complete",
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 200, description = "Completed task", body = TaskDto),
        (status = 404, description = "Not one of the caller's tasks", body = Error)
    ),
    tags = ["school"],
    operation_id = "completeTask"
)]
#[post("/school/tasks/{id}/complete")]
pub async fn complete_task(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
    path: web::Path<String>,
) -> ApiResult<web::Json<TaskDto>> {
    let id = parse_uuid(&path.into_inner(), ID)?;
    let task = state.school.complete_task(&viewer.0.user_id, &id).await?;
    Ok(web::Json(task.into()))
}

/// The caller's school test results, oldest first.
#[utoipa::path(
    get,
    path = "/api/school/test-results",
    responses(
        (status = 200, description = "Test records", body = [TestRecordDto]),
        (status = 401, description = "Login required", body = Error)
    ),
    tags = ["school"],
    operation_id = "listTestResults"
)]
#[get("/school/test-results")]
pub async fn list_test_results(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
) -> ApiResult<web::Json<Vec<TestRecordDto>>> {
    let records = state.school.test_records(&viewer.0.user_id).await?;
    Ok(web::Json(records.into_iter().map(TestRecordDto::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/school/test-results",
    request_body = CreateTestRecordRequest,
    responses(
        (status = 201, description = "Stored test record", body = TestRecordDto),
        (status = 400, description = "Invalid test record", body = Error),
        (status = 401, description = "Login required", body = Error)
    ),
    tags = ["school"],
    operation_id = "createTestResult"
)]
#[post("/school/test-results")]
pub async fn create_test_result(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
    payload: web::Json<CreateTestRecordRequest>,
) -> ApiResult<HttpResponse> {
    let draft = NewTestRecord::try_from(payload.into_inner())?;
    let record = state
        .school
        .create_test_record(&viewer.0.user_id, draft)
        .await?;
    Ok(HttpResponse::Created().json(TestRecordDto::from(record)))
}

#[utoipa::path(
    delete,
    path = "/api/school/test-results/{id}",
    params(("id" = Uuid, Path, description = "Test record id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not one of the caller's records", body = Error)
    ),
    tags = ["school"],
    operation_id = "deleteTestResult"
)]
#[delete("/school/test-results/{id}")]
pub async fn delete_test_result(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = parse_uuid(&path.into_inner(), ID)?;
    state
        .school
        .delete_test_record(&viewer.0.user_id, &id)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbound::http::test_utils::TestContext;
    use actix_web::http::{StatusCode, header};
    use actix_web::{App, test as actix_test};
    use rstest::rstest;
    use serde_json::{Value, json};

    #[rstest]
    #[case::unknown_status(json!({"subjectId": 1, "submissionStatus": "late"}))]
    #[case::bad_date(json!({"subjectId": 1, "logDate": "2026/10/01"}))]
    #[case::no_subject(json!({"handRaisedCount": 1}))]
    fn daily_log_requests_are_checked(#[case] body: Value) {
        let request: DailyLogRequest = serde_json::from_value(body).expect("request");
        assert!(DailyLogEntry::try_from(request).is_err());
    }

    #[rstest]
    fn task_type_defaults_to_other() {
        let request = CreateTaskRequest {
            title: "プリント".into(),
            ..CreateTaskRequest::default()
        };
        let draft = NewTask::try_from(request).expect("draft");
        assert_eq!(draft.task_type, TaskType::Other);
    }

    #[actix_web::test]
    async fn subjects_are_public() {
        let ctx = TestContext::new();
        let app = actix_test::init_service(
            App::new()
                .app_data(ctx.data())
                .service(web::scope("/api").service(list_subjects)),
        )
        .await;
        let subjects: Value = actix_test::call_and_read_body_json(
            &app,
            actix_test::TestRequest::get().uri("/api/subjects").to_request(),
        )
        .await;
        assert_eq!(subjects.as_array().map(Vec::len), Some(5));
        assert_eq!(subjects[2]["name"], "英語");
    }

    #[actix_web::test]
    async fn workbook_pages_and_tasks_belong_to_their_student() {
        let ctx = TestContext::new();
        let (owner, _) = ctx.sign_up("owner@example.com").await;
        let (other, _) = ctx.sign_up("other@example.com").await;
        let app = actix_test::init_service(
            App::new().app_data(ctx.data()).service(
                web::scope("/api")
                    .service(list_workbooks)
                    .service(create_workbook)
                    .service(set_workbook_page)
                    .service(record_daily_log)
                    .service(list_tasks)
                    .service(create_task)
                    .service(complete_task),
            ),
        )
        .await;
        let bearer = |token: &str| (header::AUTHORIZATION, format!("Bearer {token}"));

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/school/workbooks")
                .insert_header(bearer(&owner))
                .set_json(json!({"subjectId": 2, "title": " 計算ドリル ", "targetPage": 80}))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let workbook: Value = actix_test::read_body_json(res).await;
        let id = workbook["id"].as_str().expect("id").to_owned();
        assert_eq!(workbook["title"], "計算ドリル");
        assert_eq!(workbook["currentPage"], 0);

        let page = |token: &str, page: i32| {
            actix_test::TestRequest::patch()
                .uri(&format!("/api/school/workbooks/{id}/page"))
                .insert_header(bearer(token))
                .set_json(json!({"currentPage": page}))
                .to_request()
        };
        let res = actix_test::call_service(&app, page(&owner, -1)).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let res = actix_test::call_service(&app, page(&other, 10)).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let updated: Value = actix_test::call_and_read_body_json(&app, page(&owner, 24)).await;
        assert_eq!(updated["currentPage"], 24);

        for count in [1, 3] {
            let log: Value = actix_test::call_and_read_body_json(
                &app,
                actix_test::TestRequest::put()
                    .uri("/api/school/daily-logs")
                    .insert_header(bearer(&owner))
                    .set_json(json!({
                        "subjectId": 2,
                        "logDate": "2026-10-01",
                        "handRaisedCount": count,
                        "submissionStatus": "done"
                    }))
                    .to_request(),
            )
            .await;
            assert_eq!(log["handRaisedCount"], count);
            assert_eq!(log["submissionStatus"], "done");
        }

        let task: Value = actix_test::call_and_read_body_json(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/school/tasks")
                .insert_header(bearer(&owner))
                .set_json(json!({"taskType": "report", "title": "読書感想文"}))
                .to_request(),
        )
        .await;
        let task_id = task["id"].as_str().expect("id").to_owned();
        assert_eq!(task["isCompleted"], false);

        let complete = |token: &str| {
            actix_test::TestRequest::post()
                .uri(&format!("/api/school/tasks/{task_id}/complete"))
                .insert_header(bearer(token))
                .to_request()
        };
        let res = actix_test::call_service(&app, complete(&other)).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let done: Value = actix_test::call_and_read_body_json(&app, complete(&owner)).await;
        assert_eq!(done["isCompleted"], true);

        let others: Value = actix_test::call_and_read_body_json(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/school/tasks")
                .insert_header(bearer(&other))
                .to_request(),
        )
        .await;
        assert_eq!(others.as_array().map(Vec::len), Some(0));
    }

    #[rstest]
    #[case::no_date(json!({"testName": "中間"}))]
    #[case::bad_date(json!({"testName": "中間", "testDate": "10/14"}))]
    fn test_record_requests_need_a_date(#[case] body: Value) {
        let request: CreateTestRecordRequest = serde_json::from_value(body).expect("request");
        assert!(NewTestRecord::try_from(request).is_err());
    }

    #[actix_web::test]
    async fn test_results_carry_totals_and_stay_private() {
        let ctx = TestContext::new();
        let (owner, _) = ctx.sign_up("scores@example.com").await;
        let (other, _) = ctx.sign_up("nosy@example.com").await;
        let app = actix_test::init_service(
            App::new().app_data(ctx.data()).service(
                web::scope("/api")
                    .service(list_test_results)
                    .service(create_test_result)
                    .service(delete_test_result),
            ),
        )
        .await;
        let bearer = |token: &str| (header::AUTHORIZATION, format!("Bearer {token}"));

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/school/test-results")
                .insert_header(bearer(&owner))
                .set_json(json!({
                    "testName": "二学期中間",
                    "testDate": "2026-10-14",
                    "scores": {"english": 82, "math": 75, "japanese": 68, "music": 90}
                }))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let record: Value = actix_test::read_body_json(res).await;
        assert_eq!(record["total5"], 225);
        assert_eq!(record["total9"], 315);
        assert_eq!(record["scores"]["techHome"], Value::Null);
        let id = record["id"].as_str().expect("id").to_owned();

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/school/test-results")
                .insert_header(bearer(&owner))
                .set_json(json!({"testName": "期末", "testDate": "2026-12-01", "scores": {"pe": 101}}))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let remove = |token: &str| {
            actix_test::TestRequest::delete()
                .uri(&format!("/api/school/test-results/{id}"))
                .insert_header(bearer(token))
                .to_request()
        };
        let res = actix_test::call_service(&app, remove(&other)).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let listed: Value = actix_test::call_and_read_body_json(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/school/test-results")
                .insert_header(bearer(&owner))
                .to_request(),
        )
        .await;
        assert_eq!(listed.as_array().map(Vec::len), Some(1));

        let res = actix_test::call_service(&app, remove(&owner)).await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
    }
}
