//! Cram-school staff endpoints.
//!
//! ```text
//! POST /api/teacher/students {"fullName":"佐藤 花子","loginId":"hanako01","password":"secret1"}
//! GET  /api/teacher/students?cramSchoolId=...
//! GET  /api/teacher/alerts
//! ```

use actix_web::{HttpResponse, get, post, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::domain::Error;
use crate::domain::school::{AlertType, StudentAlert};
use crate::domain::students_service::NewStudent;
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::CurrentViewer;
use crate::inbound::http::profile::ProfileDto;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_optional_uuid};

const CRAM_SCHOOL_ID: FieldName = FieldName::new("cramSchoolId");

/// Body for `POST /api/teacher/students`.
///
/// The password never appears in `Debug` output or logs.
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudentRequest {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub login_id: String,
    #[serde(default)]
    #[schema(value_type = String, min_length = 6)]
    pub password: Zeroizing<String>,
    pub grade: Option<String>,
    pub school_name: Option<String>,
    /// Defaults to the caller's cram school.
    pub cram_school_id: Option<String>,
}

impl std::fmt::Debug for CreateStudentRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateStudentRequest")
            .field("full_name", &self.full_name)
            .field("login_id", &self.login_id)
            .field("password", &"<redacted>")
            .finish_non_exhaustive()
    }
}

/// Query for `GET /api/teacher/students`.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct StudentsQuery {
    /// Defaults to the caller's cram school.
    pub cram_school_id: Option<String>,
}

/// A student who needs attention.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentAlertDto {
    pub student: ProfileDto,
    #[schema(value_type = String, example = "no_log")]
    pub alert_type: AlertType,
    pub days_without_log: Option<i64>,
    pub last_log_date: Option<NaiveDate>,
}

impl From<StudentAlert> for StudentAlertDto {
    fn from(alert: StudentAlert) -> Self {
        Self {
            student: alert.student.into(),
            alert_type: alert.alert_type,
            days_without_log: alert.days_without_log,
            last_log_date: alert.last_log_date,
        }
    }
}

/// Create a student login. Staff only.
#[utoipa::path(
    post,
    path = "/api/teacher/students",
    request_body = CreateStudentRequest,
    responses(
        (status = 201, description = "Provisioned student", body = ProfileDto),
        (status = 400, description = "Invalid or duplicate login", body = Error),
        (status = 403, description = "Staff only", body = Error)
    ),
    tags = ["teacher"],
    operation_id = "createStudent"
)]
#[post("/teacher/students")]
pub async fn create_student(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
    payload: web::Json<CreateStudentRequest>,
) -> ApiResult<HttpResponse> {
    let body = payload.into_inner();
    let requested_school = parse_optional_uuid(body.cram_school_id.as_deref(), CRAM_SCHOOL_ID)?;
    let own_school = viewer.0.require_staff()?.cram_school_id;
    let draft = NewStudent {
        full_name: body.full_name,
        login_id: body.login_id,
        password: body.password,
        grade: body.grade,
        school_name: body.school_name,
        cram_school_id: requested_school.or(own_school),
    };
    let profile = state.students.provision(&viewer.0, draft).await?;
    Ok(HttpResponse::Created().json(ProfileDto::from(profile)))
}

/// Students of a cram school ordered by name. Staff only.
#[utoipa::path(
    get,
    path = "/api/teacher/students",
    params(StudentsQuery),
    responses(
        (status = 200, description = "Students", body = [ProfileDto]),
        (status = 403, description = "Staff only", body = Error)
    ),
    tags = ["teacher"],
    operation_id = "listStudents"
)]
#[get("/teacher/students")]
pub async fn list_students(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
    query: web::Query<StudentsQuery>,
) -> ApiResult<web::Json<Vec<ProfileDto>>> {
    let requested = parse_optional_uuid(query.cram_school_id.as_deref(), CRAM_SCHOOL_ID)?;
    let school = requested.or_else(|| {
        viewer
            .0
            .profile
            .as_ref()
            .and_then(|profile| profile.cram_school_id)
    });
    let students = state.students.list(&viewer.0, school).await?;
    Ok(web::Json(students.into_iter().map(ProfileDto::from).collect()))
}

/// Students with no recent log or a forgotten submission. Staff only.
#[utoipa::path(
    get,
    path = "/api/teacher/alerts",
    responses(
        (status = 200, description = "Alerts, longest gap first", body = [StudentAlertDto]),
        (status = 403, description = "Staff only", body = Error)
    ),
    tags = ["teacher"],
    operation_id = "listStudentAlerts"
)]
#[get("/teacher/alerts")]
pub async fn student_alerts(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
) -> ApiResult<web::Json<Vec<StudentAlertDto>>> {
    let alerts = state.school.alerts(&viewer.0).await?;
    Ok(web::Json(alerts.into_iter().map(StudentAlertDto::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Profile, Role};
    use crate::inbound::http::test_utils::TestContext;
    use actix_web::http::{StatusCode, header};
    use actix_web::{App, test as actix_test};
    use chrono::Utc;
    use serde_json::{Value, json};
    use uuid::Uuid;

    #[test]
    fn debug_output_hides_the_password() {
        let request: CreateStudentRequest = serde_json::from_value(json!({
            "fullName": "佐藤 花子",
            "loginId": "hanako01",
            "password": "hunter22"
        }))
        .expect("request");
        assert!(!format!("{request:?}").contains("hunter22"));
    }

    #[actix_web::test]
    async fn teachers_provision_list_and_watch_students() {
        let ctx = TestContext::new();
        let school = Uuid::new_v4();
        let (teacher, teacher_id) = ctx.sign_up("teacher@example.com").await;
        let mut profile = Profile::new(teacher_id, Role::Teacher, Utc::now());
        profile.cram_school_id = Some(school);
        ctx.seed_profile(profile).await;
        let app = actix_test::init_service(
            App::new().app_data(ctx.data()).service(
                web::scope("/api")
                    .service(create_student)
                    .service(list_students)
                    .service(student_alerts),
            ),
        )
        .await;
        let bearer = (header::AUTHORIZATION, format!("Bearer {teacher}"));
        let provision = || {
            actix_test::TestRequest::post()
                .uri("/api/teacher/students")
                .insert_header(bearer.clone())
                .set_json(json!({
                    "fullName": "佐藤 花子",
                    "loginId": "hanako01",
                    "password": "secret1",
                    "grade": "中2"
                }))
                .to_request()
        };

        let res = actix_test::call_service(&app, provision()).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let student: Value = actix_test::read_body_json(res).await;
        assert_eq!(student["role"], "student");
        assert_eq!(student["cramSchoolId"], school.to_string());

        let res = actix_test::call_service(&app, provision()).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let error: Value = actix_test::read_body_json(res).await;
        assert_eq!(error["details"]["field"], "loginId");

        let listed: Value = actix_test::call_and_read_body_json(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/teacher/students")
                .insert_header(bearer.clone())
                .to_request(),
        )
        .await;
        assert_eq!(listed.as_array().map(Vec::len), Some(1));

        let alerts: Value = actix_test::call_and_read_body_json(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/teacher/alerts")
                .insert_header(bearer)
                .to_request(),
        )
        .await;
        assert_eq!(alerts[0]["alertType"], "no_log");
        assert_eq!(alerts[0]["lastLogDate"], Value::Null);
    }

    #[actix_web::test]
    async fn students_cannot_use_staff_endpoints() {
        let ctx = TestContext::new();
        let (token, id) = ctx.sign_up("student@example.com").await;
        ctx.seed_profile(Profile::new(id, Role::Student, Utc::now()))
            .await;
        let app = actix_test::init_service(
            App::new()
                .app_data(ctx.data())
                .service(web::scope("/api").service(student_alerts)),
        )
        .await;
        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/teacher/alerts")
                .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }
}
