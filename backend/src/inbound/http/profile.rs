//! Own-profile endpoints.
//!
//! ```text
//! GET   /api/profile/me
//! PATCH /api/profile/me {"fullName":"山田 太郎","grade":"中2"}
//! POST  /api/profile/me/login
//! POST  /api/profile/me/tests
//! ```

use actix_web::{HttpResponse, get, patch, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Error, LoginStreak, Profile, ProfileUpdate, Role};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::CurrentViewer;
use crate::inbound::http::state::HttpState;

/// Profile as returned to clients. Billing identifiers stay server-side.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDto {
    pub id: Uuid,
    pub full_name: Option<String>,
    #[schema(value_type = String, example = "student")]
    pub role: Role,
    pub grade: Option<String>,
    pub school_name: Option<String>,
    pub cram_school_id: Option<Uuid>,
    pub login_id: Option<String>,
    pub is_pro: bool,
    pub test_count: i32,
    pub total_writing_checks: i32,
    pub consecutive_login_days: i32,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Profile> for ProfileDto {
    fn from(profile: Profile) -> Self {
        Self {
            id: *profile.id.as_uuid(),
            full_name: profile.full_name,
            role: profile.role,
            grade: profile.grade,
            school_name: profile.school_name,
            cram_school_id: profile.cram_school_id,
            login_id: profile.login_id,
            is_pro: profile.is_pro,
            test_count: profile.test_count,
            total_writing_checks: profile.total_writing_checks,
            consecutive_login_days: profile.consecutive_login_days,
            last_login_at: profile.last_login_at,
            created_at: profile.created_at,
        }
    }
}

/// Editable fields for `PATCH /api/profile/me`. Omitted fields are kept.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateRequest {
    pub full_name: Option<String>,
    pub grade: Option<String>,
    pub school_name: Option<String>,
}

impl From<ProfileUpdateRequest> for ProfileUpdate {
    fn from(value: ProfileUpdateRequest) -> Self {
        Self {
            full_name: value.full_name,
            grade: value.grade,
            school_name: value.school_name,
        }
    }
}

/// Result of `POST /api/profile/me/login`.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginStreakDto {
    pub consecutive_days: i32,
    pub last_login_at: DateTime<Utc>,
    /// False when today was already counted.
    pub advanced: bool,
}

impl From<LoginStreak> for LoginStreakDto {
    fn from(value: LoginStreak) -> Self {
        Self {
            consecutive_days: value.consecutive_days,
            last_login_at: value.last_login_at,
            advanced: value.advanced,
        }
    }
}

/// The caller's profile. Created on first access.
#[utoipa::path(
    get,
    path = "/api/profile/me",
    responses(
        (status = 200, description = "Profile", body = ProfileDto),
        (status = 401, description = "Login required", body = Error)
    ),
    tags = ["profile"],
    operation_id = "getProfile"
)]
#[get("/profile/me")]
pub async fn get_profile(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
) -> ApiResult<web::Json<ProfileDto>> {
    let profile = state.profile.me(&viewer.0).await?;
    Ok(web::Json(profile.into()))
}

/// Update name, grade, or school.
#[utoipa::path(
    patch,
    path = "/api/profile/me",
    request_body = ProfileUpdateRequest,
    responses(
        (status = 200, description = "Updated profile", body = ProfileDto),
        (status = 400, description = "Nothing to update", body = Error),
        (status = 401, description = "Login required", body = Error)
    ),
    tags = ["profile"],
    operation_id = "updateProfile"
)]
#[patch("/profile/me")]
pub async fn update_profile(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
    payload: web::Json<ProfileUpdateRequest>,
) -> ApiResult<web::Json<ProfileDto>> {
    let update = ProfileUpdate::from(payload.into_inner());
    let profile = state.profile.update(&viewer.0, &update).await?;
    Ok(web::Json(profile.into()))
}

/// Count today's login towards the streak. Days follow Asia/Tokyo.
#[utoipa::path(
    post,
    path = "/api/profile/me/login",
    responses(
        (status = 200, description = "Current streak", body = LoginStreakDto),
        (status = 401, description = "Login required", body = Error)
    ),
    tags = ["profile"],
    operation_id = "recordLogin"
)]
#[post("/profile/me/login")]
pub async fn record_login(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
) -> ApiResult<web::Json<LoginStreakDto>> {
    let streak = state.profile.record_login(&viewer.0).await?;
    Ok(web::Json(streak.into()))
}

/// Count a quiz the caller started. Saving a result does not count again.
#[utoipa::path(
    post,
    path = "/api/profile/me/tests",
    responses(
        (status = 204, description = "Counted"),
        (status = 401, description = "Login required", body = Error)
    ),
    tags = ["profile"],
    operation_id = "recordTestStarted"
)]
#[post("/profile/me/tests")]
pub async fn record_test_started(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
) -> ApiResult<HttpResponse> {
    let profile = state.profile.me(&viewer.0).await?;
    state.profile.record_test_started(&profile.id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbound::http::test_utils::TestContext;
    use actix_web::http::{StatusCode, header};
    use actix_web::{App, test};
    use serde_json::{Value, json};

    #[actix_web::test]
    async fn profile_is_created_then_updated() {
        let ctx = TestContext::new();
        let (token, _) = ctx.sign_up("learner@example.com").await;
        let app = test::init_service(
            App::new().app_data(ctx.data()).service(
                web::scope("/api")
                    .service(get_profile)
                    .service(update_profile)
                    .service(record_login)
                    .service(record_test_started),
            ),
        )
        .await;
        let auth = (header::AUTHORIZATION, format!("Bearer {token}"));

        let res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/profile/me")
                .insert_header(auth.clone())
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["role"], "student");
        assert_eq!(body["testCount"], 0);

        let res = test::call_service(
            &app,
            test::TestRequest::patch()
                .uri("/api/profile/me")
                .insert_header(auth.clone())
                .set_json(json!({"fullName": "山田 太郎"}))
                .to_request(),
        )
        .await;
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["fullName"], "山田 太郎");

        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/profile/me/login")
                .insert_header(auth.clone())
                .to_request(),
        )
        .await;
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["consecutiveDays"], 1);
        assert_eq!(body["advanced"], true);

        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/profile/me/tests")
                .insert_header(auth.clone())
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get()
                .uri("/api/profile/me")
                .insert_header(auth)
                .to_request(),
        )
        .await;
        assert_eq!(body["testCount"], 1);
    }
}
