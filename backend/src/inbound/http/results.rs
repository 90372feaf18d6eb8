//! Quiz result endpoints.
//!
//! ```text
//! POST /api/results {"selectedText":"LEAP - 1-50","startNum":1,"endNum":50,"total":10,
//!                    "incorrectWords":[{"wordNumber":3,"word":"abandon","meaning":"捨てる"}],
//!                    "attemptId":"7f0c..."}
//! POST /api/results {"mode":"mathtap","grade":"中1","unit":"正負の数","total":5,"correct":4,
//!                    "incorrect":[{"wordNumber":2}],"attemptId":"..."}
//! GET  /api/results
//! ```

use actix_web::{get, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Error;
use crate::domain::results::{MathtapSubmission, MistapSubmission, QuizResult, WordEntry};
use crate::domain::results_service::ResultSubmission;
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::CurrentViewer;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, invalid_value_error, missing_field_error};

const MODE: FieldName = FieldName::new("mode");
const GRADE: FieldName = FieldName::new("grade");
const UNIT: FieldName = FieldName::new("unit");
const TOTAL: FieldName = FieldName::new("total");

/// A quiz item.
#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WordDto {
    #[serde(alias = "word_number")]
    pub word_number: i32,
    #[serde(default)]
    pub word: String,
    #[serde(default)]
    pub meaning: String,
}

impl From<WordDto> for WordEntry {
    fn from(value: WordDto) -> Self {
        Self {
            word_number: value.word_number,
            word: value.word,
            meaning: value.meaning,
        }
    }
}

impl From<WordEntry> for WordDto {
    fn from(value: WordEntry) -> Self {
        Self {
            word_number: value.word_number,
            word: value.word,
            meaning: value.meaning,
        }
    }
}

fn words(items: Vec<WordDto>) -> Vec<WordEntry> {
    items.into_iter().map(WordEntry::from).collect()
}

/// Body for `POST /api/results`. `mode` selects the product; vocabulary
/// quizzes omit it.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveResultRequest {
    /// `mistap` (default) or `mathtap`.
    pub mode: Option<String>,
    pub attempt_id: Option<String>,
    pub total: Option<i32>,
    pub selected_text: Option<String>,
    pub start_num: Option<i32>,
    pub end_num: Option<i32>,
    #[serde(default)]
    pub incorrect_words: Vec<WordDto>,
    #[serde(default)]
    pub correct_words: Vec<WordDto>,
    pub grade: Option<String>,
    pub unit: Option<String>,
    pub correct: Option<i32>,
    #[serde(default)]
    pub incorrect: Vec<WordDto>,
}

impl TryFrom<SaveResultRequest> for ResultSubmission {
    type Error = Error;

    fn try_from(value: SaveResultRequest) -> Result<Self, Self::Error> {
        let total = value.total.ok_or_else(|| missing_field_error(TOTAL))?;
        let attempt_id = value.attempt_id.unwrap_or_default();
        match value.mode.as_deref() {
            None | Some("" | "mistap") => Ok(Self::Mistap(MistapSubmission {
                selected_text: value.selected_text,
                start_num: value.start_num,
                end_num: value.end_num,
                total,
                incorrect_words: words(value.incorrect_words),
                correct_words: words(value.correct_words),
                attempt_id,
            })),
            Some("mathtap") => Ok(Self::Mathtap(MathtapSubmission {
                grade: value
                    .grade
                    .filter(|g| !g.trim().is_empty())
                    .ok_or_else(|| missing_field_error(GRADE))?,
                unit: value
                    .unit
                    .filter(|u| !u.trim().is_empty())
                    .ok_or_else(|| missing_field_error(UNIT))?,
                total,
                correct: value.correct.unwrap_or_default(),
                incorrect: words(value.incorrect),
                attempt_id,
            })),
            Some(other) => Err(invalid_value_error(
                MODE,
                format!("unsupported mode: {other}"),
            )),
        }
    }
}

/// A stored quiz result.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizResultDto {
    pub id: Uuid,
    pub selected_text: String,
    pub unit: Option<String>,
    pub start_num: Option<i32>,
    pub end_num: Option<i32>,
    pub total: i32,
    pub correct: i32,
    pub incorrect_count: i32,
    pub incorrect_words: Vec<WordDto>,
    pub correct_words: Vec<WordDto>,
    pub test_key: String,
    pub mode: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<QuizResult> for QuizResultDto {
    fn from(value: QuizResult) -> Self {
        Self {
            id: value.id,
            selected_text: value.selected_text,
            unit: value.unit,
            start_num: value.start_num,
            end_num: value.end_num,
            total: value.total,
            correct: value.correct,
            incorrect_count: value.incorrect_count,
            incorrect_words: value.incorrect_words.into_iter().map(WordDto::from).collect(),
            correct_words: value.correct_words.into_iter().map(WordDto::from).collect(),
            test_key: value.test_key,
            mode: value.mode,
            created_at: value.created_at,
        }
    }
}

/// Save a quiz result. Resubmitting the same attempt overwrites it.
#[utoipa::path(
    post,
    path = "/api/results",
    request_body = SaveResultRequest,
    responses(
        (status = 200, description = "Stored result", body = QuizResultDto),
        (status = 400, description = "Invalid result", body = Error),
        (status = 401, description = "Login required", body = Error)
    ),
    tags = ["results"],
    operation_id = "saveResult"
)]
#[post("/results")]
pub async fn save_result(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
    payload: web::Json<SaveResultRequest>,
) -> ApiResult<web::Json<QuizResultDto>> {
    let submission = ResultSubmission::try_from(payload.into_inner())?;
    let saved = state.results.save(viewer.0.user_id, submission).await?;
    Ok(web::Json(saved.into()))
}

/// The caller's results, newest first.
#[utoipa::path(
    get,
    path = "/api/results",
    responses(
        (status = 200, description = "Results", body = [QuizResultDto]),
        (status = 401, description = "Login required", body = Error)
    ),
    tags = ["results"],
    operation_id = "listResults"
)]
#[get("/results")]
pub async fn list_results(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
) -> ApiResult<web::Json<Vec<QuizResultDto>>> {
    let results = state.results.list(&viewer.0.user_id).await?;
    Ok(web::Json(results.into_iter().map(QuizResultDto::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::inbound::http::test_utils::TestContext;
    use actix_web::http::{StatusCode, header};
    use actix_web::{App, test as actix_test};
    use rstest::rstest;
    use serde_json::{Value, json};

    #[rstest]
    fn mathtap_requires_unit() {
        let request = SaveResultRequest {
            mode: Some("mathtap".into()),
            total: Some(5),
            grade: Some("中1".into()),
            ..SaveResultRequest::default()
        };
        let error = ResultSubmission::try_from(request).expect_err("unit missing");
        assert_eq!(error.code(), ErrorCode::InvalidRequest);
        assert_eq!(error.details().expect("details")["field"], "unit");
    }

    #[rstest]
    fn unknown_mode_is_rejected() {
        let request = SaveResultRequest {
            mode: Some("kanjitap".into()),
            total: Some(5),
            ..SaveResultRequest::default()
        };
        assert!(ResultSubmission::try_from(request).is_err());
    }

    #[actix_web::test]
    async fn same_attempt_is_stored_once() {
        let ctx = TestContext::new();
        let (token, _) = ctx.sign_up("learner@example.com").await;
        let app = actix_test::init_service(
            App::new()
                .app_data(ctx.data())
                .service(web::scope("/api").service(save_result).service(list_results)),
        )
        .await;
        let auth = (header::AUTHORIZATION, format!("Bearer {token}"));
        let body = json!({
            "selectedText": "LEAP - 1-50",
            "startNum": 1,
            "endNum": 50,
            "total": 10,
            "incorrectWords": [{"wordNumber": 3, "word": "abandon", "meaning": "捨てる"}],
            "attemptId": "attempt-1"
        });

        for _ in 0..2 {
            let res = actix_test::call_service(
                &app,
                actix_test::TestRequest::post()
                    .uri("/api/results")
                    .insert_header(auth.clone())
                    .set_json(&body)
                    .to_request(),
            )
            .await;
            assert_eq!(res.status(), StatusCode::OK);
        }

        let listed: Value = actix_test::call_and_read_body_json(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/results")
                .insert_header(auth)
                .to_request(),
        )
        .await;
        let rows = listed.as_array().expect("array");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["correct"], 9);
        assert_eq!(rows[0]["testKey"], "LEAP - 1-50::1::50::3::attempt-1");
    }

    #[actix_web::test]
    async fn guests_cannot_save() {
        let ctx = TestContext::new();
        let app = actix_test::init_service(
            App::new()
                .app_data(ctx.data())
                .service(web::scope("/api").service(save_result)),
        )
        .await;
        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/results")
                .set_json(json!({"total": 1, "attemptId": "a"}))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
