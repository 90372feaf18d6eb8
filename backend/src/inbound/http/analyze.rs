//! Composition grading endpoints.
//!
//! ```text
//! POST /api/analyze/basic  {"images":["data:image/jpeg;base64,..."],"level":"2"}
//! POST /api/analyze/detail {"transcribedText":"I think ...","examType":"eiken"}
//! POST /api/analyze        {"images":["..."],"problemType":"email"}
//! ```

use actix_web::{HttpRequest, post, web};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::exam::{EikenLevel, ExamSettings, ExamType, ProblemType};
use crate::domain::grading::{
    BasicAnalysis, DetailAnalysis, FullAnalysis, ImageSubmission, MAX_IMAGES, SubmissionError,
    TextSubmission,
};
use crate::domain::{Error, Viewer};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::MaybeViewer;
use crate::inbound::http::client::client_ip;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, invalid_value_error, missing_field_error, out_of_range_error};

const IMAGES: FieldName = FieldName::new("images");
const TRANSCRIBED_TEXT: FieldName = FieldName::new("transcribedText");
const EXAM_TYPE: FieldName = FieldName::new("examType");
const PROBLEM_TYPE: FieldName = FieldName::new("problemType");

/// Exam settings shared by every grading request.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExamSettingsRequest {
    /// Eiken grade code; defaults to `2`.
    pub level: Option<String>,
    /// `eiken` (default) or `university`.
    pub exam_type: Option<String>,
    /// `opinion` (default), `summary`, or `email`.
    pub problem_type: Option<String>,
    pub university_name: Option<String>,
    pub word_limit: Option<String>,
}

impl ExamSettingsRequest {
    fn into_settings(self) -> ApiResult<ExamSettings> {
        let exam_type = match self.exam_type.as_deref().filter(|v| !v.is_empty()) {
            Some(raw) => raw.parse::<ExamType>().map_err(|err| {
                invalid_value_error(EXAM_TYPE, format!("examType: {err}"))
            })?,
            None => ExamType::default(),
        };
        let problem_type = match self.problem_type.as_deref().filter(|v| !v.is_empty()) {
            Some(raw) => raw.parse::<ProblemType>().map_err(|err| {
                invalid_value_error(PROBLEM_TYPE, format!("problemType: {err}"))
            })?,
            None => ProblemType::default(),
        };
        Ok(ExamSettings {
            exam_type,
            level: EikenLevel::from_request(self.level.as_deref()),
            problem_type,
            university_name: self.university_name.filter(|name| !name.trim().is_empty()),
            word_limit: self.word_limit.filter(|limit| !limit.trim().is_empty()),
        })
    }
}

/// Body for the image-based endpoints.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnalysisRequest {
    /// One or two base64 images, optionally as data URLs.
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(flatten)]
    pub settings: ExamSettingsRequest,
}

/// Body for `POST /api/analyze/detail`.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DetailAnalysisRequest {
    pub transcribed_text: Option<String>,
    #[serde(flatten)]
    pub settings: ExamSettingsRequest,
}

fn map_submission_error(error: SubmissionError) -> Error {
    match error {
        SubmissionError::NoImages | SubmissionError::TooManyImages { .. } => {
            out_of_range_error(IMAGES, format!("images must hold 1 to {MAX_IMAGES} items"))
        }
        SubmissionError::InvalidImage { index } => {
            invalid_value_error(IMAGES, format!("image {index} is not valid base64"))
        }
        SubmissionError::EmptyText => missing_field_error(TRANSCRIBED_TEXT),
    }
}

fn image_submission(body: ImageAnalysisRequest) -> ApiResult<ImageSubmission> {
    let settings = body.settings.into_settings()?;
    ImageSubmission::new(&body.images, settings).map_err(map_submission_error)
}

/// Transcribe and score a handwritten composition.
///
/// Metered per plan tier. Counts a writing check for signed-in callers.
#[utoipa::path(
    post,
    path = "/api/analyze/basic",
    request_body = ImageAnalysisRequest,
    responses(
        (status = 200, description = "Transcription and score"),
        (status = 400, description = "Invalid request", body = Error),
        (status = 429, description = "Daily quota exhausted", body = Error),
        (status = 500, description = "Grading failed", body = Error)
    ),
    tags = ["analyze"],
    operation_id = "analyzeBasic"
)]
#[post("/analyze/basic")]
pub async fn analyze_basic(
    state: web::Data<HttpState>,
    viewer: MaybeViewer,
    req: HttpRequest,
    payload: web::Json<ImageAnalysisRequest>,
) -> ApiResult<web::Json<BasicAnalysis>> {
    let submission = image_submission(payload.into_inner())?;
    let viewer: Option<Viewer> = viewer.0;
    state
        .quota
        .check_analysis(viewer.as_ref(), &client_ip(&req))
        .await?;

    let analysis = state.grading.analyze_basic(&submission).await?;
    if let Some(viewer) = viewer {
        // Detached: the response does not wait for the counter.
        drop(state.usage.record_writing_check(viewer.user_id));
    } else {
        debug!("guest analysis; no writing check recorded");
    }
    Ok(web::Json(analysis))
}

/// Corrections, advice, and a model answer for transcribed text.
#[utoipa::path(
    post,
    path = "/api/analyze/detail",
    request_body = DetailAnalysisRequest,
    responses(
        (status = 200, description = "Corrections and model answer"),
        (status = 400, description = "Invalid request", body = Error),
        (status = 500, description = "Grading failed", body = Error)
    ),
    tags = ["analyze"],
    operation_id = "analyzeDetail"
)]
#[post("/analyze/detail")]
pub async fn analyze_detail(
    state: web::Data<HttpState>,
    payload: web::Json<DetailAnalysisRequest>,
) -> ApiResult<web::Json<DetailAnalysis>> {
    let body = payload.into_inner();
    let settings = body.settings.into_settings()?;
    let submission = TextSubmission::new(body.transcribed_text.as_deref().unwrap_or_default(), settings)
        .map_err(map_submission_error)?;
    let analysis = state.grading.analyze_detail(&submission).await?;
    Ok(web::Json(analysis))
}

/// Full analysis in a single model call.
#[utoipa::path(
    post,
    path = "/api/analyze",
    request_body = ImageAnalysisRequest,
    responses(
        (status = 200, description = "Transcription, score, and corrections"),
        (status = 400, description = "Invalid request", body = Error),
        (status = 500, description = "Grading failed", body = Error)
    ),
    tags = ["analyze"],
    operation_id = "analyzeFull"
)]
#[post("/analyze")]
pub async fn analyze_full(
    state: web::Data<HttpState>,
    payload: web::Json<ImageAnalysisRequest>,
) -> ApiResult<web::Json<FullAnalysis>> {
    let submission = image_submission(payload.into_inner())?;
    let analysis = state.grading.analyze_full(&submission).await?;
    Ok(web::Json(analysis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbound::http::test_utils::TestContext;
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use rstest::rstest;
    use serde_json::{Value, json};

    const PNG: &str = "data:image/png;base64,aGVsbG8=";

    fn app_for(
        ctx: &TestContext,
    ) -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        > + use<>,
    > {
        App::new().app_data(ctx.data()).service(
            web::scope("/api")
                .service(analyze_basic)
                .service(analyze_detail)
                .service(analyze_full),
        )
    }

    #[rstest]
    #[case::none(json!([]))]
    #[case::three(json!([PNG, PNG, PNG]))]
    #[actix_web::test]
    async fn image_count_outside_range_is_rejected(#[case] images: Value) {
        let ctx = TestContext::new();
        let app = test::init_service(app_for(&ctx)).await;
        let request = test::TestRequest::post()
            .uri("/api/analyze")
            .set_json(json!({ "images": images }))
            .to_request();
        let res = test::call_service(&app, request).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["details"]["field"], "images");
    }

    #[actix_web::test]
    async fn unknown_exam_type_is_rejected() {
        let ctx = TestContext::new();
        let app = test::init_service(app_for(&ctx)).await;
        let request = test::TestRequest::post()
            .uri("/api/analyze/basic")
            .set_json(json!({ "images": [PNG], "examType": "toefl" }))
            .to_request();
        let res = test::call_service(&app, request).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn guest_gets_one_basic_analysis_per_day() {
        let ctx = TestContext::new();
        let app = test::init_service(app_for(&ctx)).await;
        let call = || {
            test::TestRequest::post()
                .uri("/api/analyze/basic")
                .insert_header(("x-forwarded-for", "203.0.113.9"))
                .set_json(json!({ "images": [PNG], "level": "2" }))
                .to_request()
        };

        let first = test::call_service(&app, call()).await;
        assert_eq!(first.status(), StatusCode::OK);
        let body: Value = test::read_body_json(first).await;
        let total = body["score"]["total"].as_u64().expect("total");
        assert!(total <= 16);

        let second = test::call_service(&app, call()).await;
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[actix_web::test]
    async fn detail_requires_text() {
        let ctx = TestContext::new();
        let app = test::init_service(app_for(&ctx)).await;
        let request = test::TestRequest::post()
            .uri("/api/analyze/detail")
            .set_json(json!({ "transcribedText": "  " }))
            .to_request();
        let res = test::call_service(&app, request).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["details"]["field"], "transcribedText");
    }

    #[actix_web::test]
    async fn detail_is_not_metered() {
        let ctx = TestContext::new();
        let app = test::init_service(app_for(&ctx)).await;
        for _ in 0..3 {
            let request = test::TestRequest::post()
                .uri("/api/analyze/detail")
                .set_json(json!({ "transcribedText": "I think students should read more." }))
                .to_request();
            let res = test::call_service(&app, request).await;
            assert_eq!(res.status(), StatusCode::OK);
        }
    }
}
