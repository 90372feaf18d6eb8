//! Weak-word review endpoints.
//!
//! ```text
//! GET  /api/review/weak-words?textbook=LEAP
//! POST /api/review/tests {"textbook":"LEAP","includeSingle":true,"startNum":1,"endNum":100,"count":20}
//! ```

use actix_web::{get, post, web};
use serde::{Deserialize, Serialize};

use crate::domain::Error;
use crate::domain::review_service::ReviewTest;
use crate::domain::weak_words::{ReviewFilter, TextbookWeakWords};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::CurrentViewer;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, out_of_range_error, require_text};

const TEXTBOOK: FieldName = FieldName::new("textbook");
const COUNT: FieldName = FieldName::new("count");
const RANGE: FieldName = FieldName::new("startNum");
const MAX_REVIEW_COUNT: usize = 100;

/// Query for `GET /api/review/weak-words`.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct WeakWordsQuery {
    /// Narrow the listing to one textbook.
    pub textbook: Option<String>,
}

/// Body for `POST /api/review/tests`.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewTestRequest {
    pub textbook: Option<String>,
    pub include_recent: Option<bool>,
    pub include_frequent: Option<bool>,
    pub include_single: Option<bool>,
    pub start_num: Option<i32>,
    pub end_num: Option<i32>,
    pub count: Option<usize>,
}

impl ReviewTestRequest {
    fn filter(&self) -> ApiResult<ReviewFilter> {
        let defaults = ReviewFilter::default();
        let count = self.count.unwrap_or(defaults.count);
        if count == 0 || count > MAX_REVIEW_COUNT {
            return Err(out_of_range_error(
                COUNT,
                format!("count must be between 1 and {MAX_REVIEW_COUNT}"),
            ));
        }
        let range = match (self.start_num, self.end_num) {
            (Some(start), Some(end)) if start > end => {
                return Err(out_of_range_error(RANGE, "startNum must not exceed endNum"));
            }
            (Some(start), Some(end)) => Some((start, end)),
            (Some(start), None) => Some((start, i32::MAX)),
            (None, Some(end)) => Some((i32::MIN, end)),
            (None, None) => None,
        };
        Ok(ReviewFilter {
            include_recent: self.include_recent.unwrap_or(defaults.include_recent),
            include_frequent: self.include_frequent.unwrap_or(defaults.include_frequent),
            include_single: self.include_single.unwrap_or(defaults.include_single),
            range,
            count,
        })
    }
}

/// Aggregated weak words grouped by textbook.
#[utoipa::path(
    get,
    path = "/api/review/weak-words",
    params(WeakWordsQuery),
    responses(
        (status = 200, description = "Weak words per textbook"),
        (status = 401, description = "Login required", body = Error)
    ),
    tags = ["review"],
    operation_id = "listWeakWords"
)]
#[get("/review/weak-words")]
pub async fn weak_words(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
    query: web::Query<WeakWordsQuery>,
) -> ApiResult<web::Json<Vec<TextbookWeakWords>>> {
    let grouped = state
        .review
        .weak_words(&viewer.0.user_id, query.textbook.as_deref())
        .await?;
    Ok(web::Json(grouped))
}

/// Sample a review test from the caller's weak words.
#[utoipa::path(
    post,
    path = "/api/review/tests",
    request_body = ReviewTestRequest,
    responses(
        (status = 200, description = "Sampled review test"),
        (status = 400, description = "Invalid filter or no matching words", body = Error),
        (status = 401, description = "Login required", body = Error),
        (status = 404, description = "No weak words for the textbook", body = Error)
    ),
    tags = ["review"],
    operation_id = "createReviewTest"
)]
#[post("/review/tests")]
pub async fn create_review_test(
    state: web::Data<HttpState>,
    viewer: CurrentViewer,
    payload: web::Json<ReviewTestRequest>,
) -> ApiResult<web::Json<ReviewTest>> {
    let body = payload.into_inner();
    let filter = body.filter()?;
    let textbook = require_text(body.textbook, TEXTBOOK)?;
    let test = state
        .review
        .create_test(&viewer.0.user_id, &textbook, &filter)
        .await?;
    Ok(web::Json(test))
}
