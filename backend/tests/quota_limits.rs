//! Tiered quotas observed through the mounted API.

mod support;

use actix_web::http::StatusCode;
use actix_web::test;
use edulens::domain::TRACE_ID_HEADER;
use edulens::domain::quota::ANALYSIS_GUEST_MESSAGE;
use rstest::rstest;
use serde_json::{Value, json};
use support::{IMAGE, TestApp};

const BROWSER: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_0) AppleWebKit/605.1.15";

fn basic_analysis(ip: &str) -> actix_http::Request {
    test::TestRequest::post()
        .uri("/api/analyze/basic")
        .insert_header(("x-forwarded-for", ip))
        .set_json(json!({ "images": [IMAGE], "level": "2" }))
        .to_request()
}

fn image_question(ip: &str) -> actix_http::Request {
    test::TestRequest::post()
        .uri("/api/naruhodo-lens/chat")
        .insert_header(("x-forwarded-for", ip))
        .insert_header(("user-agent", BROWSER))
        .set_json(json!({
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": "この問題の解き方を教えて"},
                    {"type": "image", "image": IMAGE}
                ]
            }]
        }))
        .to_request()
}

#[actix_web::test]
async fn guest_analysis_is_limited_per_address() {
    let ctx = TestApp::new();
    let app = test::init_service(ctx.app()).await;

    let first = test::call_service(&app, basic_analysis("198.51.100.7")).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert!(first.headers().contains_key(TRACE_ID_HEADER));
    let graded: Value = test::read_body_json(first).await;
    let total = graded["score"]["total"].as_u64().expect("score total");
    assert!((0..=16).contains(&total));

    let second = test::call_service(&app, basic_analysis("198.51.100.7")).await;
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(second.headers().contains_key("retry-after"));
    let body: Value = test::read_body_json(second).await;
    assert_eq!(body["code"], "too_many_requests");
    assert_eq!(body["message"], ANALYSIS_GUEST_MESSAGE);

    let elsewhere = test::call_service(&app, basic_analysis("198.51.100.8")).await;
    assert_eq!(elsewhere.status(), StatusCode::OK);
}

#[actix_web::test]
async fn signed_in_free_user_gets_three_analyses() {
    let ctx = TestApp::new();
    let app = test::init_service(ctx.app()).await;
    let auth = ctx.sign_in("free@example.com");

    for _ in 0..3 {
        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/analyze/basic")
                .insert_header(auth.clone())
                .set_json(json!({ "images": [IMAGE] }))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    let over = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/analyze/basic")
            .insert_header(auth)
            .set_json(json!({ "images": [IMAGE] }))
            .to_request(),
    )
    .await;
    assert_eq!(over.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[rstest]
#[case::none(json!([]))]
#[case::three(json!([IMAGE, IMAGE, IMAGE]))]
#[actix_web::test]
async fn invalid_image_counts_do_not_spend_quota(#[case] images: Value) {
    let ctx = TestApp::new();
    let app = test::init_service(ctx.app()).await;

    let rejected = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/analyze/basic")
            .insert_header(("x-forwarded-for", "192.0.2.44"))
            .set_json(json!({ "images": images }))
            .to_request(),
    )
    .await;
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);

    let accepted = test::call_service(&app, basic_analysis("192.0.2.44")).await;
    assert_eq!(accepted.status(), StatusCode::OK);
}

#[actix_web::test]
async fn guest_image_questions_are_limited() {
    let ctx = TestApp::new();
    let app = test::init_service(ctx.app()).await;

    let first = test::call_service(&app, image_question("203.0.113.50")).await;
    assert_eq!(first.status(), StatusCode::OK);
    let body = test::read_body(first).await;
    assert!(body.ends_with(b"data: [DONE]\n\n"));

    let second = test::call_service(&app, image_question("203.0.113.50")).await;
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[actix_web::test]
async fn scripted_clients_are_refused_chat() {
    let ctx = TestApp::new();
    let app = test::init_service(ctx.app()).await;

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/naruhodo-lens/chat")
            .insert_header(("user-agent", "curl/8.4.0"))
            .set_json(json!({"messages": [{"role": "user", "content": "hi"}]}))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}
