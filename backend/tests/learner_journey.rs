//! A learner's day through the mounted API: profile, quizzes, review, and a
//! study group ranking.

mod support;

use actix_web::http::StatusCode;
use actix_web::test;
use serde_json::{Value, json};
use support::TestApp;

fn missed(attempt: &str, word_number: i32) -> Value {
    json!({
        "selectedText": "システム英単語 - 1-100",
        "startNum": 1,
        "endNum": 100,
        "total": 20,
        "incorrectWords": [{"wordNumber": word_number, "word": "consider", "meaning": "考える"}],
        "attemptId": attempt
    })
}

#[actix_web::test]
async fn quiz_results_feed_review_and_rankings() {
    let ctx = TestApp::new();
    let app = test::init_service(ctx.app()).await;
    let learner = ctx.sign_in("learner@example.com");
    let friend = ctx.sign_in("friend@example.com");

    let profile: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri("/api/profile/me")
            .insert_header(learner.clone())
            .to_request(),
    )
    .await;
    assert_eq!(profile["role"], "student");
    assert_eq!(profile["testCount"], 0);
    assert!(profile.get("stripeCustomerId").is_none());

    for _ in 0..2 {
        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/profile/me/tests")
                .insert_header(learner.clone())
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
    }

    // The retried submission overwrites the first; a second attempt is new.
    for (attempt, word) in [("morning", 12), ("morning", 12), ("evening", 12)] {
        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/results")
                .insert_header(learner.clone())
                .set_json(missed(attempt, word))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    let results: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri("/api/results")
            .insert_header(learner.clone())
            .to_request(),
    )
    .await;
    let rows = results.as_array().expect("results array");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["selectedText"], "システム英単語");
    assert_eq!(rows[0]["unit"], "1 100");

    let grouped: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri("/api/review/weak-words")
            .insert_header(learner.clone())
            .to_request(),
    )
    .await;
    assert_eq!(grouped[0]["textbook"], "システム英単語");
    assert_eq!(grouped[0]["words"][0]["wrongCount"], 2);
    assert_eq!(grouped[0]["words"][0]["category"], "frequent");

    let group: Value = test::read_body_json(
        test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/groups")
                .insert_header(learner.clone())
                .set_json(json!({"name": "英検2級組"}))
                .to_request(),
        )
        .await,
    )
    .await;
    let code = group["inviteCode"].as_str().expect("invite code");

    let joined: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri("/api/groups/join")
            .insert_header(friend.clone())
            .set_json(json!({"inviteCode": code}))
            .to_request(),
    )
    .await;
    assert_eq!(joined["joined"], true);

    let ranking: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/groups/{}/ranking", group["id"].as_str().expect("id")))
            .insert_header(friend)
            .to_request(),
    )
    .await;
    let entries = ranking.as_array().expect("ranking array");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["rank"], 1);
    assert_eq!(entries[0]["testCount"], 2);
}

#[actix_web::test]
async fn protected_routes_reject_guests() {
    let ctx = TestApp::new();
    let app = test::init_service(ctx.app()).await;

    for uri in ["/api/profile/me", "/api/results", "/api/groups", "/api/school/tasks"] {
        let res = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{uri}");
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["code"], "unauthorized");
    }
}

#[actix_web::test]
async fn public_reads_need_no_token() {
    let ctx = TestApp::new();
    let app = test::init_service(ctx.app()).await;

    for uri in ["/api/subjects", "/api/announcements", "/api/blogs", "/api/community/posts"] {
        let res = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(res.status(), StatusCode::OK, "{uri}");
    }
}

#[actix_web::test]
async fn school_test_scores_and_countdowns_are_mounted() {
    let ctx = TestApp::new();
    let app = test::init_service(ctx.app()).await;
    let learner = ctx.sign_in("learner@example.com");

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/school/test-results")
            .insert_header(learner.clone())
            .set_json(json!({
                "testName": "2学期期末テスト",
                "testDate": "2026-12-04",
                "scores": {"english": 82, "math": 74, "japanese": 68}
            }))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let records: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri("/api/school/test-results")
            .insert_header(learner.clone())
            .to_request(),
    )
    .await;
    assert_eq!(records[0]["total5"], 224);
    assert_eq!(records[0]["total9"], 224);

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/school/test-results")
            .insert_header(learner)
            .set_json(json!({"testName": "小テスト", "testDate": "2026-12-10", "scores": {"math": 120}}))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let countdowns: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/api/countdowns/eiken").to_request(),
    )
    .await;
    assert_eq!(countdowns, json!([]));
}
