//! Content API tests: detection, normalization and stateless evaluation.

mod common;

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use common::fixtures;
use common::TestContext;

/// Normalize content and return the canonical exercise.
async fn normalized(server: &axum_test::TestServer, content: Value) -> Value {
    let response = server
        .post("/api/content/normalize")
        .json(&json!({ "content": content }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    body["exercise"].clone()
}

#[tokio::test]
async fn test_health_reports_player_count() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body, json!({ "status": "ok", "players": 0 }));
}

#[tokio::test]
async fn test_detect_single_marker() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .post("/api/content/detect")
        .json(&json!({ "content": "#completar\nVivo en *Madrid*." }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["exerciseType"], "fill_blank");
    assert_eq!(body["source"], "markers");
}

#[tokio::test]
async fn test_detect_several_markers_is_chained() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .post("/api/content/detect")
        .json(&json!({ "content": fixtures::chained_content() }))
        .await;

    let body: Value = response.json();
    assert_eq!(body["exerciseType"], "chained");
}

#[tokio::test]
async fn test_detect_explicit_type_and_shape() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let explicit: Value = server
        .post("/api/content/detect")
        .json(&json!({ "content": fixtures::matching_content() }))
        .await
        .json();
    assert_eq!(explicit["exerciseType"], "matching");
    assert_eq!(explicit["source"], "explicit");

    let shaped: Value = server
        .post("/api/content/detect")
        .json(&json!({ "content": fixtures::choice_content() }))
        .await
        .json();
    assert_eq!(shaped["exerciseType"], "multiple_choice");
    assert_eq!(shaped["source"], "shape");
}

#[tokio::test]
async fn test_detect_plain_text_falls_back() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let body: Value = server
        .post("/api/content/detect")
        .json(&json!({ "content": "Lee el texto con atención." }))
        .await
        .json();

    assert_eq!(body["exerciseType"], "text");
    assert_eq!(body["source"], "fallback");
}

#[tokio::test]
async fn test_normalize_multiple_choice() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .post("/api/content/normalize")
        .json(&json!({ "content": fixtures::choice_content() }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["exerciseType"], "multiple_choice");
    assert_eq!(body["exercise"]["type"], "multiple_choice");
    assert_eq!(
        body["exercise"]["content"]["questions"][0]["question"],
        "¿Capital de España?"
    );
}

#[tokio::test]
async fn test_normalize_with_forced_type() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .post("/api/content/normalize")
        .json(&json!({
            "content": "perro = dog\ngato = cat",
            "exerciseType": "matching"
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["exerciseType"], "matching");
    assert_eq!(
        body["exercise"]["content"]["pairs"].as_array().unwrap().len(),
        2
    );
}

#[tokio::test]
async fn test_normalize_malformed_content_is_bad_request() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .post("/api/content/normalize")
        .json(&json!({ "content": fixtures::broken_matching_content() }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "invalid_content");
}

#[tokio::test]
async fn test_evaluate_matching_connections() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let exercise = normalized(&server, fixtures::matching_content()).await;

    let response = server
        .post("/api/evaluate")
        .json(&json!({
            "exercise": exercise,
            "answer": { "kind": "connections", "value": { "0": 0, "1": 1 } }
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "correct");
    assert_eq!(body["points"], 10);
}

#[tokio::test]
async fn test_evaluate_partial_matching_with_overrides() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let exercise = normalized(&server, fixtures::matching_content()).await;

    let body: Value = server
        .post("/api/evaluate")
        .json(&json!({
            "exercise": exercise,
            "answer": { "kind": "connections", "value": { "0": 0, "1": 0 } },
            "overrides": { "partialPoints": 3 }
        }))
        .await
        .json();

    assert_eq!(body["status"], "partial");
    assert_eq!(body["points"], 3);
}

#[tokio::test]
async fn test_evaluate_without_answer_is_incorrect() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let exercise = normalized(&server, fixtures::choice_content()).await;

    let body: Value = server
        .post("/api/evaluate")
        .json(&json!({ "exercise": exercise }))
        .await
        .json();

    assert_eq!(body["status"], "incorrect");
    assert_eq!(body["detail"]["type"], "unanswered");
    assert_eq!(body["points"], 0);
}

#[tokio::test]
async fn test_evaluate_wrong_shape_is_unprocessable() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let exercise = normalized(&server, fixtures::choice_content()).await;

    let response = server
        .post("/api/evaluate")
        .json(&json!({
            "exercise": exercise,
            "answer": { "kind": "clicks", "value": [0] }
        }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["error"], "exercise_error");
}

#[tokio::test]
async fn test_evaluate_missing_question_is_not_found() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let exercise = normalized(&server, fixtures::choice_content()).await;

    let response = server
        .post("/api/evaluate")
        .json(&json!({
            "exercise": exercise,
            "answer": { "kind": "choice", "value": 1 },
            "question": 3
        }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}
