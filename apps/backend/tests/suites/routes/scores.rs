use actix_web::http::StatusCode;
use actix_web::test;
use serde_json::json;
use walls_backend::db::require_db;
use walls_backend::AppError;

use crate::common::assert_problem_details_structure;
use crate::support::fixtures::insert_level;
use crate::support::{build_test_state, create_test_app};

fn post_score(body: serde_json::Value) -> actix_http::Request {
    test::TestRequest::post()
        .uri("/api/scores")
        .set_json(body)
        .to_request()
}

#[actix_web::test]
async fn test_create_score_echoes_fields() -> Result<(), AppError> {
    let state = build_test_state().await?;
    let app = create_test_app(state).with_prod_routes().build().await?;

    let resp = test::call_service(
        &app,
        post_score(json!({"level_id": 1, "player_name": "Ada", "score": 42, "passed": true})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body["id"].as_i64().unwrap() > 0);
    assert_eq!(body["level_id"], 1);
    assert_eq!(body["player_name"], "Ada");
    assert_eq!(body["score"], 42);
    assert_eq!(body["passed"], true);
    Ok(())
}

#[actix_web::test]
async fn test_create_score_applies_defaults() -> Result<(), AppError> {
    let state = build_test_state().await?;
    let app = create_test_app(state).with_prod_routes().build().await?;

    let body: serde_json::Value =
        test::call_and_read_body_json(&app, post_score(json!({"level_id": 1}))).await;
    assert_eq!(body["score"], 0);
    assert_eq!(body["passed"], false);
    assert!(body["player_name"].is_null());
    Ok(())
}

#[actix_web::test]
async fn test_created_score_is_listed() -> Result<(), AppError> {
    let state = build_test_state().await?;
    let app = create_test_app(state).with_prod_routes().build().await?;

    let created: serde_json::Value = test::call_and_read_body_json(
        &app,
        post_score(json!({"level_id": 1, "player_name": "Lin", "score": 7})),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/scores/level/1")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = test::read_body_json(resp).await;
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], created["id"]);
    assert_eq!(rows[0]["player_name"], "Lin");
    let created_at = rows[0]["created_at"].as_str().unwrap();
    assert!(
        time::OffsetDateTime::parse(created_at, &time::format_description::well_known::Rfc3339)
            .is_ok(),
        "created_at should be RFC 3339: {created_at}"
    );
    Ok(())
}

#[actix_web::test]
async fn test_scores_ranked_high_to_low_then_newest_first() -> Result<(), AppError> {
    let state = build_test_state().await?;
    let app = create_test_app(state).with_prod_routes().build().await?;

    let mut ids = Vec::new();
    for (name, score) in [("a", 10), ("b", 30), ("c", 10), ("d", 20)] {
        let body: serde_json::Value = test::call_and_read_body_json(
            &app,
            post_score(json!({"level_id": 1, "player_name": name, "score": score})),
        )
        .await;
        ids.push(body["id"].as_i64().unwrap());
    }

    let req = test::TestRequest::get()
        .uri("/api/scores/level/1")
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["player_name"].as_str().unwrap())
        .collect();
    // "c" ties with "a" on score and was submitted later
    assert_eq!(names, vec!["b", "d", "c", "a"]);
    Ok(())
}

#[actix_web::test]
async fn test_list_scores_honors_limit() -> Result<(), AppError> {
    let state = build_test_state().await?;
    let app = create_test_app(state).with_prod_routes().build().await?;

    for score in 0..5 {
        let resp = test::call_service(
            &app,
            post_score(json!({"level_id": 1, "score": score})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let req = test::TestRequest::get()
        .uri("/api/scores/level/1?limit=2")
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let scores: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["score"].as_i64().unwrap())
        .collect();
    assert_eq!(scores, vec![4, 3]);
    Ok(())
}

#[actix_web::test]
async fn test_large_limit_returns_every_row() -> Result<(), AppError> {
    let state = build_test_state().await?;
    let app = create_test_app(state).with_prod_routes().build().await?;

    for score in 0..105 {
        let resp = test::call_service(
            &app,
            post_score(json!({"level_id": 1, "score": score})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let req = test::TestRequest::get()
        .uri("/api/scores/level/1?limit=150")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 105);
    assert_eq!(rows[0]["score"], 104);
    Ok(())
}

#[actix_web::test]
async fn test_list_scores_default_limit_is_twenty() -> Result<(), AppError> {
    let state = build_test_state().await?;
    let app = create_test_app(state).with_prod_routes().build().await?;

    for score in 0..25 {
        test::call_service(&app, post_score(json!({"level_id": 1, "score": score}))).await;
    }

    let req = test::TestRequest::get()
        .uri("/api/scores/level/1")
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.as_array().unwrap().len(), 20);
    Ok(())
}

#[actix_web::test]
async fn test_unknown_level_lists_empty() -> Result<(), AppError> {
    let state = build_test_state().await?;
    let app = create_test_app(state).with_prod_routes().build().await?;

    for level_id in ["4242", "3000000000"] {
        let req = test::TestRequest::get()
            .uri(&format!("/api/scores/level/{level_id}"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "level_id={level_id}");
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body, json!([]));
    }
    Ok(())
}

#[actix_web::test]
async fn test_scores_are_scoped_to_level() -> Result<(), AppError> {
    let state = build_test_state().await?;
    let db = require_db(&state)?.clone();
    let other = insert_level(&db, 2, "Square").await;
    let app = create_test_app(state).with_prod_routes().build().await?;

    test::call_service(&app, post_score(json!({"level_id": 1, "score": 5}))).await;
    test::call_service(&app, post_score(json!({"level_id": other.id, "score": 9}))).await;

    let req = test::TestRequest::get()
        .uri(&format!("/api/scores/level/{}", other.id))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["score"], 9);
    Ok(())
}

#[actix_web::test]
async fn test_score_for_missing_level_is_rejected_by_storage() -> Result<(), AppError> {
    let state = build_test_state().await?;
    let app = create_test_app(state).with_prod_routes().build().await?;

    let resp = test::call_service(&app, post_score(json!({"level_id": 999, "score": 1}))).await;
    assert_problem_details_structure(
        resp,
        409,
        "FK_VIOLATION",
        "Referenced record does not exist",
    )
    .await;
    Ok(())
}

#[actix_web::test]
async fn test_missing_level_id_is_400() -> Result<(), AppError> {
    let state = build_test_state().await?;
    let app = create_test_app(state).with_prod_routes().build().await?;

    let resp = test::call_service(&app, post_score(json!({"score": 1}))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "BAD_REQUEST");
    Ok(())
}

#[actix_web::test]
async fn test_non_positive_limit_is_400() -> Result<(), AppError> {
    let state = build_test_state().await?;
    let app = create_test_app(state).with_prod_routes().build().await?;

    for limit in ["0", "-1"] {
        let req = test::TestRequest::get()
            .uri(&format!("/api/scores/level/1?limit={limit}"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "limit={limit}");
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }
    Ok(())
}
