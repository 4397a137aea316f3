use actix_web::http::header::CONTENT_TYPE;
use actix_web::http::StatusCode;
use actix_web::test;
use base64::Engine as _;
use walls_backend::AppError;

use crate::common::{assert_problem_details_contains, assert_problem_details_structure};
use crate::support::fixtures::{jpeg_bytes, multipart_body, png_bytes, Part};
use crate::support::pose_stub::{
    broken_inference_service, empty_scene_service, missing_model_service, KEPT_KEYPOINTS,
};
use crate::support::test_state::build_test_state_with_pose;
use crate::support::{build_test_state, create_test_app};

fn detect_request(parts: &[Part<'_>]) -> actix_http::Request {
    let (content_type, body) = multipart_body(parts);
    test::TestRequest::post()
        .uri("/api/pose/detect")
        .insert_header((CONTENT_TYPE, content_type))
        .set_payload(body)
        .to_request()
}

#[actix_web::test]
async fn test_detect_single_person() -> Result<(), AppError> {
    let state = build_test_state().await?;
    let app = create_test_app(state).with_prod_routes().build().await?;

    let image = jpeg_bytes(64, 48);
    let resp = test::call_service(
        &app,
        detect_request(&[Part::file(&image, Some("image/jpeg"))]),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["image_width"], 64);
    assert_eq!(body["image_height"], 48);
    assert_eq!(body["num_persons"], 1);

    let keypoints = body["keypoints"].as_array().unwrap();
    assert_eq!(keypoints.len(), KEPT_KEYPOINTS);
    for kp in keypoints {
        let triple = kp.as_array().unwrap();
        assert_eq!(triple.len(), 3);
        let x = triple[0].as_f64().unwrap();
        let y = triple[1].as_f64().unwrap();
        let conf = triple[2].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&x), "x out of range: {x}");
        assert!((0.0..=1.0).contains(&y), "y out of range: {y}");
        assert!(conf > 0.25);
    }
    // Nose was reported left of the frame
    assert_eq!(keypoints[0][0], 0.0);

    let persons = body["persons"].as_array().unwrap();
    assert_eq!(persons.len(), 1);
    assert_eq!(persons[0]["landmarks"][0]["name"], "nose");

    let encoded = body["annotated_image_base64"].as_str().unwrap();
    let jpeg = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .expect("annotated image is base64");
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8], "annotated image is a JPEG");
    Ok(())
}

#[actix_web::test]
async fn test_detect_accepts_png_and_octet_stream() -> Result<(), AppError> {
    let state = build_test_state().await?;
    let app = create_test_app(state).with_prod_routes().build().await?;

    let image = png_bytes(32, 32);
    let resp = test::call_service(
        &app,
        detect_request(&[Part::file(&image, Some("application/octet-stream"))]),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["image_width"], 32);
    Ok(())
}

#[actix_web::test]
async fn test_detect_accepts_missing_content_type() -> Result<(), AppError> {
    let state = build_test_state().await?;
    let app = create_test_app(state).with_prod_routes().build().await?;

    let image = jpeg_bytes(16, 16);
    let resp = test::call_service(&app, detect_request(&[Part::file(&image, None)])).await;
    assert_eq!(resp.status(), StatusCode::OK);
    Ok(())
}

#[actix_web::test]
async fn test_detect_empty_scene() -> Result<(), AppError> {
    let state = build_test_state_with_pose(empty_scene_service()).await?;
    let app = create_test_app(state).with_prod_routes().build().await?;

    let image = jpeg_bytes(40, 30);
    let body: serde_json::Value = test::call_and_read_body_json(
        &app,
        detect_request(&[Part::file(&image, Some("image/jpeg"))]),
    )
    .await;
    assert_eq!(body["num_persons"], 0);
    assert_eq!(body["keypoints"], serde_json::json!([]));
    assert_eq!(body["image_width"], 40);
    // Still annotated (just the frame)
    assert!(!body["annotated_image_base64"].as_str().unwrap().is_empty());
    Ok(())
}

#[actix_web::test]
async fn test_undecodable_image_yields_empty_result() -> Result<(), AppError> {
    let state = build_test_state().await?;
    let app = create_test_app(state).with_prod_routes().build().await?;

    let garbage = b"definitely not an image".to_vec();
    let resp = test::call_service(
        &app,
        detect_request(&[Part::file(&garbage, Some("image/jpeg"))]),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["num_persons"], 0);
    assert_eq!(body["image_width"], 0);
    assert_eq!(body["image_height"], 0);
    assert_eq!(body["annotated_image_base64"], "");
    Ok(())
}

#[actix_web::test]
async fn test_non_image_content_type_is_400() -> Result<(), AppError> {
    let state = build_test_state().await?;
    let app = create_test_app(state).with_prod_routes().build().await?;

    let resp = test::call_service(
        &app,
        detect_request(&[Part::file(b"hello", Some("text/plain"))]),
    )
    .await;
    assert_problem_details_structure(
        resp,
        400,
        "INVALID_CONTENT_TYPE",
        "Please upload an image file",
    )
    .await;
    Ok(())
}

#[actix_web::test]
async fn test_empty_upload_is_400() -> Result<(), AppError> {
    let state = build_test_state().await?;
    let app = create_test_app(state).with_prod_routes().build().await?;

    let resp = test::call_service(&app, detect_request(&[Part::file(b"", Some("image/png"))])).await;
    assert_problem_details_structure(resp, 400, "EMPTY_UPLOAD", "Uploaded file is empty").await;
    Ok(())
}

#[actix_web::test]
async fn test_missing_file_field_is_400() -> Result<(), AppError> {
    let state = build_test_state().await?;
    let app = create_test_app(state).with_prod_routes().build().await?;

    let image = jpeg_bytes(8, 8);
    let resp = test::call_service(
        &app,
        detect_request(&[Part {
            name: "image",
            filename: Some("frame.jpg"),
            content_type: Some("image/jpeg"),
            data: &image,
        }]),
    )
    .await;
    assert_problem_details_structure(resp, 400, "BAD_REQUEST", "Missing multipart field 'file'")
        .await;
    Ok(())
}

#[actix_web::test]
async fn test_extra_fields_before_file_are_ignored() -> Result<(), AppError> {
    let state = build_test_state().await?;
    let app = create_test_app(state).with_prod_routes().build().await?;

    let image = jpeg_bytes(8, 8);
    let resp = test::call_service(
        &app,
        detect_request(&[
            Part {
                name: "note",
                filename: None,
                content_type: None,
                data: b"hi",
            },
            Part::file(&image, Some("image/jpeg")),
        ]),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    Ok(())
}

#[actix_web::test]
async fn test_model_load_failure_is_500() -> Result<(), AppError> {
    let state = build_test_state_with_pose(missing_model_service()).await?;
    let app = create_test_app(state).with_prod_routes().build().await?;

    let image = jpeg_bytes(8, 8);
    let resp = test::call_service(
        &app,
        detect_request(&[Part::file(&image, Some("image/jpeg"))]),
    )
    .await;
    assert_problem_details_contains(
        resp,
        500,
        "POSE_DETECTION_FAILED",
        "detection failed: model load failed: model file not found",
    )
    .await;
    Ok(())
}

#[actix_web::test]
async fn test_inference_failure_is_500() -> Result<(), AppError> {
    let state = build_test_state_with_pose(broken_inference_service()).await?;
    let app = create_test_app(state).with_prod_routes().build().await?;

    let image = jpeg_bytes(8, 8);
    let resp = test::call_service(
        &app,
        detect_request(&[Part::file(&image, Some("image/jpeg"))]),
    )
    .await;
    assert_problem_details_contains(resp, 500, "POSE_DETECTION_FAILED", "detection failed: ").await;
    Ok(())
}
