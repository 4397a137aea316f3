#![allow(dead_code)]

// tests/common/mod.rs
use actix_web::body::BoxBody;
use actix_web::dev::ServiceResponse;
use actix_web::http::header::{HeaderName, CONTENT_TYPE};
use actix_web::http::StatusCode;
use actix_web::test;
use serde_json::Value;

pub mod proptest_prelude;

// Logging is auto-installed for every test binary that pulls in `common`
#[ctor::ctor]
fn init_logging() {
    backend_test_support::logging::init();
}

/// The trace_id in the body must match the X-Trace-Id header.
pub fn assert_trace_id_matches(json: &Value, header_trace_id: &str) {
    let trace_id_in_body = json["trace_id"]
        .as_str()
        .expect("trace_id field should be a string");
    assert_eq!(
        trace_id_in_body, header_trace_id,
        "trace_id in body should match X-Trace-Id header"
    );
}

/// Validate a ProblemDetails error response end to end.
pub async fn assert_problem_details_structure(
    resp: ServiceResponse<BoxBody>,
    expected_status: u16,
    expected_code: &str,
    expected_detail: &str,
) {
    assert_eq!(resp.status().as_u16(), expected_status);

    let headers = resp.headers().clone();

    let trace_hdr = HeaderName::from_static("x-trace-id");
    let trace_id = headers
        .get(&trace_hdr)
        .and_then(|v| v.to_str().ok())
        .expect("X-Trace-Id header should be present and valid UTF-8");
    assert!(
        !trace_id.is_empty(),
        "X-Trace-Id header should not be empty"
    );

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(
        content_type.starts_with("application/problem+json"),
        "Content-Type must be application/problem+json (got {content_type})"
    );

    let body = test::read_body(resp).await;
    let body_str = std::str::from_utf8(&body).expect("Response body should be valid UTF-8");

    let problem_details: Value = serde_json::from_str(body_str).unwrap_or_else(|_| {
        panic!("Failed to parse error body as ProblemDetails. Raw body: {body_str}")
    });

    for key in ["type", "title", "status", "detail", "code", "trace_id"] {
        assert!(
            problem_details.get(key).is_some(),
            "{key} field should be present"
        );
    }

    assert_eq!(problem_details["code"], expected_code);
    assert_eq!(problem_details["detail"], expected_detail);
    assert_eq!(problem_details["status"], expected_status);

    assert_trace_id_matches(&problem_details, trace_id);

    let type_value = problem_details["type"]
        .as_str()
        .expect("type field should be a string");
    assert_eq!(
        type_value,
        format!("https://wallsincoming.app/errors/{expected_code}")
    );
}

/// Looser check for details that embed runtime text (paths, upstream errors).
pub async fn assert_problem_details_contains(
    resp: ServiceResponse<BoxBody>,
    expected_status: u16,
    expected_code: &str,
    detail_fragment: &str,
) {
    let status =
        StatusCode::from_u16(expected_status).expect("expected_status should be a valid status");
    backend_test_support::problem_details::assert_problem_details_from_service_response(
        resp,
        expected_code,
        status,
        Some(detail_fragment),
    )
    .await;
}
