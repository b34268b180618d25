use axum::{
    body::Body,
    http::{Request, StatusCode},
};

use crate::common::{send_raw, test_app};

#[tokio::test]
async fn health_reports_store_status() {
    let app = test_app();

    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["db"], "connected");
}

#[tokio::test]
async fn docs_are_served() {
    let app = test_app();

    let req = Request::builder().uri("/docs").body(Body::empty()).unwrap();
    let (status, _, body) = send_raw(&app.router, req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_str().is_some_and(|html| html.contains("Legal Aid Intake API")));
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = test_app();

    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (_, headers, _) = send_raw(&app.router, req).await;
    assert!(headers.get("x-request-id").is_some());

    let req = Request::builder()
        .uri("/health")
        .header("x-request-id", "trace-me-123")
        .body(Body::empty())
        .unwrap();
    let (_, headers, _) = send_raw(&app.router, req).await;
    assert_eq!(headers["x-request-id"], "trace-me-123");
}

#[tokio::test]
async fn unknown_form_fields_are_rejected() {
    let app = test_app();

    let (status, body) = app
        .form(
            "POST",
            "/api/requests",
            crate::common::Form::new()
                .data(&crate::common::request_json())
                .pdf("attachments", "x.pdf"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "BadRequest");
}
