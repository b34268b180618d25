use axum::http::StatusCode;
use serde_json::json;

use crate::common::{request_json, test_app, Form};

fn lawyer_payload(email: &str) -> serde_json::Value {
    json!({
        "full_name": "Av. Elif Demir",
        "telephone": "05559876543",
        "email": email,
        "password": "s3cure-password",
        "role": "lawyer",
        "baro_registration_number": 3391
    })
}

#[tokio::test]
async fn admin_creates_lawyer_who_can_log_in() {
    let app = test_app();
    let (_, admin) = app.admin().await;

    let (status, body) = app
        .json("POST", "/api/users", &lawyer_payload("Elif@Example.org"), Some(&admin))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["email"], "elif@example.org");
    assert_eq!(body["role"], "lawyer");
    assert_eq!(body["status"], "active");
    assert!(body.get("password_hash").is_none());

    let (status, _) = app
        .json(
            "POST",
            "/api/auth/login",
            &json!({ "email": "elif@example.org", "password": "s3cure-password" }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let app = test_app();
    let (_, admin) = app.admin().await;

    let (status, _) = app
        .json("POST", "/api/users", &lawyer_payload("dup@example.org"), Some(&admin))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = app
        .json("POST", "/api/users", &lawyer_payload("DUP@example.org"), Some(&admin))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "Conflict");
}

#[tokio::test]
async fn lawyer_needs_a_bar_number() {
    let app = test_app();
    let (_, admin) = app.admin().await;

    let mut payload = lawyer_payload("nobar@example.org");
    payload["baro_registration_number"] = json!(null);
    let (status, body) = app.json("POST", "/api/users", &payload, Some(&admin)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["field_errors"]["baro_registration_number"].is_string());
}

#[tokio::test]
async fn user_management_is_admin_only() {
    let app = test_app();
    let (_, lawyer) = app.lawyer().await;

    let (status, _) = app.get("/api/users", Some(&lawyer)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .json("POST", "/api/users", &lawyer_payload("x@example.org"), Some(&lawyer))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn list_filters_by_role() {
    let app = test_app();
    let (_, admin) = app.admin().await;
    app.lawyer().await;
    app.lawyer().await;

    let (status, body) = app.get("/api/users?role=lawyer", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = app.get("/api/users", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);

    let (status, _) = app.get("/api/users?role=clerk", Some(&admin)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn users_read_and_edit_only_themselves() {
    let app = test_app();
    let (me, my_token) = app.lawyer().await;
    let (other, _) = app.lawyer().await;

    let (status, _) = app.get(&format!("/api/users/{}", me.id), Some(&my_token)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .get(&format!("/api/users/{}", other.id), Some(&my_token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .json(
            "PATCH",
            &format!("/api/users/{}", me.id),
            &json!({ "full_name": "Renamed Lawyer" }),
            Some(&my_token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["full_name"], "Renamed Lawyer");

    let (status, _) = app
        .json(
            "PATCH",
            &format!("/api/users/{}", me.id),
            &json!({ "role": "admin" }),
            Some(&my_token),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .json(
            "PATCH",
            &format!("/api/users/{}", other.id),
            &json!({ "full_name": "Hijacked" }),
            Some(&my_token),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn role_change_is_blocked_while_user_holds_requests() {
    let app = test_app();
    let (_, admin) = app.admin().await;
    let (lawyer, _) = app.lawyer().await;

    let mut data = request_json();
    data["assigned_lawyer"] = json!(lawyer.id.to_string());
    app.create_request(data, Some(&admin)).await;

    let (status, body) = app
        .json(
            "PATCH",
            &format!("/api/users/{}", lawyer.id),
            &json!({ "role": "admin" }),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "Conflict");
}

#[tokio::test]
async fn deleting_a_user_clears_request_references() {
    let app = test_app();
    let (_, admin) = app.admin().await;
    let (lawyer, _) = app.lawyer().await;

    let mut data = request_json();
    data["assigned_lawyer"] = json!(lawyer.id.to_string());
    let request_id = app.create_request(data, Some(&admin)).await;

    let (status, _) = app
        .delete(&format!("/api/users/{}", lawyer.id), Some(&admin))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, request) = app
        .get(&format!("/api/requests/{request_id}"), Some(&admin))
        .await;
    assert_eq!(request["assigned_lawyer"], serde_json::Value::Null);
}

#[tokio::test]
async fn case_lawyer_and_self_cannot_be_deleted() {
    let app = test_app();
    let (admin, admin_token) = app.admin().await;
    let (lawyer, lawyer_token) = app.lawyer().await;
    let request_id = app.approved_request(&admin_token).await;
    app.create_case(&request_id, &lawyer_token, Form::new()).await;

    let (status, _) = app
        .delete(&format!("/api/users/{}", lawyer.id), Some(&admin_token))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .delete(&format!("/api/users/{}", admin.id), Some(&admin_token))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}
