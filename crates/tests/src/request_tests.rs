use axum::http::StatusCode;
use serde_json::json;

use crate::common::{incident_json, key_of, request_json, test_app, Form};

#[tokio::test]
async fn public_intake_creates_pending_request_with_submissions() {
    let app = test_app();

    let mut data = request_json();
    data["submission_descriptions"] = json!(["Detention record"]);
    let form = Form::new()
        .data(&data)
        .pdf("submissions", "record.pdf")
        .pdf("submissions", "statement.pdf");

    let (status, body) = app.form("POST", "/api/requests", form, None).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["status"], "pending");
    assert_eq!(body["received_by"], serde_json::Value::Null);

    let submissions = body["submissions"].as_array().unwrap();
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[0]["document_description"], "Detention record");
    assert_eq!(submissions[1]["document_description"], "No description provided");

    let keys = app.objects.keys().await;
    assert_eq!(keys.len(), 2);
    for submission in submissions {
        let key = key_of(submission["document"].as_str().unwrap());
        assert!(key.starts_with("requests/"), "{key}");
        assert!(app.objects.contains(&key).await);
    }
}

#[tokio::test]
async fn intake_with_incident_links_both_documents() {
    let app = test_app();
    let (_, admin) = app.admin().await;

    let mut data = request_json();
    data["incident"] = incident_json();
    let form = Form::new().data(&data).pdf("incidentFiles", "photo.pdf");
    let (status, body) = app.form("POST", "/api/requests", form, None).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let request_id = body["id"].as_str().unwrap();
    let incident_id = body["incident"]["id"].as_str().unwrap();
    assert_eq!(body["incident"]["uploaded_files"].as_array().unwrap().len(), 1);

    let (status, incident) = app
        .get(&format!("/api/incidents/{incident_id}"), Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(incident["related_request"], request_id);
}

#[tokio::test]
async fn anonymous_intake_cannot_assign_staff() {
    let app = test_app();
    let (lawyer, _) = app.lawyer().await;

    let mut data = request_json();
    data["assigned_lawyer"] = json!(lawyer.id.to_string());
    let (status, body) = app
        .form("POST", "/api/requests", Form::new().data(&data), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "Forbidden");
}

#[tokio::test]
async fn admin_intake_records_receiver_and_lawyer() {
    let app = test_app();
    let (admin, admin_token) = app.admin().await;
    let (lawyer, lawyer_token) = app.lawyer().await;

    let mut data = request_json();
    data["assigned_lawyer"] = json!(lawyer.id.to_string());
    let (status, body) = app
        .form("POST", "/api/requests", Form::new().data(&data), Some(&admin_token))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["received_by"]["id"], admin.id.to_string());
    assert_eq!(body["assigned_lawyer"]["id"], lawyer.id.to_string());

    let (_, me) = app.get("/api/auth/me", Some(&lawyer_token)).await;
    assert_eq!(me["requests"], json!([body["id"]]));
}

#[tokio::test]
async fn lawyer_reference_must_have_lawyer_role() {
    let app = test_app();
    let (admin, admin_token) = app.admin().await;

    let mut data = request_json();
    data["assigned_lawyer"] = json!(admin.id.to_string());
    let (status, body) = app
        .form("POST", "/api/requests", Form::new().data(&data), Some(&admin_token))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "RoleMismatch");
}

#[tokio::test]
async fn malformed_and_dangling_references_are_distinguished() {
    let app = test_app();
    let (_, admin_token) = app.admin().await;

    let mut data = request_json();
    data["assigned_lawyer"] = json!("not-an-id");
    let (status, body) = app
        .form("POST", "/api/requests", Form::new().data(&data), Some(&admin_token))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "MalformedId");

    data["assigned_lawyer"] = json!(uuid::Uuid::new_v4().to_string());
    let (status, body) = app
        .form("POST", "/api/requests", Form::new().data(&data), Some(&admin_token))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "DanglingReference");
}

#[tokio::test]
async fn invalid_fields_are_reported_together() {
    let app = test_app();

    let mut data = request_json();
    data["telephone"] = json!("12");
    data["national_id"] = json!("123");
    let (status, body) = app
        .form("POST", "/api/requests", Form::new().data(&data), None)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "ValidationError");
    assert!(body["field_errors"]["telephone"].is_string());
    assert!(body["field_errors"]["national_id"].is_string());
    assert!(app.objects.keys().await.is_empty());
}

#[tokio::test]
async fn unsupported_file_type_stores_nothing() {
    let app = test_app();

    let form = Form::new()
        .data(&request_json())
        .pdf("submissions", "ok.pdf")
        .file("submissions", "script.sh", "text/x-shellscript", b"echo hi");
    let (status, body) = app.form("POST", "/api/requests", form, None).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["kind"], "UnsupportedMediaType");
    assert!(app.objects.keys().await.is_empty());
}

#[tokio::test]
async fn missing_data_part_is_a_validation_error() {
    let app = test_app();

    let form = Form::new().pdf("submissions", "orphan.pdf");
    let (status, body) = app.form("POST", "/api/requests", form, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["field_errors"]["data"].is_string());
}

#[tokio::test]
async fn listing_requests_requires_admin() {
    let app = test_app();
    let (_, lawyer_token) = app.lawyer().await;

    let (status, _) = app.get("/api/requests", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.get("/api/requests", Some(&lawyer_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "Forbidden");
}

#[tokio::test]
async fn list_filters_by_status() {
    let app = test_app();
    let (_, admin) = app.admin().await;

    let approved = app.approved_request(&admin).await;
    app.create_request(request_json(), None).await;

    let (status, body) = app.get("/api/requests", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = app.get("/api/requests?status=approved", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], approved);

    let (status, body) = app.get("/api/requests?status=closed", Some(&admin)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "InvalidStatus");
}

#[tokio::test]
async fn status_moves_once_out_of_pending() {
    let app = test_app();
    let (_, admin) = app.admin().await;
    let id = app.create_request(request_json(), None).await;
    let uri = format!("/api/requests/{id}/status");

    let (status, body) = app
        .json("PATCH", &uri, &json!({ "status": "rejected" }), Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "rejected");

    let (status, body) = app
        .json("PATCH", &uri, &json!({ "status": "rejected" }), Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "rejected");

    let (status, body) = app
        .json("PATCH", &uri, &json!({ "status": "approved" }), Some(&admin))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "InvalidStatus");
}

#[tokio::test]
async fn update_replaces_removed_submissions() {
    let app = test_app();
    let (_, admin) = app.admin().await;

    let form = Form::new()
        .data(&request_json())
        .pdf("submissions", "first.pdf");
    let (_, created) = app.form("POST", "/api/requests", form, None).await;
    let id = created["id"].as_str().unwrap();
    let old_key = key_of(created["submissions"][0]["document"].as_str().unwrap());

    let form = Form::new()
        .data(&json!({
            "surname": "Demir",
            "removed_files": [old_key],
            "submission_descriptions": ["Replacement"]
        }))
        .pdf("submissions", "second.pdf");
    let (status, body) = app
        .form("PATCH", &format!("/api/requests/{id}"), form, Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["surname"], "Demir");

    let submissions = body["submissions"].as_array().unwrap();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0]["document_description"], "Replacement");
    let new_key = key_of(submissions[0]["document"].as_str().unwrap());
    assert!(new_key.ends_with("second.pdf"));
    assert!(!app.objects.contains(&old_key).await);
    assert!(app.objects.contains(&new_key).await);
}

#[tokio::test]
async fn delete_removes_files_and_incident() {
    let app = test_app();
    let (_, admin) = app.admin().await;

    let mut data = request_json();
    data["incident"] = incident_json();
    let form = Form::new()
        .data(&data)
        .pdf("submissions", "a.pdf")
        .pdf("incidentFiles", "b.pdf");
    let (_, created) = app.form("POST", "/api/requests", form, None).await;
    let id = created["id"].as_str().unwrap();
    let incident_id = created["incident"]["id"].as_str().unwrap();
    assert_eq!(app.objects.keys().await.len(), 2);

    let (status, _) = app.delete(&format!("/api/requests/{id}"), Some(&admin)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(app.objects.keys().await.is_empty());

    let (status, _) = app.get(&format!("/api/requests/{id}"), Some(&admin)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .get(&format!("/api/incidents/{incident_id}"), Some(&admin))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_path_id_is_rejected() {
    let app = test_app();
    let (_, admin) = app.admin().await;

    let (status, body) = app.get("/api/requests/12345", Some(&admin)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "MalformedId");
}
