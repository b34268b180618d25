use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::common::{case_json, key_of, request_json, test_app, Form};

#[tokio::test]
async fn lawyer_opens_case_for_approved_request() {
    let app = test_app();
    let (_, admin) = app.admin().await;
    let (lawyer, lawyer_token) = app.lawyer().await;
    let request_id = app.approved_request(&admin).await;

    let form = Form::new()
        .data(&case_json(&request_id))
        .pdf("petitions", "petition.pdf")
        .pdf("hearingReports", "report.pdf");
    let (status, body) = app.form("POST", "/api/cases", form, Some(&lawyer_token)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["lawyer"]["id"], lawyer.id.to_string());
    assert_eq!(body["related_request"]["id"], request_id);
    assert_eq!(body["related_request"]["status"], "approved");
    assert_eq!(body["documents"]["petitions"].as_array().unwrap().len(), 1);
    assert_eq!(body["documents"]["hearing_reports"].as_array().unwrap().len(), 1);
    assert!(body["documents"]["hearing_minutes"].as_array().unwrap().is_empty());

    let petition = key_of(body["documents"]["petitions"][0].as_str().unwrap());
    assert!(petition.starts_with("cases/petitions/"), "{petition}");

    let (_, request) = app
        .get(&format!("/api/requests/{request_id}"), Some(&admin))
        .await;
    let case_ids: Vec<&str> = request["case_details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert_eq!(case_ids, vec![body["id"].as_str().unwrap()]);
}

#[tokio::test]
async fn case_requires_approved_request() {
    let app = test_app();
    let (_, lawyer_token) = app.lawyer().await;
    let pending = app.create_request(request_json(), None).await;

    let form = Form::new().data(&case_json(&pending));
    let (status, body) = app.form("POST", "/api/cases", form, Some(&lawyer_token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "InvalidStatus");
}

#[tokio::test]
async fn case_for_unknown_request_is_dangling() {
    let app = test_app();
    let (_, lawyer_token) = app.lawyer().await;

    let form = Form::new().data(&case_json(&uuid::Uuid::new_v4().to_string()));
    let (status, body) = app.form("POST", "/api/cases", form, Some(&lawyer_token)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "DanglingReference");
}

#[tokio::test]
async fn admin_must_name_the_lawyer() {
    let app = test_app();
    let (_, admin) = app.admin().await;
    let (lawyer, _) = app.lawyer().await;
    let request_id = app.approved_request(&admin).await;

    let form = Form::new().data(&case_json(&request_id));
    let (status, body) = app.form("POST", "/api/cases", form, Some(&admin)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["field_errors"]["lawyer"].is_string());

    let mut data = case_json(&request_id);
    data["lawyer"] = json!(lawyer.id.to_string());
    let (status, body) = app
        .form("POST", "/api/cases", Form::new().data(&data), Some(&admin))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["lawyer"]["id"], lawyer.id.to_string());
}

#[tokio::test]
async fn update_appends_documents_and_keeps_existing() {
    let app = test_app();
    let (_, admin) = app.admin().await;
    let (_, lawyer_token) = app.lawyer().await;
    let request_id = app.approved_request(&admin).await;
    let case_id = app
        .create_case(&request_id, &lawyer_token, Form::new().pdf("petitions", "first.pdf"))
        .await;

    let form = Form::new()
        .data(&json!({ "result_stage": "appeal" }))
        .pdf("petitions", "second.pdf")
        .pdf("hearingMinutes", "minutes.pdf");
    let (status, body) = app
        .form("PATCH", &format!("/api/cases/{case_id}"), form, Some(&lawyer_token))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["result_stage"], "appeal");

    let petitions: Vec<String> = body["documents"]["petitions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| key_of(u.as_str().unwrap()))
        .collect();
    assert_eq!(petitions.len(), 2);
    assert!(petitions[0].ends_with("first.pdf"));
    assert!(petitions[1].ends_with("second.pdf"));
    assert_eq!(body["documents"]["hearing_minutes"].as_array().unwrap().len(), 1);
    assert_eq!(app.objects.keys().await.len(), 3);
}

#[tokio::test]
async fn another_lawyer_cannot_change_or_see_the_case() {
    let app = test_app();
    let (_, admin) = app.admin().await;
    let (_, owner) = app.lawyer().await;
    let (_, other) = app.lawyer().await;
    let request_id = app.approved_request(&admin).await;
    let case_id = app.create_case(&request_id, &owner, Form::new()).await;

    let form = Form::new().data(&json!({ "court": "Elsewhere" }));
    let (status, _) = app
        .form("PATCH", &format!("/api/cases/{case_id}"), form, Some(&other))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .delete(&format!("/api/cases/{case_id}"), Some(&other))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .get(&format!("/api/lawyer/cases/{case_id}"), Some(&other))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .get(&format!("/api/lawyer/cases/{case_id}"), Some(&owner))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], case_id);
}

#[tokio::test]
async fn lawyer_views_are_scoped_to_the_caller() {
    let app = test_app();
    let (_, admin) = app.admin().await;
    let (lawyer, lawyer_token) = app.lawyer().await;
    let (_, other_token) = app.lawyer().await;

    let mut data = request_json();
    data["assigned_lawyer"] = json!(lawyer.id.to_string());
    let assigned = app.create_request(data, Some(&admin)).await;
    app.json(
        "PATCH",
        &format!("/api/requests/{assigned}/status"),
        &json!({ "status": "approved" }),
        Some(&admin),
    )
    .await;
    app.approved_request(&admin).await;

    let (status, mine) = app.get("/api/lawyer/requests", Some(&lawyer_token)).await;
    assert_eq!(status, StatusCode::OK);
    let mine = mine.as_array().unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["id"], assigned);

    let (_, all) = app.get("/api/lawyer/requests", Some(&admin)).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    app.create_case(&assigned, &lawyer_token, Form::new()).await;
    let (_, cases) = app.get("/api/lawyer/cases", Some(&lawyer_token)).await;
    assert_eq!(cases.as_array().unwrap().len(), 1);
    let (_, cases) = app.get("/api/lawyer/cases", Some(&other_token)).await;
    assert!(cases.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn request_with_cases_cannot_be_deleted() {
    let app = test_app();
    let (_, admin) = app.admin().await;
    let (_, lawyer_token) = app.lawyer().await;
    let request_id = app.approved_request(&admin).await;
    let case_id = app.create_case(&request_id, &lawyer_token, Form::new()).await;

    let (status, body) = app
        .delete(&format!("/api/requests/{request_id}"), Some(&admin))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "Conflict");

    let (status, _) = app
        .delete(&format!("/api/cases/{case_id}"), Some(&lawyer_token))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .delete(&format!("/api/requests/{request_id}"), Some(&admin))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn deleting_a_case_releases_its_references_and_files() {
    let app = test_app();
    let (_, admin) = app.admin().await;
    let (_, lawyer_token) = app.lawyer().await;
    let request_id = app.approved_request(&admin).await;
    let case_id = app
        .create_case(&request_id, &lawyer_token, Form::new().pdf("petitions", "p.pdf"))
        .await;
    assert_eq!(app.objects.keys().await.len(), 1);

    let (status, _) = app
        .delete(&format!("/api/cases/{case_id}"), Some(&lawyer_token))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(app.objects.keys().await.is_empty());

    let (_, request) = app
        .get(&format!("/api/requests/{request_id}"), Some(&admin))
        .await;
    assert!(request["case_details"].as_array().unwrap().is_empty());

    let (_, me) = app.get("/api/auth/me", Some(&lawyer_token)).await;
    assert!(me["cases"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn case_listing_is_admin_only() {
    let app = test_app();
    let (_, admin) = app.admin().await;
    let (lawyer, lawyer_token) = app.lawyer().await;
    let request_id = app.approved_request(&admin).await;
    app.create_case(&request_id, &lawyer_token, Form::new()).await;

    let (status, _) = app.get("/api/cases", Some(&lawyer_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .get(&format!("/api/cases?lawyer={}", lawyer.id), Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}
