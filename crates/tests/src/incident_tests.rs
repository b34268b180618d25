use axum::http::StatusCode;
use serde_json::json;

use crate::common::{incident_json, key_of, request_json, test_app, Form};

#[tokio::test]
async fn admin_creates_standalone_incident_with_files() {
    let app = test_app();
    let (_, admin) = app.admin().await;

    let form = Form::new()
        .data(&incident_json())
        .file("incidentFiles", "photo.png", "image/png", b"\x89PNG test");
    let (status, body) = app.form("POST", "/api/incidents", form, Some(&admin)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["category"], "MediaScan");
    assert_eq!(body["related_request"], serde_json::Value::Null);

    let files = body["uploaded_files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    let key = key_of(files[0].as_str().unwrap());
    assert!(key.starts_with("incidents/"), "{key}");
    assert_eq!(
        app.objects.content_type_of(&key).await.as_deref(),
        Some("image/png")
    );
}

#[tokio::test]
async fn incident_routes_require_admin() {
    let app = test_app();
    let (_, lawyer) = app.lawyer().await;

    let (status, _) = app.get("/api/incidents", Some(&lawyer)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let form = Form::new().data(&incident_json());
    let (status, _) = app.form("POST", "/api/incidents", form, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_link_is_rejected() {
    let app = test_app();
    let (_, admin) = app.admin().await;

    let mut data = incident_json();
    data["link"] = json!("not a url");
    let (status, body) = app
        .form("POST", "/api/incidents", Form::new().data(&data), Some(&admin))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["field_errors"]["link"].is_string());
}

#[tokio::test]
async fn update_swaps_files() {
    let app = test_app();
    let (_, admin) = app.admin().await;

    let form = Form::new().data(&incident_json()).pdf("incidentFiles", "old.pdf");
    let (_, created) = app.form("POST", "/api/incidents", form, Some(&admin)).await;
    let id = created["id"].as_str().unwrap();
    let old_key = key_of(created["uploaded_files"][0].as_str().unwrap());

    let form = Form::new()
        .data(&json!({
            "event_summary": "Follow-up report",
            "removed_files": [old_key]
        }))
        .pdf("incidentFiles", "new.pdf");
    let (status, body) = app
        .form("PATCH", &format!("/api/incidents/{id}"), form, Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["event_summary"], "Follow-up report");

    let files = body["uploaded_files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert!(key_of(files[0].as_str().unwrap()).ends_with("new.pdf"));
    assert!(!app.objects.contains(&old_key).await);
}

#[tokio::test]
async fn deleting_incident_clears_request_reference() {
    let app = test_app();
    let (_, admin) = app.admin().await;

    let mut data = request_json();
    data["incident"] = incident_json();
    let (_, request) = app
        .form("POST", "/api/requests", Form::new().data(&data), None)
        .await;
    let request_id = request["id"].as_str().unwrap();
    let incident_id = request["incident"]["id"].as_str().unwrap();

    let (status, _) = app
        .delete(&format!("/api/incidents/{incident_id}"), Some(&admin))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, request) = app
        .get(&format!("/api/requests/{request_id}"), Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(request["incident"], serde_json::Value::Null);
}

#[tokio::test]
async fn categories_lists_distinct_values_in_use() {
    let app = test_app();
    let (_, admin) = app.admin().await;

    let (status, body) = app.get("/api/incidents/categories", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    for category in ["Stk", "MediaScan", "Stk"] {
        let mut data = incident_json();
        data["category"] = json!(category);
        let (status, _) = app
            .form("POST", "/api/incidents", Form::new().data(&data), Some(&admin))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, body) = app.get("/api/incidents/categories", Some(&admin)).await;
    assert_eq!(body, json!(["MediaScan", "Stk"]));

    let (_, list) = app.get("/api/incidents", Some(&admin)).await;
    assert_eq!(list.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn standalone_incident_claims_its_request_once() {
    let app = test_app();
    let (_, admin) = app.admin().await;
    let request_id = app.create_request(request_json(), None).await;

    let mut data = incident_json();
    data["related_request"] = json!(request_id);
    let (status, first) = app
        .form("POST", "/api/incidents", Form::new().data(&data), Some(&admin))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{first}");

    let (status, request) = app
        .get(&format!("/api/requests/{request_id}"), Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK, "{request}");
    assert_eq!(request["incident"]["id"], first["id"]);

    let (status, body) = app
        .form("POST", "/api/incidents", Form::new().data(&data), Some(&admin))
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
}
