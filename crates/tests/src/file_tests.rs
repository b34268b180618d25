use axum::http::StatusCode;
use chrono::Utc;
use pretty_assertions::assert_eq;
use serde_json::json;
use server::storage::ObjectStore;

use crate::common::{key_of, request_json, test_app, Form, OBJECT_BASE};

#[tokio::test]
async fn admin_lists_bucket_keys() {
    let app = test_app();
    let (_, admin) = app.admin().await;
    let form = Form::new().data(&request_json()).pdf("submissions", "a.pdf");
    app.form("POST", "/api/requests", form, None).await;

    let (status, body) = app.get("/api/files", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    let keys = body["keys"].as_array().unwrap();
    assert_eq!(keys.len(), 1);
    assert!(keys[0].as_str().unwrap().starts_with("requests/"));
}

#[tokio::test]
async fn file_routes_require_admin() {
    let app = test_app();
    let (_, lawyer) = app.lawyer().await;

    let (status, _) = app.get("/api/files", Some(&lawyer)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .json("POST", "/api/files/sweep?dry_run=false", &json!({}), Some(&lawyer))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn presign_returns_time_limited_url() {
    let app = test_app();
    let (_, admin) = app.admin().await;

    let (status, body) = app
        .get("/api/files/presign?key=/requests/1_ab_scan.pdf", Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["key"], "requests/1_ab_scan.pdf");
    assert_eq!(body["expires_in_secs"], 3600);
    let url = body["url"].as_str().unwrap();
    assert!(url.starts_with(OBJECT_BASE));
    assert_eq!(key_of(url), "requests/1_ab_scan.pdf");

    let (status, body) = app.get("/api/files/presign?key=%20", Some(&admin)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["field_errors"]["key"].is_string());
}

#[tokio::test]
async fn read_views_carry_presigned_urls() {
    let app = test_app();
    let (_, admin) = app.admin().await;
    let form = Form::new().data(&request_json()).pdf("submissions", "a.pdf");
    let (_, created) = app.form("POST", "/api/requests", form, None).await;
    let id = created["id"].as_str().unwrap();

    let (_, body) = app.get(&format!("/api/requests/{id}"), Some(&admin)).await;
    let url = body["submissions"][0]["document"].as_str().unwrap();
    assert!(url.contains("X-Amz-Expires=3600"), "{url}");

    // The stored entity keeps the plain URL.
    let (_, keys) = app.get("/api/files", Some(&admin)).await;
    assert_eq!(keys["keys"][0].as_str().unwrap(), key_of(url));
}

#[tokio::test]
async fn sweep_defaults_to_dry_run() {
    let app = test_app();
    let (_, admin) = app.admin().await;
    app.objects
        .put("requests/stray.pdf", "application/pdf", b"x".to_vec())
        .await
        .unwrap();

    let (status, body) = app
        .json("POST", "/api/files/sweep", &json!({}), Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["dry_run"], true);
    assert_eq!(body["orphaned"], json!(["requests/stray.pdf"]));
    assert_eq!(body["deleted"], 0);
    assert!(app.objects.contains("requests/stray.pdf").await);
}

#[tokio::test]
async fn sweep_deletes_old_orphans_only() {
    let app = test_app();
    let (_, admin) = app.admin().await;

    let form = Form::new().data(&request_json()).pdf("submissions", "kept.pdf");
    let (_, created) = app.form("POST", "/api/requests", form, None).await;
    let referenced = key_of(created["submissions"][0]["document"].as_str().unwrap());

    let old = "incidents/1000_deadbeef_old.pdf";
    let fresh = format!("incidents/{}_cafebabe_fresh.pdf", Utc::now().timestamp_millis());
    for key in [old, fresh.as_str(), "cases/petitions/no-timestamp.pdf"] {
        app.objects
            .put(key, "application/pdf", b"x".to_vec())
            .await
            .unwrap();
    }

    let (status, body) = app
        .json("POST", "/api/files/sweep?dry_run=false", &json!({}), Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["scanned"], 4);
    assert_eq!(body["referenced"], 1);
    assert_eq!(body["skipped_recent"], 1);
    assert_eq!(body["deleted"], 2);

    let mut remaining = app.objects.keys().await;
    remaining.sort();
    let mut expected = vec![referenced, fresh];
    expected.sort();
    assert_eq!(remaining, expected);
}
