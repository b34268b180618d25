use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::Value;
use server::auth::jwt::TokenAuthority;
use server::auth::password::hash_password;
use server::db::AppState;
use server::engine::{Engine, EngineSettings, RetryPolicy};
use server::repo::{DocumentStore, MemoryStore};
use server::storage::MemoryObjectStore;
use shared_types::{AuthConfig, User, UserRole, UserStatus};
use tower::ServiceExt;
use uuid::Uuid;

pub const OBJECT_BASE: &str = "http://objects.test/intake";
pub const JWT_SECRET: &str = "integration-test-secret-0123456789";
pub const PASSWORD: &str = "correct-horse-battery";

const BOUNDARY: &str = "intake-test-boundary";

/// A router over the in-memory store and object store. Each test gets its
/// own, so tests never share data.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub objects: Arc<MemoryObjectStore>,
}

pub fn test_app() -> TestApp {
    test_app_with(EngineSettings::default())
}

pub fn test_app_with(settings: EngineSettings) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let objects = Arc::new(MemoryObjectStore::new(OBJECT_BASE));
    let settings = EngineSettings {
        retry: RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
        },
        ..settings
    };
    let engine = Engine::new(store.clone(), objects.clone(), settings);
    let tokens = TokenAuthority::new(JWT_SECRET, &AuthConfig::default())
        .expect("Failed to build token authority");
    let state = AppState::new(engine, tokens);
    let router = server::openapi::app_router(state.clone(), 10 * 1024 * 1024);

    TestApp {
        router,
        state,
        store,
        objects,
    }
}

impl TestApp {
    /// Insert an active user with password `PASSWORD` and return it with a
    /// valid access token.
    pub async fn seed_user(&self, role: UserRole) -> (User, String) {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let user = User {
            id,
            full_name: format!("Test {}", role.as_str()),
            telephone: "05551234567".to_string(),
            email: format!("{}@example.org", id.simple()),
            password_hash: hash_password(PASSWORD).expect("Failed to hash password"),
            role,
            status: UserStatus::Active,
            baro_registration_number: (role == UserRole::Lawyer).then_some(1200),
            requests: vec![],
            cases: vec![],
            refresh_token_hash: None,
            created_at: now,
            updated_at: now,
        };
        self.store
            .insert_user(&user)
            .await
            .expect("Failed to seed user");
        let token = self
            .state
            .tokens
            .issue_access(&user)
            .expect("Failed to issue token");
        (user, token)
    }

    pub async fn admin(&self) -> (User, String) {
        self.seed_user(UserRole::Admin).await
    }

    pub async fn lawyer(&self) -> (User, String) {
        self.seed_user(UserRole::Lawyer).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let req = with_auth(Request::builder().method("GET").uri(uri), token)
            .body(Body::empty())
            .unwrap();
        send(&self.router, req).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let req = with_auth(Request::builder().method("DELETE").uri(uri), token)
            .body(Body::empty())
            .unwrap();
        send(&self.router, req).await
    }

    pub async fn json(
        &self,
        method: &str,
        uri: &str,
        body: &Value,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let req = with_auth(Request::builder().method(method).uri(uri), token)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        send(&self.router, req).await
    }

    pub async fn form(
        &self,
        method: &str,
        uri: &str,
        form: Form,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let req = with_auth(Request::builder().method(method).uri(uri), token)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(form.finish()))
            .unwrap();
        send(&self.router, req).await
    }

    /// File a public request and return its id.
    pub async fn create_request(&self, data: Value, token: Option<&str>) -> String {
        let (status, body) = self
            .form("POST", "/api/requests", Form::new().data(&data), token)
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    /// File a request and approve it; returns its id.
    pub async fn approved_request(&self, admin_token: &str) -> String {
        let id = self.create_request(request_json(), None).await;
        let (status, body) = self
            .json(
                "PATCH",
                &format!("/api/requests/{id}/status"),
                &serde_json::json!({ "status": "approved" }),
                Some(admin_token),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        id
    }

    /// Open a case as `lawyer_token` for `request_id`; returns the case id.
    pub async fn create_case(&self, request_id: &str, lawyer_token: &str, form: Form) -> String {
        let (status, body) = self
            .form(
                "POST",
                "/api/cases",
                form.data(&case_json(request_id)),
                Some(lawyer_token),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }
}

fn with_auth(
    builder: axum::http::request::Builder,
    token: Option<&str>,
) -> axum::http::request::Builder {
    match token {
        Some(token) => builder.header("authorization", format!("Bearer {token}")),
        None => builder,
    }
}

/// Minimal valid request intake payload.
pub fn request_json() -> Value {
    serde_json::json!({
        "email": "citizen@example.org",
        "telephone": "05551234567",
        "national_id": "12345678901",
        "name": "Ayse",
        "surname": "Yilmaz",
        "applicant_type": "individual",
        "complaint_reason": "Unlawful detention"
    })
}

pub fn incident_json() -> Value {
    serde_json::json!({
        "category": "MediaScan",
        "scan_period": "2024-Q1",
        "event_category": "detention",
        "event_summary": "Journalist detained at protest",
        "source": "Daily News",
        "link": "https://news.example.org/article/1"
    })
}

pub fn case_json(request_id: &str) -> Value {
    serde_json::json!({
        "party_name": "Ayse Yilmaz",
        "case_subject": "Unlawful detention",
        "case_lawyer": "Av. Demir",
        "file_number": 42,
        "court": "Istanbul 3rd Criminal Court",
        "indictment": "2024/118",
        "court_file_number": "2024/556 E.",
        "result_description": "Hearing scheduled",
        "result_stage": "first instance",
        "related_request": request_id
    })
}

/// Multipart body builder.
#[derive(Default)]
pub struct Form {
    body: Vec<u8>,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(mut self, value: &Value) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"data\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, field: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn pdf(self, field: &str, file_name: &str) -> Self {
        self.file(field, file_name, "application/pdf", b"%PDF-1.7 test")
    }

    fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        self.body
    }
}

/// Send a request through the router and parse the JSON response.
pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let (status, _, body) = send_raw(app, req).await;
    (status, body)
}

/// Send a request and keep the response headers.
pub async fn send_raw(app: &Router, req: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = app
        .clone()
        .oneshot(req)
        .await
        .expect("Failed to send request");

    let status = response.status();
    let headers = response.headers().clone();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");

    let body: Value = if body_bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&body_bytes).to_string(),
        ))
    };

    (status, headers, body)
}

/// `name=value` pairs from the response's `set-cookie` headers.
pub fn set_cookies(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .map(str::to_string)
        .collect()
}

/// Object key of a stored URL under `OBJECT_BASE`.
pub fn key_of(url: &str) -> String {
    let without_query = url.split('?').next().unwrap_or(url);
    without_query
        .trim_start_matches(OBJECT_BASE)
        .trim_start_matches('/')
        .to_string()
}
