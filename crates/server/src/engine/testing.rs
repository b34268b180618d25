//! Fixtures shared by the engine unit tests.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use shared_types::{
    AidRequest, AppError, CaseDetails, CreateAidRequest, Identity, Incident, IncidentCategory,
    IncidentInput, User, UserRole, UserStatus,
};
use uuid::Uuid;

use super::{Engine, EngineSettings, FileUpload, RetryPolicy};
use crate::repo::{CaseFilter, DocumentStore, MemoryStore, PasswordReset, RequestFilter};
use crate::storage::MemoryObjectStore;

pub const BASE: &str = "http://objects.test/intake";

pub struct Fixture {
    pub engine: Engine,
    pub store: Arc<MemoryStore>,
    pub objects: Arc<MemoryObjectStore>,
}

fn fast_settings() -> EngineSettings {
    EngineSettings {
        retry: RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        },
        ..EngineSettings::default()
    }
}

pub fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let objects = Arc::new(MemoryObjectStore::new(BASE));
    Fixture {
        engine: Engine::new(store.clone(), objects.clone(), fast_settings()),
        store,
        objects,
    }
}

/// Fixture whose engine writes through a [`FlakyStore`]. `Fixture::store`
/// is the memory store underneath, for inspecting what was committed.
pub fn flaky_fixture() -> (Fixture, Arc<FlakyStore>) {
    let store = Arc::new(MemoryStore::new());
    let flaky = Arc::new(FlakyStore::new(store.clone()));
    let objects = Arc::new(MemoryObjectStore::new(BASE));
    let fixture = Fixture {
        engine: Engine::new(flaky.clone(), objects.clone(), fast_settings()),
        store,
        objects,
    };
    (fixture, flaky)
}

/// Memory store whose owned-list additions (`add_user_request`,
/// `add_user_case`, `add_request_case`) fail while switched off.
pub struct FlakyStore {
    inner: Arc<MemoryStore>,
    owned_lists_down: AtomicBool,
    failed_writes: AtomicU32,
}

impl FlakyStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            owned_lists_down: AtomicBool::new(false),
            failed_writes: AtomicU32::new(0),
        }
    }

    pub fn set_owned_lists_down(&self, down: bool) {
        self.owned_lists_down.store(down, Ordering::SeqCst);
    }

    pub fn failed_writes(&self) -> u32 {
        self.failed_writes.load(Ordering::SeqCst)
    }

    fn check_owned_lists(&self) -> Result<(), AppError> {
        if self.owned_lists_down.load(Ordering::SeqCst) {
            self.failed_writes.fetch_add(1, Ordering::SeqCst);
            return Err(AppError::database("owned list write unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn ping(&self) -> Result<(), AppError> {
        self.inner.ping().await
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        self.inner.find_user(id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.inner.find_user_by_email(email).await
    }

    async fn list_users(&self, role: Option<UserRole>) -> Result<Vec<User>, AppError> {
        self.inner.list_users(role).await
    }

    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        self.inner.insert_user(user).await
    }

    async fn update_user(&self, user: &User) -> Result<bool, AppError> {
        self.inner.update_user(user).await
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError> {
        self.inner.delete_user(id).await
    }

    async fn add_user_request(&self, user_id: Uuid, request_id: Uuid) -> Result<(), AppError> {
        self.check_owned_lists()?;
        self.inner.add_user_request(user_id, request_id).await
    }

    async fn remove_user_request(&self, user_id: Uuid, request_id: Uuid) -> Result<(), AppError> {
        self.inner.remove_user_request(user_id, request_id).await
    }

    async fn add_user_case(&self, user_id: Uuid, case_id: Uuid) -> Result<(), AppError> {
        self.check_owned_lists()?;
        self.inner.add_user_case(user_id, case_id).await
    }

    async fn remove_user_case(&self, user_id: Uuid, case_id: Uuid) -> Result<(), AppError> {
        self.inner.remove_user_case(user_id, case_id).await
    }

    async fn set_refresh_token(&self, user_id: Uuid, hash: Option<&str>) -> Result<(), AppError> {
        self.inner.set_refresh_token(user_id, hash).await
    }

    async fn clear_user_from_requests(&self, user_id: Uuid) -> Result<u64, AppError> {
        self.inner.clear_user_from_requests(user_id).await
    }

    async fn put_password_reset(&self, reset: &PasswordReset) -> Result<(), AppError> {
        self.inner.put_password_reset(reset).await
    }

    async fn take_password_reset(&self, token_hash: &str) -> Result<Option<PasswordReset>, AppError> {
        self.inner.take_password_reset(token_hash).await
    }

    async fn find_request(&self, id: Uuid) -> Result<Option<AidRequest>, AppError> {
        self.inner.find_request(id).await
    }

    async fn find_request_by_number(&self, number: i64) -> Result<Option<AidRequest>, AppError> {
        self.inner.find_request_by_number(number).await
    }

    async fn list_requests(&self, filter: RequestFilter) -> Result<Vec<AidRequest>, AppError> {
        self.inner.list_requests(filter).await
    }

    async fn insert_request(&self, request: &AidRequest) -> Result<(), AppError> {
        self.inner.insert_request(request).await
    }

    async fn update_request(&self, request: &AidRequest) -> Result<bool, AppError> {
        self.inner.update_request(request).await
    }

    async fn delete_request(&self, id: Uuid) -> Result<bool, AppError> {
        self.inner.delete_request(id).await
    }

    async fn add_request_case(&self, request_id: Uuid, case_id: Uuid) -> Result<(), AppError> {
        self.check_owned_lists()?;
        self.inner.add_request_case(request_id, case_id).await
    }

    async fn remove_request_case(&self, request_id: Uuid, case_id: Uuid) -> Result<(), AppError> {
        self.inner.remove_request_case(request_id, case_id).await
    }

    async fn link_request_incident(&self, request_id: Uuid, incident_id: Uuid) -> Result<(), AppError> {
        self.inner.link_request_incident(request_id, incident_id).await
    }

    async fn clear_request_incident(&self, request_id: Uuid, incident_id: Uuid) -> Result<(), AppError> {
        self.inner.clear_request_incident(request_id, incident_id).await
    }

    async fn find_incident(&self, id: Uuid) -> Result<Option<Incident>, AppError> {
        self.inner.find_incident(id).await
    }

    async fn list_incidents(&self) -> Result<Vec<Incident>, AppError> {
        self.inner.list_incidents().await
    }

    async fn insert_incident(&self, incident: &Incident) -> Result<(), AppError> {
        self.inner.insert_incident(incident).await
    }

    async fn update_incident(&self, incident: &Incident) -> Result<bool, AppError> {
        self.inner.update_incident(incident).await
    }

    async fn delete_incident(&self, id: Uuid) -> Result<bool, AppError> {
        self.inner.delete_incident(id).await
    }

    async fn set_incident_request(&self, incident_id: Uuid, request_id: Option<Uuid>) -> Result<(), AppError> {
        self.inner.set_incident_request(incident_id, request_id).await
    }

    async fn detach_request_incidents(&self, request_id: Uuid) -> Result<u64, AppError> {
        self.inner.detach_request_incidents(request_id).await
    }

    async fn find_case(&self, id: Uuid) -> Result<Option<CaseDetails>, AppError> {
        self.inner.find_case(id).await
    }

    async fn list_cases(&self, filter: CaseFilter) -> Result<Vec<CaseDetails>, AppError> {
        self.inner.list_cases(filter).await
    }

    async fn insert_case(&self, case: &CaseDetails) -> Result<(), AppError> {
        self.inner.insert_case(case).await
    }

    async fn update_case(&self, case: &CaseDetails) -> Result<bool, AppError> {
        self.inner.update_case(case).await
    }

    async fn delete_case(&self, id: Uuid) -> Result<bool, AppError> {
        self.inner.delete_case(id).await
    }
}

pub fn user(role: UserRole) -> User {
    let now = Utc::now();
    let id = Uuid::new_v4();
    User {
        id,
        full_name: format!("{} {}", role.as_str(), &id.simple().to_string()[..6]),
        telephone: "05551234567".to_string(),
        email: format!("{}@example.org", id.simple()),
        password_hash: "unused".to_string(),
        role,
        status: UserStatus::Active,
        baro_registration_number: (role == UserRole::Lawyer).then_some(4521),
        requests: vec![],
        cases: vec![],
        refresh_token_hash: None,
        created_at: now,
        updated_at: now,
    }
}

pub async fn seed_user(store: &MemoryStore, role: UserRole) -> User {
    let user = user(role);
    store.insert_user(&user).await.unwrap();
    user
}

pub fn identity(user: &User) -> Identity {
    Identity {
        user_id: user.id,
        role: user.role,
    }
}

pub fn pdf(name: &str) -> FileUpload {
    FileUpload::new(name, "application/pdf", b"%PDF-1.7 test".to_vec())
}

pub fn request_data() -> CreateAidRequest {
    CreateAidRequest {
        email: "citizen@example.org".to_string(),
        telephone: "05551234567".to_string(),
        national_id: "12345678901".to_string(),
        name: "Ayse".to_string(),
        surname: "Yilmaz".to_string(),
        applicant_type: "individual".to_string(),
        complaint_reason: "Unlawful detention".to_string(),
        ..CreateAidRequest::default()
    }
}

pub fn incident_input() -> IncidentInput {
    IncidentInput {
        category: IncidentCategory::MediaScan,
        scan_period: "2024-Q1".to_string(),
        event_category: "detention".to_string(),
        event_summary: "Journalist detained at protest".to_string(),
        source: Some("Daily News".to_string()),
        link: "https://news.example.org/article/1".to_string(),
        image_link: None,
        notification_agency: None,
        commission: None,
        public_institution: None,
        related_request: None,
    }
}
