pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared_types::{AidRequest, AppError, CaseDetails, Incident, RequestStatus, User, UserRole};
use uuid::Uuid;

/// Selection for request listings. Empty filter selects everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestFilter {
    pub assigned_lawyer: Option<Uuid>,
    pub status: Option<RequestStatus>,
}

/// Selection for case listings. Empty filter selects everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaseFilter {
    pub lawyer: Option<Uuid>,
    pub related_request: Option<Uuid>,
}

/// Pending password reset. Only the SHA-256 digest of the token is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordReset {
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

/// Document persistence for the four entity kinds.
///
/// Every call is atomic on its own; nothing spans documents. Owned-id
/// lists (`User::requests`, `User::cases`, `AidRequest::case_details`) are
/// only changed through the add/remove methods, which have set semantics,
/// so the whole-entity `update_*` methods leave them untouched. Listings
/// are ordered newest first.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn ping(&self) -> Result<(), AppError>;

    // ── Users ───────────────────────────────────────────────────────

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn list_users(&self, role: Option<UserRole>) -> Result<Vec<User>, AppError>;
    async fn insert_user(&self, user: &User) -> Result<(), AppError>;
    /// Overwrite profile fields. Returns true if a row was updated.
    async fn update_user(&self, user: &User) -> Result<bool, AppError>;
    /// Delete a user. Returns true if a row was deleted.
    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError>;
    async fn add_user_request(&self, user_id: Uuid, request_id: Uuid) -> Result<(), AppError>;
    async fn remove_user_request(&self, user_id: Uuid, request_id: Uuid)
        -> Result<(), AppError>;
    async fn add_user_case(&self, user_id: Uuid, case_id: Uuid) -> Result<(), AppError>;
    async fn remove_user_case(&self, user_id: Uuid, case_id: Uuid) -> Result<(), AppError>;
    async fn set_refresh_token(&self, user_id: Uuid, hash: Option<&str>)
        -> Result<(), AppError>;
    /// Unset `received_by` / `assigned_lawyer` on every request naming the user.
    async fn clear_user_from_requests(&self, user_id: Uuid) -> Result<u64, AppError>;
    /// Store a reset, replacing any earlier one for the same user.
    async fn put_password_reset(&self, reset: &PasswordReset) -> Result<(), AppError>;
    /// Remove and return the reset whose token hashes to `token_hash`.
    /// A second call with the same hash finds nothing.
    async fn take_password_reset(&self, token_hash: &str)
        -> Result<Option<PasswordReset>, AppError>;

    // ── Requests ────────────────────────────────────────────────────

    async fn find_request(&self, id: Uuid) -> Result<Option<AidRequest>, AppError>;
    async fn find_request_by_number(&self, number: i64) -> Result<Option<AidRequest>, AppError>;
    async fn list_requests(&self, filter: RequestFilter) -> Result<Vec<AidRequest>, AppError>;
    async fn insert_request(&self, request: &AidRequest) -> Result<(), AppError>;
    /// Overwrite every field except `case_details`. Returns true if a row was updated.
    async fn update_request(&self, request: &AidRequest) -> Result<bool, AppError>;
    async fn delete_request(&self, id: Uuid) -> Result<bool, AppError>;
    async fn add_request_case(&self, request_id: Uuid, case_id: Uuid) -> Result<(), AppError>;
    async fn remove_request_case(&self, request_id: Uuid, case_id: Uuid)
        -> Result<(), AppError>;
    /// Set `incident` only while it is unset or already `incident_id`.
    async fn link_request_incident(&self, request_id: Uuid, incident_id: Uuid)
        -> Result<(), AppError>;
    /// Unset `incident` only while it still points at `incident_id`.
    async fn clear_request_incident(&self, request_id: Uuid, incident_id: Uuid)
        -> Result<(), AppError>;

    // ── Incidents ───────────────────────────────────────────────────

    async fn find_incident(&self, id: Uuid) -> Result<Option<Incident>, AppError>;
    async fn list_incidents(&self) -> Result<Vec<Incident>, AppError>;
    async fn insert_incident(&self, incident: &Incident) -> Result<(), AppError>;
    async fn update_incident(&self, incident: &Incident) -> Result<bool, AppError>;
    async fn delete_incident(&self, id: Uuid) -> Result<bool, AppError>;
    async fn set_incident_request(&self, incident_id: Uuid, request_id: Option<Uuid>)
        -> Result<(), AppError>;
    /// Unset `related_request` on every incident pointing at the request.
    async fn detach_request_incidents(&self, request_id: Uuid) -> Result<u64, AppError>;

    // ── Cases ───────────────────────────────────────────────────────

    async fn find_case(&self, id: Uuid) -> Result<Option<CaseDetails>, AppError>;
    async fn list_cases(&self, filter: CaseFilter) -> Result<Vec<CaseDetails>, AppError>;
    async fn insert_case(&self, case: &CaseDetails) -> Result<(), AppError>;
    async fn update_case(&self, case: &CaseDetails) -> Result<bool, AppError>;
    async fn delete_case(&self, id: Uuid) -> Result<bool, AppError>;
}
