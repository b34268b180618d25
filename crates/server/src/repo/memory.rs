use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use shared_types::{AidRequest, AppError, CaseDetails, Incident, User, UserRole};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CaseFilter, DocumentStore, PasswordReset, RequestFilter};

#[derive(Default)]
struct Collections {
    users: HashMap<Uuid, User>,
    requests: HashMap<Uuid, AidRequest>,
    incidents: HashMap<Uuid, Incident>,
    cases: HashMap<Uuid, CaseDetails>,
    // Keyed by user: one pending reset each.
    resets: HashMap<Uuid, PasswordReset>,
}

/// In-process document store used by the `memory` database backend and
/// the test suite. Mirrors the Postgres store's uniqueness rules.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn add_to_set(ids: &mut Vec<Uuid>, id: Uuid) {
    if !ids.contains(&id) {
        ids.push(id);
    }
}

fn newest_first<T>(mut items: Vec<T>, created: impl Fn(&T) -> chrono::DateTime<Utc>) -> Vec<T> {
    items.sort_by_key(|item| std::cmp::Reverse(created(item)));
    items
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    // ── Users ───────────────────────────────────────────────────────

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_users(&self, role: Option<UserRole>) -> Result<Vec<User>, AppError> {
        let inner = self.inner.read().await;
        let users = inner
            .users
            .values()
            .filter(|u| role.map_or(true, |r| u.role == r))
            .cloned()
            .collect();
        Ok(newest_first(users, |u: &User| u.created_at))
    }

    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        if inner
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(AppError::conflict("An account with this email already exists"));
        }
        inner.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<bool, AppError> {
        let mut inner = self.inner.write().await;
        if inner
            .users
            .values()
            .any(|u| u.id != user.id && u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(AppError::conflict("An account with this email already exists"));
        }
        let Some(stored) = inner.users.get_mut(&user.id) else {
            return Ok(false);
        };
        let requests = std::mem::take(&mut stored.requests);
        let cases = std::mem::take(&mut stored.cases);
        let refresh_token_hash = stored.refresh_token_hash.take();
        *stored = User {
            requests,
            cases,
            refresh_token_hash,
            ..user.clone()
        };
        Ok(true)
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError> {
        let mut inner = self.inner.write().await;
        inner.resets.remove(&id);
        Ok(inner.users.remove(&id).is_some())
    }

    async fn add_user_request(&self, user_id: Uuid, request_id: Uuid) -> Result<(), AppError> {
        if let Some(user) = self.inner.write().await.users.get_mut(&user_id) {
            add_to_set(&mut user.requests, request_id);
        }
        Ok(())
    }

    async fn remove_user_request(
        &self,
        user_id: Uuid,
        request_id: Uuid,
    ) -> Result<(), AppError> {
        if let Some(user) = self.inner.write().await.users.get_mut(&user_id) {
            user.requests.retain(|id| *id != request_id);
        }
        Ok(())
    }

    async fn add_user_case(&self, user_id: Uuid, case_id: Uuid) -> Result<(), AppError> {
        if let Some(user) = self.inner.write().await.users.get_mut(&user_id) {
            add_to_set(&mut user.cases, case_id);
        }
        Ok(())
    }

    async fn remove_user_case(&self, user_id: Uuid, case_id: Uuid) -> Result<(), AppError> {
        if let Some(user) = self.inner.write().await.users.get_mut(&user_id) {
            user.cases.retain(|id| *id != case_id);
        }
        Ok(())
    }

    async fn set_refresh_token(
        &self,
        user_id: Uuid,
        hash: Option<&str>,
    ) -> Result<(), AppError> {
        if let Some(user) = self.inner.write().await.users.get_mut(&user_id) {
            user.refresh_token_hash = hash.map(str::to_string);
        }
        Ok(())
    }

    async fn clear_user_from_requests(&self, user_id: Uuid) -> Result<u64, AppError> {
        let mut inner = self.inner.write().await;
        let mut touched = 0;
        for request in inner.requests.values_mut() {
            let mut changed = false;
            if request.received_by == Some(user_id) {
                request.received_by = None;
                changed = true;
            }
            if request.assigned_lawyer == Some(user_id) {
                request.assigned_lawyer = None;
                changed = true;
            }
            if changed {
                request.updated_at = Utc::now();
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn put_password_reset(&self, reset: &PasswordReset) -> Result<(), AppError> {
        self.inner
            .write()
            .await
            .resets
            .insert(reset.user_id, reset.clone());
        Ok(())
    }

    async fn take_password_reset(
        &self,
        token_hash: &str,
    ) -> Result<Option<PasswordReset>, AppError> {
        let mut inner = self.inner.write().await;
        let user_id = inner
            .resets
            .values()
            .find(|r| r.token_hash == token_hash)
            .map(|r| r.user_id);
        Ok(user_id.and_then(|id| inner.resets.remove(&id)))
    }

    // ── Requests ────────────────────────────────────────────────────

    async fn find_request(&self, id: Uuid) -> Result<Option<AidRequest>, AppError> {
        Ok(self.inner.read().await.requests.get(&id).cloned())
    }

    async fn find_request_by_number(&self, number: i64) -> Result<Option<AidRequest>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .requests
            .values()
            .find(|r| r.request_number == Some(number))
            .cloned())
    }

    async fn list_requests(&self, filter: RequestFilter) -> Result<Vec<AidRequest>, AppError> {
        let inner = self.inner.read().await;
        let requests = inner
            .requests
            .values()
            .filter(|r| {
                filter
                    .assigned_lawyer
                    .map_or(true, |l| r.assigned_lawyer == Some(l))
            })
            .filter(|r| filter.status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        Ok(newest_first(requests, |r: &AidRequest| r.created_at))
    }

    async fn insert_request(&self, request: &AidRequest) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        if let Some(number) = request.request_number {
            if inner
                .requests
                .values()
                .any(|r| r.request_number == Some(number))
            {
                return Err(AppError::conflict("A request with this number already exists"));
            }
        }
        inner.requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn update_request(&self, request: &AidRequest) -> Result<bool, AppError> {
        let mut inner = self.inner.write().await;
        if let Some(number) = request.request_number {
            if inner
                .requests
                .values()
                .any(|r| r.id != request.id && r.request_number == Some(number))
            {
                return Err(AppError::conflict("A request with this number already exists"));
            }
        }
        let Some(stored) = inner.requests.get_mut(&request.id) else {
            return Ok(false);
        };
        let case_details = std::mem::take(&mut stored.case_details);
        *stored = AidRequest {
            case_details,
            ..request.clone()
        };
        Ok(true)
    }

    async fn delete_request(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.inner.write().await.requests.remove(&id).is_some())
    }

    async fn add_request_case(&self, request_id: Uuid, case_id: Uuid) -> Result<(), AppError> {
        if let Some(request) = self.inner.write().await.requests.get_mut(&request_id) {
            add_to_set(&mut request.case_details, case_id);
        }
        Ok(())
    }

    async fn remove_request_case(
        &self,
        request_id: Uuid,
        case_id: Uuid,
    ) -> Result<(), AppError> {
        if let Some(request) = self.inner.write().await.requests.get_mut(&request_id) {
            request.case_details.retain(|id| *id != case_id);
        }
        Ok(())
    }

    async fn link_request_incident(
        &self,
        request_id: Uuid,
        incident_id: Uuid,
    ) -> Result<(), AppError> {
        if let Some(request) = self.inner.write().await.requests.get_mut(&request_id) {
            if request.incident.is_none() {
                request.incident = Some(incident_id);
                request.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn clear_request_incident(
        &self,
        request_id: Uuid,
        incident_id: Uuid,
    ) -> Result<(), AppError> {
        if let Some(request) = self.inner.write().await.requests.get_mut(&request_id) {
            if request.incident == Some(incident_id) {
                request.incident = None;
            }
        }
        Ok(())
    }

    // ── Incidents ───────────────────────────────────────────────────

    async fn find_incident(&self, id: Uuid) -> Result<Option<Incident>, AppError> {
        Ok(self.inner.read().await.incidents.get(&id).cloned())
    }

    async fn list_incidents(&self) -> Result<Vec<Incident>, AppError> {
        let incidents = self.inner.read().await.incidents.values().cloned().collect();
        Ok(newest_first(incidents, |i: &Incident| i.created_at))
    }

    async fn insert_incident(&self, incident: &Incident) -> Result<(), AppError> {
        self.inner
            .write()
            .await
            .incidents
            .insert(incident.id, incident.clone());
        Ok(())
    }

    async fn update_incident(&self, incident: &Incident) -> Result<bool, AppError> {
        let mut inner = self.inner.write().await;
        match inner.incidents.get_mut(&incident.id) {
            Some(stored) => {
                *stored = incident.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_incident(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.inner.write().await.incidents.remove(&id).is_some())
    }

    async fn set_incident_request(
        &self,
        incident_id: Uuid,
        request_id: Option<Uuid>,
    ) -> Result<(), AppError> {
        if let Some(incident) = self.inner.write().await.incidents.get_mut(&incident_id) {
            incident.related_request = request_id;
        }
        Ok(())
    }

    async fn detach_request_incidents(&self, request_id: Uuid) -> Result<u64, AppError> {
        let mut inner = self.inner.write().await;
        let mut touched = 0;
        for incident in inner.incidents.values_mut() {
            if incident.related_request == Some(request_id) {
                incident.related_request = None;
                incident.updated_at = Utc::now();
                touched += 1;
            }
        }
        Ok(touched)
    }

    // ── Cases ───────────────────────────────────────────────────────

    async fn find_case(&self, id: Uuid) -> Result<Option<CaseDetails>, AppError> {
        Ok(self.inner.read().await.cases.get(&id).cloned())
    }

    async fn list_cases(&self, filter: CaseFilter) -> Result<Vec<CaseDetails>, AppError> {
        let inner = self.inner.read().await;
        let cases = inner
            .cases
            .values()
            .filter(|c| filter.lawyer.map_or(true, |l| c.lawyer == l))
            .filter(|c| filter.related_request.map_or(true, |r| c.related_request == r))
            .cloned()
            .collect();
        Ok(newest_first(cases, |c: &CaseDetails| c.created_at))
    }

    async fn insert_case(&self, case: &CaseDetails) -> Result<(), AppError> {
        self.inner.write().await.cases.insert(case.id, case.clone());
        Ok(())
    }

    async fn update_case(&self, case: &CaseDetails) -> Result<bool, AppError> {
        let mut inner = self.inner.write().await;
        match inner.cases.get_mut(&case.id) {
            Some(stored) => {
                *stored = case.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_case(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.inner.write().await.cases.remove(&id).is_some())
    }
}
