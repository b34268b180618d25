use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared_types::{
    AidRequest, AppError, CaseDetails, CaseDocuments, Incident, IncidentCategory, RequestStatus,
    Submission, User, UserRole, UserStatus,
};
use sqlx::types::Json;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::{CaseFilter, DocumentStore, PasswordReset, RequestFilter};
use crate::error_convert::SqlxErrorExt;

const USER_COLUMNS: &str = "id, full_name, telephone, email, password_hash, role, status, \
     baro_registration_number, requests, cases, refresh_token_hash, created_at, updated_at";

const REQUEST_COLUMNS: &str = "id, request_number, email, telephone, national_id, name, surname, \
     applicant_type, complaint_reason, status, submissions, incident_id, case_details, \
     received_by, assigned_lawyer, archived, created_at, updated_at";

const INCIDENT_COLUMNS: &str = "id, category, scan_period, event_category, event_summary, source, \
     link, image_link, notification_agency, commission, public_institution, uploaded_files, \
     related_request, created_at, updated_at";

const CASE_COLUMNS: &str = "id, party_name, case_subject, case_lawyer, file_number, court, \
     indictment, court_file_number, result_description, result_stage, lawyer_id, documents, \
     related_request, archived, created_at, updated_at";

/// Postgres-backed document store.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}

// ── Row mapping ─────────────────────────────────────────────────────

fn corrupt(column: &str, value: &str) -> AppError {
    tracing::error!(column, value, "Unexpected value stored in database");
    AppError::database("Stored record is corrupt")
}

#[derive(sqlx::FromRow)]
struct PasswordResetRow {
    user_id: Uuid,
    token_hash: String,
    expires_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    full_name: String,
    telephone: String,
    email: String,
    password_hash: String,
    role: String,
    status: String,
    baro_registration_number: Option<i64>,
    requests: Vec<Uuid>,
    cases: Vec<Uuid>,
    refresh_token_hash: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            role: UserRole::parse(&row.role).ok_or_else(|| corrupt("users.role", &row.role))?,
            status: UserStatus::parse(&row.status)
                .ok_or_else(|| corrupt("users.status", &row.status))?,
            id: row.id,
            full_name: row.full_name,
            telephone: row.telephone,
            email: row.email,
            password_hash: row.password_hash,
            baro_registration_number: row.baro_registration_number,
            requests: row.requests,
            cases: row.cases,
            refresh_token_hash: row.refresh_token_hash,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RequestRow {
    id: Uuid,
    request_number: Option<i64>,
    email: String,
    telephone: String,
    national_id: String,
    name: String,
    surname: String,
    applicant_type: String,
    complaint_reason: String,
    status: String,
    submissions: Json<Vec<Submission>>,
    incident_id: Option<Uuid>,
    case_details: Vec<Uuid>,
    received_by: Option<Uuid>,
    assigned_lawyer: Option<Uuid>,
    archived: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RequestRow> for AidRequest {
    type Error = AppError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        Ok(AidRequest {
            status: RequestStatus::parse(&row.status)
                .ok_or_else(|| corrupt("aid_requests.status", &row.status))?,
            id: row.id,
            request_number: row.request_number,
            email: row.email,
            telephone: row.telephone,
            national_id: row.national_id,
            name: row.name,
            surname: row.surname,
            applicant_type: row.applicant_type,
            complaint_reason: row.complaint_reason,
            submissions: row.submissions.0,
            incident: row.incident_id,
            case_details: row.case_details,
            received_by: row.received_by,
            assigned_lawyer: row.assigned_lawyer,
            archived: row.archived,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct IncidentRow {
    id: Uuid,
    category: String,
    scan_period: String,
    event_category: String,
    event_summary: String,
    source: Option<String>,
    link: String,
    image_link: Option<String>,
    notification_agency: Option<String>,
    commission: Option<String>,
    public_institution: Option<String>,
    uploaded_files: Vec<String>,
    related_request: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<IncidentRow> for Incident {
    type Error = AppError;

    fn try_from(row: IncidentRow) -> Result<Self, Self::Error> {
        Ok(Incident {
            category: IncidentCategory::parse(&row.category)
                .ok_or_else(|| corrupt("incidents.category", &row.category))?,
            id: row.id,
            scan_period: row.scan_period,
            event_category: row.event_category,
            event_summary: row.event_summary,
            source: row.source,
            link: row.link,
            image_link: row.image_link,
            notification_agency: row.notification_agency,
            commission: row.commission,
            public_institution: row.public_institution,
            uploaded_files: row.uploaded_files,
            related_request: row.related_request,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CaseRow {
    id: Uuid,
    party_name: String,
    case_subject: String,
    case_lawyer: String,
    file_number: i64,
    court: String,
    indictment: String,
    court_file_number: String,
    result_description: String,
    result_stage: String,
    lawyer_id: Uuid,
    documents: Json<CaseDocuments>,
    related_request: Uuid,
    archived: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CaseRow> for CaseDetails {
    fn from(row: CaseRow) -> Self {
        CaseDetails {
            id: row.id,
            party_name: row.party_name,
            case_subject: row.case_subject,
            case_lawyer: row.case_lawyer,
            file_number: row.file_number,
            court: row.court,
            indictment: row.indictment,
            court_file_number: row.court_file_number,
            result_description: row.result_description,
            result_stage: row.result_stage,
            lawyer: row.lawyer_id,
            documents: row.documents.0,
            related_request: row.related_request,
            archived: row.archived,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, AppError>
where
    T: TryFrom<R, Error = AppError>,
{
    rows.into_iter().map(T::try_from).collect()
}

// ── Store ───────────────────────────────────────────────────────────

#[async_trait]
impl DocumentStore for PgStore {
    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_app_error)?;
        Ok(())
    }

    // ── Users ───────────────────────────────────────────────────────

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_app_error)?
            .map(User::try_from)
            .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?
        .map(User::try_from)
        .transpose()
    }

    async fn list_users(&self, role: Option<UserRole>) -> Result<Vec<User>, AppError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE ($1::text IS NULL OR role = $1) \
             ORDER BY created_at DESC"
        ))
        .bind(role.map(|r| r.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
        convert_all(rows)
    }

    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(&format!(
            "INSERT INTO users ({USER_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"
        ))
        .bind(user.id)
        .bind(&user.full_name)
        .bind(&user.telephone)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.status.as_str())
        .bind(user.baro_registration_number)
        .bind(user.requests.as_slice())
        .bind(user.cases.as_slice())
        .bind(user.refresh_token_hash.as_deref())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET full_name = $2, telephone = $3, email = $4, password_hash = $5,
                role = $6, status = $7, baro_registration_number = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.full_name)
        .bind(&user.telephone)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.status.as_str())
        .bind(user.baro_registration_number)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_app_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_user_request(&self, user_id: Uuid, request_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE users SET requests = array_append(requests, $2), updated_at = NOW()
            WHERE id = $1 AND NOT ($2 = ANY(requests))
            "#,
        )
        .bind(user_id)
        .bind(request_id)
        .execute(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
        Ok(())
    }

    async fn remove_user_request(
        &self,
        user_id: Uuid,
        request_id: Uuid,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE users SET requests = array_remove(requests, $2), updated_at = NOW() WHERE id = $1",
        )
        .bind(user_id)
        .bind(request_id)
        .execute(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
        Ok(())
    }

    async fn add_user_case(&self, user_id: Uuid, case_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE users SET cases = array_append(cases, $2), updated_at = NOW()
            WHERE id = $1 AND NOT ($2 = ANY(cases))
            "#,
        )
        .bind(user_id)
        .bind(case_id)
        .execute(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
        Ok(())
    }

    async fn remove_user_case(&self, user_id: Uuid, case_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE users SET cases = array_remove(cases, $2), updated_at = NOW() WHERE id = $1",
        )
        .bind(user_id)
        .bind(case_id)
        .execute(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
        Ok(())
    }

    async fn set_refresh_token(
        &self,
        user_id: Uuid,
        hash: Option<&str>,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET refresh_token_hash = $2 WHERE id = $1")
            .bind(user_id)
            .bind(hash)
            .execute(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_app_error)?;
        Ok(())
    }

    async fn clear_user_from_requests(&self, user_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE aid_requests
            SET received_by = CASE WHEN received_by = $1 THEN NULL ELSE received_by END,
                assigned_lawyer = CASE WHEN assigned_lawyer = $1 THEN NULL ELSE assigned_lawyer END,
                updated_at = NOW()
            WHERE received_by = $1 OR assigned_lawyer = $1
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
        Ok(result.rows_affected())
    }

    async fn put_password_reset(&self, reset: &PasswordReset) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO password_resets (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE
            SET token_hash = EXCLUDED.token_hash, expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(reset.user_id)
        .bind(&reset.token_hash)
        .bind(reset.expires_at)
        .execute(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
        Ok(())
    }

    async fn take_password_reset(
        &self,
        token_hash: &str,
    ) -> Result<Option<PasswordReset>, AppError> {
        let row = sqlx::query_as::<_, PasswordResetRow>(
            r#"
            DELETE FROM password_resets WHERE token_hash = $1
            RETURNING user_id, token_hash, expires_at
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
        Ok(row.map(|r| PasswordReset {
            user_id: r.user_id,
            token_hash: r.token_hash,
            expires_at: r.expires_at,
        }))
    }

    // ── Requests ────────────────────────────────────────────────────

    async fn find_request(&self, id: Uuid) -> Result<Option<AidRequest>, AppError> {
        sqlx::query_as::<_, RequestRow>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM aid_requests WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?
        .map(AidRequest::try_from)
        .transpose()
    }

    async fn find_request_by_number(&self, number: i64) -> Result<Option<AidRequest>, AppError> {
        sqlx::query_as::<_, RequestRow>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM aid_requests WHERE request_number = $1"
        ))
        .bind(number)
        .fetch_optional(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?
        .map(AidRequest::try_from)
        .transpose()
    }

    async fn list_requests(&self, filter: RequestFilter) -> Result<Vec<AidRequest>, AppError> {
        let rows = sqlx::query_as::<_, RequestRow>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM aid_requests \
             WHERE ($1::uuid IS NULL OR assigned_lawyer = $1) \
               AND ($2::text IS NULL OR status = $2) \
             ORDER BY created_at DESC"
        ))
        .bind(filter.assigned_lawyer)
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
        convert_all(rows)
    }

    async fn insert_request(&self, request: &AidRequest) -> Result<(), AppError> {
        sqlx::query(&format!(
            "INSERT INTO aid_requests ({REQUEST_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)"
        ))
        .bind(request.id)
        .bind(request.request_number)
        .bind(&request.email)
        .bind(&request.telephone)
        .bind(&request.national_id)
        .bind(&request.name)
        .bind(&request.surname)
        .bind(&request.applicant_type)
        .bind(&request.complaint_reason)
        .bind(request.status.as_str())
        .bind(Json(&request.submissions))
        .bind(request.incident)
        .bind(request.case_details.as_slice())
        .bind(request.received_by)
        .bind(request.assigned_lawyer)
        .bind(request.archived)
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
        Ok(())
    }

    async fn update_request(&self, request: &AidRequest) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE aid_requests
            SET request_number = $2, email = $3, telephone = $4, national_id = $5,
                name = $6, surname = $7, applicant_type = $8, complaint_reason = $9,
                status = $10, submissions = $11, incident_id = $12, received_by = $13,
                assigned_lawyer = $14, archived = $15, updated_at = $16
            WHERE id = $1
            "#,
        )
        .bind(request.id)
        .bind(request.request_number)
        .bind(&request.email)
        .bind(&request.telephone)
        .bind(&request.national_id)
        .bind(&request.name)
        .bind(&request.surname)
        .bind(&request.applicant_type)
        .bind(&request.complaint_reason)
        .bind(request.status.as_str())
        .bind(Json(&request.submissions))
        .bind(request.incident)
        .bind(request.received_by)
        .bind(request.assigned_lawyer)
        .bind(request.archived)
        .bind(request.updated_at)
        .execute(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_request(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM aid_requests WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_app_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_request_case(&self, request_id: Uuid, case_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE aid_requests SET case_details = array_append(case_details, $2), updated_at = NOW()
            WHERE id = $1 AND NOT ($2 = ANY(case_details))
            "#,
        )
        .bind(request_id)
        .bind(case_id)
        .execute(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
        Ok(())
    }

    async fn remove_request_case(
        &self,
        request_id: Uuid,
        case_id: Uuid,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE aid_requests SET case_details = array_remove(case_details, $2), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(request_id)
        .bind(case_id)
        .execute(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
        Ok(())
    }

    async fn link_request_incident(
        &self,
        request_id: Uuid,
        incident_id: Uuid,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE aid_requests SET incident_id = $2, updated_at = NOW()
            WHERE id = $1 AND incident_id IS NULL
            "#,
        )
        .bind(request_id)
        .bind(incident_id)
        .execute(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
        Ok(())
    }

    async fn clear_request_incident(
        &self,
        request_id: Uuid,
        incident_id: Uuid,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE aid_requests SET incident_id = NULL, updated_at = NOW()
            WHERE id = $1 AND incident_id = $2
            "#,
        )
        .bind(request_id)
        .bind(incident_id)
        .execute(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
        Ok(())
    }

    // ── Incidents ───────────────────────────────────────────────────

    async fn find_incident(&self, id: Uuid) -> Result<Option<Incident>, AppError> {
        sqlx::query_as::<_, IncidentRow>(&format!(
            "SELECT {INCIDENT_COLUMNS} FROM incidents WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?
        .map(Incident::try_from)
        .transpose()
    }

    async fn list_incidents(&self) -> Result<Vec<Incident>, AppError> {
        let rows = sqlx::query_as::<_, IncidentRow>(&format!(
            "SELECT {INCIDENT_COLUMNS} FROM incidents ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
        convert_all(rows)
    }

    async fn insert_incident(&self, incident: &Incident) -> Result<(), AppError> {
        sqlx::query(&format!(
            "INSERT INTO incidents ({INCIDENT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)"
        ))
        .bind(incident.id)
        .bind(incident.category.as_str())
        .bind(&incident.scan_period)
        .bind(&incident.event_category)
        .bind(&incident.event_summary)
        .bind(incident.source.as_deref())
        .bind(&incident.link)
        .bind(incident.image_link.as_deref())
        .bind(incident.notification_agency.as_deref())
        .bind(incident.commission.as_deref())
        .bind(incident.public_institution.as_deref())
        .bind(incident.uploaded_files.as_slice())
        .bind(incident.related_request)
        .bind(incident.created_at)
        .bind(incident.updated_at)
        .execute(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
        Ok(())
    }

    async fn update_incident(&self, incident: &Incident) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE incidents
            SET category = $2, scan_period = $3, event_category = $4, event_summary = $5,
                source = $6, link = $7, image_link = $8, notification_agency = $9,
                commission = $10, public_institution = $11, uploaded_files = $12,
                related_request = $13, updated_at = $14
            WHERE id = $1
            "#,
        )
        .bind(incident.id)
        .bind(incident.category.as_str())
        .bind(&incident.scan_period)
        .bind(&incident.event_category)
        .bind(&incident.event_summary)
        .bind(incident.source.as_deref())
        .bind(&incident.link)
        .bind(incident.image_link.as_deref())
        .bind(incident.notification_agency.as_deref())
        .bind(incident.commission.as_deref())
        .bind(incident.public_institution.as_deref())
        .bind(incident.uploaded_files.as_slice())
        .bind(incident.related_request)
        .bind(incident.updated_at)
        .execute(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_incident(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM incidents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_app_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_incident_request(
        &self,
        incident_id: Uuid,
        request_id: Option<Uuid>,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE incidents SET related_request = $2, updated_at = NOW() WHERE id = $1")
            .bind(incident_id)
            .bind(request_id)
            .execute(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_app_error)?;
        Ok(())
    }

    async fn detach_request_incidents(&self, request_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE incidents SET related_request = NULL, updated_at = NOW() WHERE related_request = $1",
        )
        .bind(request_id)
        .execute(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
        Ok(result.rows_affected())
    }

    // ── Cases ───────────────────────────────────────────────────────

    async fn find_case(&self, id: Uuid) -> Result<Option<CaseDetails>, AppError> {
        let row = sqlx::query_as::<_, CaseRow>(&format!(
            "SELECT {CASE_COLUMNS} FROM cases WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
        Ok(row.map(CaseDetails::from))
    }

    async fn list_cases(&self, filter: CaseFilter) -> Result<Vec<CaseDetails>, AppError> {
        let rows = sqlx::query_as::<_, CaseRow>(&format!(
            "SELECT {CASE_COLUMNS} FROM cases \
             WHERE ($1::uuid IS NULL OR lawyer_id = $1) \
               AND ($2::uuid IS NULL OR related_request = $2) \
             ORDER BY created_at DESC"
        ))
        .bind(filter.lawyer)
        .bind(filter.related_request)
        .fetch_all(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
        Ok(rows.into_iter().map(CaseDetails::from).collect())
    }

    async fn insert_case(&self, case: &CaseDetails) -> Result<(), AppError> {
        sqlx::query(&format!(
            "INSERT INTO cases ({CASE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)"
        ))
        .bind(case.id)
        .bind(&case.party_name)
        .bind(&case.case_subject)
        .bind(&case.case_lawyer)
        .bind(case.file_number)
        .bind(&case.court)
        .bind(&case.indictment)
        .bind(&case.court_file_number)
        .bind(&case.result_description)
        .bind(&case.result_stage)
        .bind(case.lawyer)
        .bind(Json(&case.documents))
        .bind(case.related_request)
        .bind(case.archived)
        .bind(case.created_at)
        .bind(case.updated_at)
        .execute(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
        Ok(())
    }

    async fn update_case(&self, case: &CaseDetails) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE cases
            SET party_name = $2, case_subject = $3, case_lawyer = $4, file_number = $5,
                court = $6, indictment = $7, court_file_number = $8,
                result_description = $9, result_stage = $10, lawyer_id = $11,
                documents = $12, related_request = $13, archived = $14, updated_at = $15
            WHERE id = $1
            "#,
        )
        .bind(case.id)
        .bind(&case.party_name)
        .bind(&case.case_subject)
        .bind(&case.case_lawyer)
        .bind(case.file_number)
        .bind(&case.court)
        .bind(&case.indictment)
        .bind(&case.court_file_number)
        .bind(&case.result_description)
        .bind(&case.result_stage)
        .bind(case.lawyer)
        .bind(Json(&case.documents))
        .bind(case.related_request)
        .bind(case.archived)
        .bind(case.updated_at)
        .execute(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_case(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM cases WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_app_error)?;
        Ok(result.rows_affected() > 0)
    }
}
