use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "validation")]
use validator::Validate;

/// Role of an authenticated staff user.
///
/// - `Lawyer`: sees approved requests assigned to them and manages their cases.
/// - `Admin`: full access (superset of lawyer).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Lawyer,
}

impl UserRole {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Some(UserRole::Admin),
            "lawyer" => Some(UserRole::Lawyer),
            _ => None,
        }
    }

    /// Lowercase string for database / JWT storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Lawyer => "lawyer",
        }
    }

    /// Returns true if this role satisfies the `required` role.
    /// Admin satisfies all roles.
    pub fn satisfies(&self, required: &UserRole) -> bool {
        match self {
            UserRole::Admin => true,
            UserRole::Lawyer => matches!(required, UserRole::Lawyer),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
}

impl UserStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "active" => Some(UserStatus::Active),
            "inactive" => Some(UserStatus::Inactive),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
        }
    }
}

/// Resolved caller identity handed to the engine by the auth layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

// ── Stored entity ───────────────────────────────────────────────────

/// A staff account. `requests` and `cases` are owned id sets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub telephone: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub baro_registration_number: Option<i64>,
    pub requests: Vec<Uuid>,
    pub cases: Vec<Uuid>,
    #[serde(skip_serializing)]
    pub refresh_token_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ── API request types ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct CreateUserRequest {
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Full name is required"))
    )]
    pub full_name: String,
    #[serde(default)]
    pub telephone: String,
    #[cfg_attr(
        feature = "validation",
        validate(email(message = "Valid email is required"))
    )]
    pub email: String,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 8, message = "Password must be at least 8 characters"))
    )]
    pub password: String,
    pub role: UserRole,
    #[serde(default)]
    pub status: Option<UserStatus>,
    #[serde(default)]
    pub baro_registration_number: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct UpdateUserRequest {
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Full name is required"))
    )]
    pub full_name: Option<String>,
    pub telephone: Option<String>,
    #[cfg_attr(
        feature = "validation",
        validate(email(message = "Valid email is required"))
    )]
    pub email: Option<String>,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 8, message = "Password must be at least 8 characters"))
    )]
    pub password: Option<String>,
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
    pub baro_registration_number: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Refresh token supplied in the body when the cookie is unavailable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Admin request to issue a password reset token for an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct PasswordResetConfirm {
    pub token: String,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 8, message = "Password must be at least 8 characters"))
    )]
    pub new_password: String,
}

// ── API response types ──────────────────────────────────────────────

/// A freshly issued reset token. The raw token appears only here; the
/// server keeps its digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PasswordResetTicket {
    pub user_id: String,
    pub token: String,
    pub expires_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UserResponse {
    pub id: String,
    pub full_name: String,
    pub telephone: String,
    pub email: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub baro_registration_number: Option<i64>,
    pub requests: Vec<String>,
    pub cases: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id.to_string(),
            full_name: u.full_name,
            telephone: u.telephone,
            email: u.email,
            role: u.role,
            status: u.status,
            baro_registration_number: u.baro_registration_number,
            requests: u.requests.iter().map(Uuid::to_string).collect(),
            cases: u.cases.iter().map(Uuid::to_string).collect(),
            created_at: u.created_at.to_rfc3339(),
            updated_at: u.updated_at.to_rfc3339(),
        }
    }
}

/// Populated user reference embedded in request and case views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UserSummary {
    pub id: String,
    pub full_name: String,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.to_string(),
            full_name: u.full_name.clone(),
            email: u.email.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserResponse,
}
