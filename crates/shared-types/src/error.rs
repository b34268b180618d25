use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Categorization of application errors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum AppErrorKind {
    NotFound,
    BadRequest,
    ValidationError,
    Conflict,
    DatabaseError,
    Unauthorized,
    Forbidden,
    InternalError,
    /// A reference id that does not parse as an entity id.
    MalformedId,
    /// A well-formed reference to a document that does not exist.
    DanglingReference,
    /// A user reference whose role does not satisfy the field's constraint.
    RoleMismatch,
    UnsupportedMediaType,
    StorageWrite,
    StorageDelete,
    InvalidStatus,
}

impl fmt::Display for AppErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AppErrorKind::NotFound => "NotFound",
            AppErrorKind::BadRequest => "BadRequest",
            AppErrorKind::ValidationError => "ValidationError",
            AppErrorKind::Conflict => "Conflict",
            AppErrorKind::DatabaseError => "DatabaseError",
            AppErrorKind::Unauthorized => "Unauthorized",
            AppErrorKind::Forbidden => "Forbidden",
            AppErrorKind::InternalError => "InternalError",
            AppErrorKind::MalformedId => "MalformedId",
            AppErrorKind::DanglingReference => "DanglingReference",
            AppErrorKind::RoleMismatch => "RoleMismatch",
            AppErrorKind::UnsupportedMediaType => "UnsupportedMediaType",
            AppErrorKind::StorageWrite => "StorageWrite",
            AppErrorKind::StorageDelete => "StorageDelete",
            AppErrorKind::InvalidStatus => "InvalidStatus",
        };
        f.write_str(name)
    }
}

/// Structured application error returned by every engine operation and
/// rendered as the JSON body of failed HTTP responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AppError {
    pub kind: AppErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub field_errors: HashMap<String, String>,
}

impl AppError {
    pub fn new(kind: AppErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            field_errors: HashMap::new(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::BadRequest, message)
    }

    pub fn validation(message: impl Into<String>, field_errors: HashMap<String, String>) -> Self {
        Self {
            kind: AppErrorKind::ValidationError,
            message: message.into(),
            field_errors,
        }
    }

    /// Validation failure carrying a single field.
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut field_errors = HashMap::new();
        field_errors.insert(field.into(), message.into());
        Self::validation("Validation failed", field_errors)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Conflict, message)
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::DatabaseError, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Forbidden, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::InternalError, message)
    }

    pub fn malformed_id(field: &str) -> Self {
        Self::new(
            AppErrorKind::MalformedId,
            format!("{field} is not a valid id"),
        )
    }

    pub fn dangling_reference(field: &str) -> Self {
        Self::new(
            AppErrorKind::DanglingReference,
            format!("{field} refers to a record that does not exist"),
        )
    }

    pub fn role_mismatch(field: &str, expected: &str) -> Self {
        Self::new(
            AppErrorKind::RoleMismatch,
            format!("{field} must refer to a user with role {expected}"),
        )
    }

    pub fn unsupported_media_type(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::UnsupportedMediaType, message)
    }

    pub fn storage_write(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::StorageWrite, message)
    }

    pub fn storage_delete(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::StorageDelete, message)
    }

    pub fn invalid_status(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::InvalidStatus, message)
    }

    #[cfg_attr(not(feature = "server"), allow(dead_code))]
    fn status_code_u16(&self) -> u16 {
        match self.kind {
            AppErrorKind::NotFound => 404,
            AppErrorKind::BadRequest => 400,
            AppErrorKind::ValidationError => 422,
            AppErrorKind::Conflict => 409,
            AppErrorKind::DatabaseError => 500,
            AppErrorKind::Unauthorized => 401,
            AppErrorKind::Forbidden => 403,
            AppErrorKind::InternalError => 500,
            AppErrorKind::MalformedId => 400,
            AppErrorKind::DanglingReference => 422,
            AppErrorKind::RoleMismatch => 422,
            AppErrorKind::UnsupportedMediaType => 415,
            AppErrorKind::StorageWrite => 502,
            AppErrorKind::StorageDelete => 502,
            AppErrorKind::InvalidStatus => 400,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for AppError {}

#[cfg(feature = "validation")]
impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut field_errors = HashMap::new();
        for (field, errs) in errors.field_errors() {
            if let Some(first) = errs.first() {
                let msg = first
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for {}", field));
                field_errors.insert(field.to_string(), msg);
            }
        }
        AppError::validation("Validation failed", field_errors)
    }
}

#[cfg(feature = "server")]
impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = axum::http::StatusCode::from_u16(self.status_code_u16())
            .unwrap_or(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        (status, axum::Json(self)).into_response()
    }
}
