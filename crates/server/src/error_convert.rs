use shared_types::AppError;

/// Convert a sqlx::Error into an AppError.
pub fn sqlx_to_app_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::RowNotFound => AppError::not_found("Resource not found"),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique constraint violation (error code 23505)
            if db_err.code().as_deref() == Some("23505") {
                let detail = db_err.message();
                let friendly = if detail.contains("email") {
                    "An account with this email already exists"
                } else if detail.contains("request_number") {
                    "A request with this number already exists"
                } else {
                    "A record with this value already exists"
                };
                return AppError::conflict(friendly);
            }
            tracing::error!(error = %err, "Database error");
            AppError::database("Database operation failed")
        }
        _ => {
            tracing::error!(error = %err, "Database error");
            AppError::database("Database operation failed")
        }
    }
}

/// Extension trait providing `.into_app_error()` on sqlx::Error.
pub trait SqlxErrorExt {
    fn into_app_error(self) -> AppError;
}

impl SqlxErrorExt for sqlx::Error {
    fn into_app_error(self) -> AppError {
        sqlx_to_app_error(self)
    }
}

/// Trait for validating request DTOs before processing.
pub trait ValidateRequest {
    fn validate_request(&self) -> Result<(), AppError>;
}

impl<T: validator::Validate> ValidateRequest for T {
    fn validate_request(&self) -> Result<(), AppError> {
        self.validate().map_err(AppError::from)
    }
}
