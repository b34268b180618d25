pub mod auth;
pub mod cases;
pub mod files;
pub mod incidents;
pub mod lawyer;
pub mod requests;
pub mod upload;
pub mod users;

use axum::{
    routing::{get, patch, post},
    Router,
};
use shared_types::AppError;
use uuid::Uuid;

use crate::db::AppState;

/// Build the REST API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        // Auth
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/password-reset/request", post(auth::request_password_reset))
        .route("/api/auth/password-reset/confirm", post(auth::confirm_password_reset))
        // Requests (intake is public)
        .route("/api/requests", get(requests::list_requests).post(requests::create_request))
        .route(
            "/api/requests/{id}",
            get(requests::get_request)
                .patch(requests::update_request)
                .delete(requests::delete_request),
        )
        .route("/api/requests/{id}/status", patch(requests::set_request_status))
        // Incidents
        .route("/api/incidents", get(incidents::list_incidents).post(incidents::create_incident))
        .route("/api/incidents/categories", get(incidents::list_categories))
        .route(
            "/api/incidents/{id}",
            get(incidents::get_incident)
                .patch(incidents::update_incident)
                .delete(incidents::delete_incident),
        )
        // Cases
        .route("/api/cases", get(cases::list_cases).post(cases::create_case))
        .route(
            "/api/cases/{id}",
            get(cases::get_case)
                .patch(cases::update_case)
                .delete(cases::delete_case),
        )
        // Lawyer views
        .route("/api/lawyer/requests", get(lawyer::my_requests))
        .route("/api/lawyer/cases", get(lawyer::my_cases))
        .route("/api/lawyer/cases/{id}", get(lawyer::my_case))
        // Users
        .route("/api/users", get(users::list_users).post(users::create_user))
        .route(
            "/api/users/{id}",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        // Stored objects
        .route("/api/files", get(files::list_files))
        .route("/api/files/presign", get(files::presign_file))
        .route("/api/files/sweep", post(files::sweep_orphans))
}

/// Parse an `{id}` path segment.
pub(crate) fn path_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::malformed_id("id"))
}
