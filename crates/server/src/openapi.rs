use axum::extract::DefaultBodyLimit;
use axum::Router;
use shared_types::{
    AidRequestResponse, AidRequestSummary, AppError, AppErrorKind, AuthResponse, CaseDocuments,
    CaseFolder, CaseResponse, CaseSummary, CreateAidRequest, CreateCaseRequest,
    CreateUserRequest, IncidentCategory, IncidentInput, IncidentPatch, IncidentResponse,
    LoginRequest, MessageResponse, PasswordResetConfirm, PasswordResetRequest,
    PasswordResetTicket, PresignedUrlResponse, RefreshRequest, RequestStatus,
    SetStatusRequest, StoredObjectList, Submission, SweepReport, UpdateAidRequest,
    UpdateCaseRequest, UpdateIncidentRequest, UpdateUserRequest, UserResponse, UserRole,
    UserStatus, UserSummary,
};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::db::AppState;
use crate::health;
use crate::rest;

/// OpenAPI documentation for the API.
#[derive(OpenApi)]
#[openapi(
    paths(
        rest::auth::login,
        rest::auth::refresh,
        rest::auth::logout,
        rest::auth::me,
        rest::auth::request_password_reset,
        rest::auth::confirm_password_reset,
        rest::requests::create_request,
        rest::requests::list_requests,
        rest::requests::get_request,
        rest::requests::update_request,
        rest::requests::delete_request,
        rest::requests::set_request_status,
        rest::incidents::create_incident,
        rest::incidents::list_incidents,
        rest::incidents::list_categories,
        rest::incidents::get_incident,
        rest::incidents::update_incident,
        rest::incidents::delete_incident,
        rest::cases::create_case,
        rest::cases::list_cases,
        rest::cases::get_case,
        rest::cases::update_case,
        rest::cases::delete_case,
        rest::lawyer::my_requests,
        rest::lawyer::my_cases,
        rest::lawyer::my_case,
        rest::users::list_users,
        rest::users::create_user,
        rest::users::get_user,
        rest::users::update_user,
        rest::users::delete_user,
        rest::files::list_files,
        rest::files::presign_file,
        rest::files::sweep_orphans,
        health::health_check,
    ),
    components(schemas(
        AppError, AppErrorKind,
        // Requests
        CreateAidRequest, UpdateAidRequest, SetStatusRequest, AidRequestResponse,
        AidRequestSummary, RequestStatus, Submission,
        // Incidents
        IncidentInput, IncidentPatch, UpdateIncidentRequest, IncidentResponse, IncidentCategory,
        // Cases
        CreateCaseRequest, UpdateCaseRequest, CaseResponse, CaseSummary, CaseDocuments, CaseFolder,
        // Users and auth
        CreateUserRequest, UpdateUserRequest, UserResponse, UserSummary, UserRole, UserStatus,
        LoginRequest, RefreshRequest, AuthResponse, MessageResponse,
        PasswordResetRequest, PasswordResetConfirm, PasswordResetTicket,
        // Stored objects
        StoredObjectList, PresignedUrlResponse, SweepReport,
        health::HealthResponse,
    )),
    tags(
        (name = "auth", description = "Staff login sessions"),
        (name = "requests", description = "Legal-aid requests and public intake"),
        (name = "incidents", description = "Rights-violation incidents"),
        (name = "cases", description = "Court cases opened for approved requests"),
        (name = "lawyer", description = "Views scoped to the calling lawyer"),
        (name = "users", description = "Staff accounts"),
        (name = "files", description = "Stored object maintenance"),
        (name = "health", description = "Health check endpoint")
    ),
    info(
        title = "Legal Aid Intake API",
        description = "Requests, incidents, cases and their documents",
        version = "1.0.0"
    )
)]
pub struct ApiDoc;

/// The full HTTP surface: REST API under `/api`, `/health`, and the API
/// docs at `/docs`, with auth, body-limit, tracing and request-id layers.
pub fn app_router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .merge(rest::api_router())
        .route("/health", axum::routing::get(health::health_check))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::auth::middleware::auth_middleware,
        ))
        .with_state(state)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
