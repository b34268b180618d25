//! Views scoped to the calling lawyer. Admins see everything.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use shared_types::{AidRequestResponse, AppError, CaseResponse};

use super::path_id;
use crate::auth::extractors::{LawyerRequired, RoleRequired};
use crate::engine::Engine;

/// GET /api/lawyer/requests
#[utoipa::path(
    get,
    path = "/api/lawyer/requests",
    responses(
        (status = 200, description = "Approved requests assigned to the caller", body = Vec<AidRequestResponse>),
        (status = 401, description = "Authentication required", body = AppError)
    ),
    tag = "lawyer"
)]
#[tracing::instrument(skip_all, fields(user_id = %actor.user_id))]
pub async fn my_requests(
    State(engine): State<Arc<Engine>>,
    RoleRequired(actor): LawyerRequired,
) -> Result<Json<Vec<AidRequestResponse>>, AppError> {
    let requests = engine.lawyer_requests(&actor).await?;
    Ok(Json(engine.present_requests(requests).await?))
}

/// GET /api/lawyer/cases
#[utoipa::path(
    get,
    path = "/api/lawyer/cases",
    responses(
        (status = 200, description = "Cases owned by the caller", body = Vec<CaseResponse>),
        (status = 401, description = "Authentication required", body = AppError)
    ),
    tag = "lawyer"
)]
#[tracing::instrument(skip_all, fields(user_id = %actor.user_id))]
pub async fn my_cases(
    State(engine): State<Arc<Engine>>,
    RoleRequired(actor): LawyerRequired,
) -> Result<Json<Vec<CaseResponse>>, AppError> {
    let cases = engine.lawyer_cases(&actor).await?;
    Ok(Json(engine.present_cases(cases).await?))
}

/// GET /api/lawyer/cases/{id}
#[utoipa::path(
    get,
    path = "/api/lawyer/cases/{id}",
    params(("id" = String, Path, description = "Case id")),
    responses(
        (status = 200, description = "Case found", body = CaseResponse),
        (status = 404, description = "No such case owned by the caller", body = AppError)
    ),
    tag = "lawyer"
)]
#[tracing::instrument(skip_all, fields(user_id = %actor.user_id, id = %id))]
pub async fn my_case(
    State(engine): State<Arc<Engine>>,
    RoleRequired(actor): LawyerRequired,
    Path(id): Path<String>,
) -> Result<Json<CaseResponse>, AppError> {
    let case = engine.lawyer_case(&actor, path_id(&id)?).await?;
    Ok(Json(engine.present_case(case).await?))
}
