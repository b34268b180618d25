use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared_types::{AppError, CaseResponse, CreateCaseRequest, UpdateCaseRequest};
use uuid::Uuid;

use super::path_id;
use super::upload::{case_fields, UploadForm};
use crate::auth::extractors::{AdminRequired, LawyerRequired, RoleRequired};
use crate::engine::Engine;
use crate::repo::CaseFilter;

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CaseListParams {
    pub lawyer: Option<String>,
    pub related_request: Option<String>,
}

fn optional_id(raw: Option<&str>, field: &str) -> Result<Option<Uuid>, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Uuid::parse_str(raw)
            .map(Some)
            .map_err(|_| AppError::malformed_id(field)),
        None => Ok(None),
    }
}

/// POST /api/cases
///
/// Open a case for an approved request. A lawyer opens cases for
/// themselves; an admin must name the lawyer.
#[utoipa::path(
    post,
    path = "/api/cases",
    request_body(content = CreateCaseRequest, content_type = "multipart/form-data",
        description = "`data` JSON part plus `hearingReports`, `petitions` and `hearingMinutes` file parts"),
    responses(
        (status = 201, description = "Case created", body = CaseResponse),
        (status = 400, description = "Related request is not approved", body = AppError),
        (status = 403, description = "Lawyer role required", body = AppError),
        (status = 422, description = "Validation failed", body = AppError)
    ),
    tag = "cases"
)]
#[tracing::instrument(skip_all)]
pub async fn create_case(
    State(engine): State<Arc<Engine>>,
    RoleRequired(actor): LawyerRequired,
    multipart: Multipart,
) -> Result<(StatusCode, Json<CaseResponse>), AppError> {
    let mut form = UploadForm::read(multipart, &case_fields()).await?;
    let data = form.data::<CreateCaseRequest>()?;
    let case = engine.create_case(&actor, data, form.take_case_uploads()).await?;
    Ok((StatusCode::CREATED, Json(engine.present_case(case).await?)))
}

/// GET /api/cases
#[utoipa::path(
    get,
    path = "/api/cases",
    params(CaseListParams),
    responses(
        (status = 200, description = "Cases, newest first", body = Vec<CaseResponse>),
        (status = 403, description = "Admin role required", body = AppError)
    ),
    tag = "cases"
)]
#[tracing::instrument(skip_all)]
pub async fn list_cases(
    State(engine): State<Arc<Engine>>,
    _admin: AdminRequired,
    Query(params): Query<CaseListParams>,
) -> Result<Json<Vec<CaseResponse>>, AppError> {
    let filter = CaseFilter {
        lawyer: optional_id(params.lawyer.as_deref(), "lawyer")?,
        related_request: optional_id(params.related_request.as_deref(), "related_request")?,
    };
    let cases = engine.list_cases(filter).await?;
    Ok(Json(engine.present_cases(cases).await?))
}

/// GET /api/cases/{id}
#[utoipa::path(
    get,
    path = "/api/cases/{id}",
    params(("id" = String, Path, description = "Case id")),
    responses(
        (status = 200, description = "Case found", body = CaseResponse),
        (status = 404, description = "Case not found", body = AppError)
    ),
    tag = "cases"
)]
#[tracing::instrument(skip_all, fields(id = %id))]
pub async fn get_case(
    State(engine): State<Arc<Engine>>,
    _admin: AdminRequired,
    Path(id): Path<String>,
) -> Result<Json<CaseResponse>, AppError> {
    let case = engine.get_case(path_id(&id)?).await?;
    Ok(Json(engine.present_case(case).await?))
}

/// PATCH /api/cases/{id}
///
/// New files are appended; stored documents are kept.
#[utoipa::path(
    patch,
    path = "/api/cases/{id}",
    params(("id" = String, Path, description = "Case id")),
    request_body(content = UpdateCaseRequest, content_type = "multipart/form-data",
        description = "`data` JSON part plus `hearingReports`, `petitions` and `hearingMinutes` file parts"),
    responses(
        (status = 200, description = "Case updated", body = CaseResponse),
        (status = 403, description = "Case belongs to another lawyer", body = AppError),
        (status = 404, description = "Case not found", body = AppError)
    ),
    tag = "cases"
)]
#[tracing::instrument(skip_all, fields(id = %id))]
pub async fn update_case(
    State(engine): State<Arc<Engine>>,
    RoleRequired(actor): LawyerRequired,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<CaseResponse>, AppError> {
    let id = path_id(&id)?;
    let mut form = UploadForm::read(multipart, &case_fields()).await?;
    let data = form.data::<UpdateCaseRequest>()?;
    let case = engine
        .update_case(&actor, id, data, form.take_case_uploads())
        .await?;
    Ok(Json(engine.present_case(case).await?))
}

/// DELETE /api/cases/{id}
#[utoipa::path(
    delete,
    path = "/api/cases/{id}",
    params(("id" = String, Path, description = "Case id")),
    responses(
        (status = 204, description = "Case deleted"),
        (status = 403, description = "Case belongs to another lawyer", body = AppError),
        (status = 404, description = "Case not found", body = AppError)
    ),
    tag = "cases"
)]
#[tracing::instrument(skip_all, fields(id = %id))]
pub async fn delete_case(
    State(engine): State<Arc<Engine>>,
    RoleRequired(actor): LawyerRequired,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    engine.delete_case(&actor, path_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
