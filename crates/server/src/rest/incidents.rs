use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use shared_types::{AppError, IncidentCategory, IncidentInput, IncidentResponse, UpdateIncidentRequest};

use super::path_id;
use super::upload::{UploadForm, INCIDENT_FILES_FIELD};
use crate::auth::extractors::AdminRequired;
use crate::engine::Engine;

/// POST /api/incidents
#[utoipa::path(
    post,
    path = "/api/incidents",
    request_body(content = IncidentInput, content_type = "multipart/form-data",
        description = "`data` JSON part plus `incidentFiles` file parts"),
    responses(
        (status = 201, description = "Incident created", body = IncidentResponse),
        (status = 415, description = "Unsupported file type", body = AppError),
        (status = 422, description = "Validation failed", body = AppError)
    ),
    tag = "incidents"
)]
#[tracing::instrument(skip_all)]
pub async fn create_incident(
    State(engine): State<Arc<Engine>>,
    _admin: AdminRequired,
    multipart: Multipart,
) -> Result<(StatusCode, Json<IncidentResponse>), AppError> {
    let mut form = UploadForm::read(multipart, &[INCIDENT_FILES_FIELD]).await?;
    let input = form.data::<IncidentInput>()?;
    let incident = engine
        .create_incident(input, form.take_files(INCIDENT_FILES_FIELD))
        .await?;
    Ok((StatusCode::CREATED, Json(engine.present_incident(incident).await)))
}

/// GET /api/incidents
#[utoipa::path(
    get,
    path = "/api/incidents",
    responses(
        (status = 200, description = "Incidents, newest first", body = Vec<IncidentResponse>)
    ),
    tag = "incidents"
)]
#[tracing::instrument(skip_all)]
pub async fn list_incidents(
    State(engine): State<Arc<Engine>>,
    _admin: AdminRequired,
) -> Result<Json<Vec<IncidentResponse>>, AppError> {
    let incidents = engine.list_incidents().await?;
    Ok(Json(engine.present_incidents(incidents).await))
}

/// GET /api/incidents/categories
///
/// Categories that at least one stored incident uses.
#[utoipa::path(
    get,
    path = "/api/incidents/categories",
    responses(
        (status = 200, description = "Distinct categories in use", body = Vec<IncidentCategory>)
    ),
    tag = "incidents"
)]
pub async fn list_categories(
    State(engine): State<Arc<Engine>>,
    _admin: AdminRequired,
) -> Result<Json<Vec<IncidentCategory>>, AppError> {
    Ok(Json(engine.incident_categories().await?))
}

/// GET /api/incidents/{id}
#[utoipa::path(
    get,
    path = "/api/incidents/{id}",
    params(("id" = String, Path, description = "Incident id")),
    responses(
        (status = 200, description = "Incident found", body = IncidentResponse),
        (status = 404, description = "Incident not found", body = AppError)
    ),
    tag = "incidents"
)]
#[tracing::instrument(skip_all, fields(id = %id))]
pub async fn get_incident(
    State(engine): State<Arc<Engine>>,
    _admin: AdminRequired,
    Path(id): Path<String>,
) -> Result<Json<IncidentResponse>, AppError> {
    let incident = engine.get_incident(path_id(&id)?).await?;
    Ok(Json(engine.present_incident(incident).await))
}

/// PATCH /api/incidents/{id}
#[utoipa::path(
    patch,
    path = "/api/incidents/{id}",
    params(("id" = String, Path, description = "Incident id")),
    request_body(content = UpdateIncidentRequest, content_type = "multipart/form-data",
        description = "`data` JSON part plus `incidentFiles` file parts"),
    responses(
        (status = 200, description = "Incident updated", body = IncidentResponse),
        (status = 404, description = "Incident not found", body = AppError),
        (status = 422, description = "Validation failed", body = AppError)
    ),
    tag = "incidents"
)]
#[tracing::instrument(skip_all, fields(id = %id))]
pub async fn update_incident(
    State(engine): State<Arc<Engine>>,
    _admin: AdminRequired,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<IncidentResponse>, AppError> {
    let id = path_id(&id)?;
    let mut form = UploadForm::read(multipart, &[INCIDENT_FILES_FIELD]).await?;
    let update = form.data::<UpdateIncidentRequest>()?;
    let incident = engine
        .update_incident(id, update, form.take_files(INCIDENT_FILES_FIELD))
        .await?;
    Ok(Json(engine.present_incident(incident).await))
}

/// DELETE /api/incidents/{id}
#[utoipa::path(
    delete,
    path = "/api/incidents/{id}",
    params(("id" = String, Path, description = "Incident id")),
    responses(
        (status = 204, description = "Incident deleted"),
        (status = 404, description = "Incident not found", body = AppError)
    ),
    tag = "incidents"
)]
#[tracing::instrument(skip_all, fields(id = %id))]
pub async fn delete_incident(
    State(engine): State<Arc<Engine>>,
    _admin: AdminRequired,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    engine.delete_incident(path_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
