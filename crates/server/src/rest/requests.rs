use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared_types::{
    AidRequestResponse, AppError, CreateAidRequest, RequestStatus, SetStatusRequest,
    UpdateAidRequest,
};
use uuid::Uuid;

use super::path_id;
use super::upload::{UploadForm, INCIDENT_FILES_FIELD, SUBMISSIONS_FIELD};
use crate::auth::extractors::{AdminRequired, MaybeAuth};
use crate::engine::{AidRequestChanges, Engine, NewAidRequest};
use crate::repo::RequestFilter;

const REQUEST_FILE_FIELDS: [&str; 2] = [SUBMISSIONS_FIELD, INCIDENT_FILES_FIELD];

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RequestListParams {
    /// pending, approved or rejected
    pub status: Option<String>,
    pub assigned_lawyer: Option<String>,
}

impl RequestListParams {
    fn into_filter(self) -> Result<RequestFilter, AppError> {
        let status = match self.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(RequestStatus::parse(raw).ok_or_else(|| {
                AppError::invalid_status(format!("'{raw}' is not a valid status"))
            })?),
            None => None,
        };
        let assigned_lawyer = match self
            .assigned_lawyer
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(raw) => Some(
                Uuid::parse_str(raw).map_err(|_| AppError::malformed_id("assigned_lawyer"))?,
            ),
            None => None,
        };
        Ok(RequestFilter {
            assigned_lawyer,
            status,
        })
    }
}

/// POST /api/requests
///
/// Public intake form. Staff fields are only honored for administrators.
#[utoipa::path(
    post,
    path = "/api/requests",
    request_body(content = CreateAidRequest, content_type = "multipart/form-data",
        description = "`data` JSON part plus `submissions` and `incidentFiles` file parts"),
    responses(
        (status = 201, description = "Request created", body = AidRequestResponse),
        (status = 403, description = "Staff fields supplied without admin rights", body = AppError),
        (status = 415, description = "Unsupported file type", body = AppError),
        (status = 422, description = "Validation failed", body = AppError),
        (status = 502, description = "Storage failure", body = AppError)
    ),
    tag = "requests"
)]
#[tracing::instrument(skip_all)]
pub async fn create_request(
    State(engine): State<Arc<Engine>>,
    MaybeAuth(actor): MaybeAuth,
    multipart: Multipart,
) -> Result<(StatusCode, Json<AidRequestResponse>), AppError> {
    let mut form = UploadForm::read(multipart, &REQUEST_FILE_FIELDS).await?;
    let intake = NewAidRequest {
        data: form.data::<CreateAidRequest>()?,
        submissions: form.take_files(SUBMISSIONS_FIELD),
        incident_files: form.take_files(INCIDENT_FILES_FIELD),
    };
    let request = engine.create_request(actor.as_ref(), intake).await?;
    Ok((StatusCode::CREATED, Json(engine.present_request(request).await?)))
}

/// GET /api/requests
#[utoipa::path(
    get,
    path = "/api/requests",
    params(RequestListParams),
    responses(
        (status = 200, description = "Requests, newest first", body = Vec<AidRequestResponse>),
        (status = 403, description = "Admin role required", body = AppError)
    ),
    tag = "requests"
)]
#[tracing::instrument(skip_all)]
pub async fn list_requests(
    State(engine): State<Arc<Engine>>,
    _admin: AdminRequired,
    Query(params): Query<RequestListParams>,
) -> Result<Json<Vec<AidRequestResponse>>, AppError> {
    let requests = engine.list_requests(params.into_filter()?).await?;
    Ok(Json(engine.present_requests(requests).await?))
}

/// GET /api/requests/{id}
#[utoipa::path(
    get,
    path = "/api/requests/{id}",
    params(("id" = String, Path, description = "Request id")),
    responses(
        (status = 200, description = "Request found", body = AidRequestResponse),
        (status = 404, description = "Request not found", body = AppError)
    ),
    tag = "requests"
)]
#[tracing::instrument(skip_all, fields(id = %id))]
pub async fn get_request(
    State(engine): State<Arc<Engine>>,
    _admin: AdminRequired,
    Path(id): Path<String>,
) -> Result<Json<AidRequestResponse>, AppError> {
    let request = engine.get_request(path_id(&id)?).await?;
    Ok(Json(engine.present_request(request).await?))
}

/// PATCH /api/requests/{id}
#[utoipa::path(
    patch,
    path = "/api/requests/{id}",
    params(("id" = String, Path, description = "Request id")),
    request_body(content = UpdateAidRequest, content_type = "multipart/form-data",
        description = "`data` JSON part plus `submissions` and `incidentFiles` file parts"),
    responses(
        (status = 200, description = "Request updated", body = AidRequestResponse),
        (status = 404, description = "Request not found", body = AppError),
        (status = 422, description = "Validation failed", body = AppError)
    ),
    tag = "requests"
)]
#[tracing::instrument(skip_all, fields(id = %id))]
pub async fn update_request(
    State(engine): State<Arc<Engine>>,
    _admin: AdminRequired,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<AidRequestResponse>, AppError> {
    let id = path_id(&id)?;
    let mut form = UploadForm::read(multipart, &REQUEST_FILE_FIELDS).await?;
    let changes = AidRequestChanges {
        data: form.data::<UpdateAidRequest>()?,
        submissions: form.take_files(SUBMISSIONS_FIELD),
        incident_files: form.take_files(INCIDENT_FILES_FIELD),
    };
    let request = engine.update_request(id, changes).await?;
    Ok(Json(engine.present_request(request).await?))
}

/// DELETE /api/requests/{id}
#[utoipa::path(
    delete,
    path = "/api/requests/{id}",
    params(("id" = String, Path, description = "Request id")),
    responses(
        (status = 204, description = "Request deleted"),
        (status = 404, description = "Request not found", body = AppError),
        (status = 409, description = "Request still has cases", body = AppError)
    ),
    tag = "requests"
)]
#[tracing::instrument(skip_all, fields(id = %id))]
pub async fn delete_request(
    State(engine): State<Arc<Engine>>,
    _admin: AdminRequired,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    engine.delete_request(path_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /api/requests/{id}/status
#[utoipa::path(
    patch,
    path = "/api/requests/{id}/status",
    params(("id" = String, Path, description = "Request id")),
    request_body = SetStatusRequest,
    responses(
        (status = 200, description = "Status set", body = AidRequestResponse),
        (status = 400, description = "Unknown status or transition not allowed", body = AppError),
        (status = 404, description = "Request not found", body = AppError)
    ),
    tag = "requests"
)]
#[tracing::instrument(skip_all, fields(id = %id))]
pub async fn set_request_status(
    State(engine): State<Arc<Engine>>,
    _admin: AdminRequired,
    Path(id): Path<String>,
    Json(body): Json<SetStatusRequest>,
) -> Result<Json<AidRequestResponse>, AppError> {
    let request = engine.set_request_status(path_id(&id)?, &body.status).await?;
    Ok(Json(engine.present_request(request).await?))
}
