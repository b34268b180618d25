//! Bucket maintenance for administrators.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use shared_types::{AppError, PresignedUrlResponse, StoredObjectList, SweepReport};

use crate::auth::extractors::AdminRequired;
use crate::engine::Engine;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PresignParams {
    /// Object key, e.g. `requests/1718000000000_ab12cd34_scan.pdf`
    pub key: String,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SweepParams {
    /// Report without deleting. Defaults to true.
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,
}

fn default_dry_run() -> bool {
    true
}

/// GET /api/files
#[utoipa::path(
    get,
    path = "/api/files",
    responses(
        (status = 200, description = "Every key in the bucket", body = StoredObjectList),
        (status = 403, description = "Admin role required", body = AppError)
    ),
    tag = "files"
)]
#[tracing::instrument(skip_all)]
pub async fn list_files(
    State(engine): State<Arc<Engine>>,
    _admin: AdminRequired,
) -> Result<Json<StoredObjectList>, AppError> {
    let keys = engine.list_stored_objects().await?;
    Ok(Json(StoredObjectList { keys }))
}

/// GET /api/files/presign
#[utoipa::path(
    get,
    path = "/api/files/presign",
    params(PresignParams),
    responses(
        (status = 200, description = "Time-limited download URL", body = PresignedUrlResponse),
        (status = 422, description = "Key missing", body = AppError)
    ),
    tag = "files"
)]
#[tracing::instrument(skip_all, fields(key = %params.key))]
pub async fn presign_file(
    State(engine): State<Arc<Engine>>,
    _admin: AdminRequired,
    Query(params): Query<PresignParams>,
) -> Result<Json<PresignedUrlResponse>, AppError> {
    Ok(Json(engine.presign_object(&params.key).await?))
}

/// POST /api/files/sweep
///
/// Find objects no request, incident or case references. Deletes them
/// only with `dry_run=false`.
#[utoipa::path(
    post,
    path = "/api/files/sweep",
    params(SweepParams),
    responses(
        (status = 200, description = "Sweep report", body = SweepReport),
        (status = 403, description = "Admin role required", body = AppError)
    ),
    tag = "files"
)]
#[tracing::instrument(skip_all, fields(dry_run = params.dry_run))]
pub async fn sweep_orphans(
    State(engine): State<Arc<Engine>>,
    _admin: AdminRequired,
    Query(params): Query<SweepParams>,
) -> Result<Json<SweepReport>, AppError> {
    Ok(Json(engine.sweep_orphans(params.dry_run).await?))
}
