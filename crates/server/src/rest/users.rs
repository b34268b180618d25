use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared_types::{AppError, CreateUserRequest, UpdateUserRequest, UserResponse, UserRole};

use super::path_id;
use crate::auth::extractors::{AdminRequired, AuthRequired, RoleRequired};
use crate::engine::Engine;

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserListParams {
    /// admin or lawyer
    pub role: Option<String>,
}

/// GET /api/users
#[utoipa::path(
    get,
    path = "/api/users",
    params(UserListParams),
    responses(
        (status = 200, description = "Users, newest first", body = Vec<UserResponse>),
        (status = 400, description = "Unknown role", body = AppError),
        (status = 403, description = "Admin role required", body = AppError)
    ),
    tag = "users"
)]
#[tracing::instrument(skip_all)]
pub async fn list_users(
    State(engine): State<Arc<Engine>>,
    _admin: AdminRequired,
    Query(params): Query<UserListParams>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let role = match params.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        Some(raw) => Some(
            UserRole::parse(raw)
                .ok_or_else(|| AppError::bad_request(format!("'{raw}' is not a valid role")))?,
        ),
        None => None,
    };
    let users = engine.list_users(role).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// POST /api/users
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 409, description = "Email already registered", body = AppError),
        (status = 422, description = "Validation failed", body = AppError)
    ),
    tag = "users"
)]
#[tracing::instrument(skip_all, fields(email = %body.email))]
pub async fn create_user(
    State(engine): State<Arc<Engine>>,
    _admin: AdminRequired,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let user = engine.create_user(body).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// GET /api/users/{id}
///
/// Admins may read any user; everyone else only themselves.
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 403, description = "Not allowed", body = AppError),
        (status = 404, description = "User not found", body = AppError)
    ),
    tag = "users"
)]
#[tracing::instrument(skip_all, fields(id = %id))]
pub async fn get_user(
    State(engine): State<Arc<Engine>>,
    AuthRequired(actor): AuthRequired,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let id = path_id(&id)?;
    if !actor.is_admin() && actor.user_id != id {
        return Err(AppError::forbidden("You may only view your own account"));
    }
    Ok(Json(UserResponse::from(engine.get_user(id).await?)))
}

/// PATCH /api/users/{id}
#[utoipa::path(
    patch,
    path = "/api/users/{id}",
    params(("id" = String, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 403, description = "Not allowed", body = AppError),
        (status = 409, description = "Email taken or role change blocked", body = AppError)
    ),
    tag = "users"
)]
#[tracing::instrument(skip_all, fields(id = %id))]
pub async fn update_user(
    State(engine): State<Arc<Engine>>,
    AuthRequired(actor): AuthRequired,
    Path(id): Path<String>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = engine.update_user(&actor, path_id(&id)?, body).await?;
    Ok(Json(UserResponse::from(user)))
}

/// DELETE /api/users/{id}
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "User not found", body = AppError),
        (status = 409, description = "User still owns cases", body = AppError)
    ),
    tag = "users"
)]
#[tracing::instrument(skip_all, fields(id = %id))]
pub async fn delete_user(
    State(engine): State<Arc<Engine>>,
    RoleRequired(actor): AdminRequired,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    engine.delete_user(&actor, path_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
