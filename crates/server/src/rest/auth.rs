use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use shared_types::{
    AppError, AuthResponse, LoginRequest, MessageResponse, PasswordResetConfirm,
    PasswordResetRequest, PasswordResetTicket, RefreshRequest, UserResponse,
};

use crate::auth::extractors::{AdminRequired, AuthRequired, RoleRequired};
use crate::auth::jwt::TokenAuthority;
use crate::auth::{cookies, end_session, refresh_session, start_session};
use crate::engine::Engine;
use crate::error_convert::ValidateRequest;

/// POST /api/auth/login
///
/// Returns both tokens in the body and sets them as HttpOnly cookies.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid email or password", body = AppError),
        (status = 403, description = "Account is inactive", body = AppError)
    ),
    tag = "auth"
)]
#[tracing::instrument(skip_all)]
pub async fn login(
    State(engine): State<Arc<Engine>>,
    State(tokens): State<Arc<TokenAuthority>>,
    Json(body): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<AuthResponse>), AppError> {
    let session = start_session(&engine, &tokens, &body.email, &body.password).await?;
    let mut headers = HeaderMap::new();
    session.set_cookies(&mut headers, &tokens);
    Ok((headers, Json(AuthResponse::from(session))))
}

/// POST /api/auth/refresh
///
/// Rotates the refresh token taken from the body, else from the cookie.
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    request_body(content = RefreshRequest, description = "Optional when the refresh cookie is sent"),
    responses(
        (status = 200, description = "Tokens rotated", body = AuthResponse),
        (status = 401, description = "Refresh token invalid, expired or revoked", body = AppError)
    ),
    tag = "auth"
)]
#[tracing::instrument(skip_all)]
pub async fn refresh(
    State(engine): State<Arc<Engine>>,
    State(tokens): State<Arc<TokenAuthority>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(HeaderMap, Json<AuthResponse>), AppError> {
    let from_body = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        serde_json::from_slice::<RefreshRequest>(&body)
            .map_err(|e| AppError::bad_request(format!("Invalid JSON: {e}")))?
            .refresh_token
            .filter(|t| !t.trim().is_empty())
    };
    let token = from_body
        .or_else(|| cookies::extract_refresh_token(&headers))
        .ok_or_else(|| AppError::unauthorized("Refresh token required"))?;

    let session = refresh_session(&engine, &tokens, &token).await?;
    let mut out = HeaderMap::new();
    session.set_cookies(&mut out, &tokens);
    Ok((out, Json(AuthResponse::from(session))))
}

/// POST /api/auth/logout
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Authentication required", body = AppError)
    ),
    tag = "auth"
)]
#[tracing::instrument(skip_all, fields(user_id = %actor.user_id))]
pub async fn logout(
    State(engine): State<Arc<Engine>>,
    State(tokens): State<Arc<TokenAuthority>>,
    AuthRequired(actor): AuthRequired,
) -> Result<(HeaderMap, Json<MessageResponse>), AppError> {
    end_session(&engine, &actor).await?;
    let mut headers = HeaderMap::new();
    cookies::clear_auth_cookies(&mut headers, tokens.cookie_secure());
    Ok((headers, Json(MessageResponse::new("Logged out"))))
}

/// GET /api/auth/me
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "The calling user", body = UserResponse),
        (status = 401, description = "Authentication required", body = AppError)
    ),
    tag = "auth"
)]
pub async fn me(
    State(engine): State<Arc<Engine>>,
    AuthRequired(actor): AuthRequired,
) -> Result<Json<UserResponse>, AppError> {
    Ok(Json(UserResponse::from(engine.get_user(actor.user_id).await?)))
}

/// POST /api/auth/password-reset/request
///
/// Issues a single-use reset token for the account. An administrator
/// relays it to the account holder.
#[utoipa::path(
    post,
    path = "/api/auth/password-reset/request",
    request_body = PasswordResetRequest,
    responses(
        (status = 200, description = "Reset token issued", body = PasswordResetTicket),
        (status = 403, description = "Admin role required, or account inactive", body = AppError),
        (status = 404, description = "No account with this email", body = AppError)
    ),
    tag = "auth"
)]
#[tracing::instrument(skip_all, fields(admin_id = %admin.user_id))]
pub async fn request_password_reset(
    State(engine): State<Arc<Engine>>,
    RoleRequired(admin): AdminRequired,
    Json(body): Json<PasswordResetRequest>,
) -> Result<Json<PasswordResetTicket>, AppError> {
    let reset = engine.request_password_reset(&body.email).await?;
    Ok(Json(PasswordResetTicket::from(reset)))
}

/// POST /api/auth/password-reset/confirm
///
/// Sets a new password with a reset token and signs the account out
/// everywhere.
#[utoipa::path(
    post,
    path = "/api/auth/password-reset/confirm",
    request_body = PasswordResetConfirm,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 422, description = "Token invalid or expired, or password too short", body = AppError)
    ),
    tag = "auth"
)]
#[tracing::instrument(skip_all)]
pub async fn confirm_password_reset(
    State(engine): State<Arc<Engine>>,
    Json(body): Json<PasswordResetConfirm>,
) -> Result<Json<MessageResponse>, AppError> {
    body.validate_request()?;
    engine
        .confirm_password_reset(&body.token, &body.new_password)
        .await?;
    Ok(Json(MessageResponse::new(
        "Password has been reset. Please log in with your new password.",
    )))
}
