//! Login sessions: argon2 password checks, JWT access/refresh tokens and
//! the middleware and extractors that resolve the caller identity.

pub mod cookies;
pub mod extractors;
pub mod jwt;
pub mod middleware;
pub mod password;

use axum::http::HeaderMap;
use shared_types::{AppError, AuthResponse, User, UserResponse};

use crate::engine::Engine;
use jwt::{hash_token, TokenAuthority};

/// Tokens issued for one user. Only the refresh token's hash is stored.
pub struct Session {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

impl Session {
    /// Write both tokens as HttpOnly cookies.
    pub fn set_cookies(&self, headers: &mut HeaderMap, tokens: &TokenAuthority) {
        cookies::set_auth_cookies(
            headers,
            &self.access_token,
            tokens.access_ttl().num_seconds(),
            &self.refresh_token,
            tokens.refresh_ttl().num_seconds(),
            tokens.cookie_secure(),
        );
    }
}

impl From<Session> for AuthResponse {
    fn from(session: Session) -> Self {
        Self {
            access_token: session.access_token,
            refresh_token: session.refresh_token,
            user: UserResponse::from(session.user),
        }
    }
}

async fn issue_session(engine: &Engine, tokens: &TokenAuthority, user: User) -> Result<Session, AppError> {
    let access_token = tokens.issue_access(&user)?;
    let refresh_token = tokens.issue_refresh(&user)?;
    engine
        .store_refresh_token(user.id, Some(&hash_token(&refresh_token)))
        .await?;
    Ok(Session {
        user,
        access_token,
        refresh_token,
    })
}

/// Check credentials and open a session, replacing any previous refresh token.
pub async fn start_session(
    engine: &Engine,
    tokens: &TokenAuthority,
    email: &str,
    password: &str,
) -> Result<Session, AppError> {
    let user = engine.authenticate(email, password).await?;
    tracing::info!(user_id = %user.id, role = user.role.as_str(), "User logged in");
    issue_session(engine, tokens, user).await
}

/// Rotate a refresh token. The presented token must be the one currently
/// stored for its user; a replayed older token is refused.
pub async fn refresh_session(
    engine: &Engine,
    tokens: &TokenAuthority,
    refresh_token: &str,
) -> Result<Session, AppError> {
    let user_id = tokens.verify_refresh(refresh_token)?;
    let user = engine.user_for_refresh(user_id, &hash_token(refresh_token)).await?;
    issue_session(engine, tokens, user).await
}

/// Revoke the user's refresh token.
pub async fn end_session(engine: &Engine, user: &shared_types::Identity) -> Result<(), AppError> {
    engine.store_refresh_token(user.user_id, None).await?;
    tracing::info!(user_id = %user.user_id, "User logged out");
    Ok(())
}
