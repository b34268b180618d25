use axum::{extract::FromRequestParts, http::request::Parts};
use shared_types::{AppError, Identity, UserRole};

/// Requires a caller identity. 401 if the auth middleware resolved none.
pub struct AuthRequired(pub Identity);

impl<S: Send + Sync> FromRequestParts<S> for AuthRequired {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .copied()
            .map(AuthRequired)
            .ok_or_else(|| AppError::unauthorized("Authentication required"))
    }
}

/// Caller identity when present. Used by the public intake endpoint, where
/// staff may submit on behalf of an applicant.
pub struct MaybeAuth(pub Option<Identity>);

impl<S: Send + Sync> FromRequestParts<S> for MaybeAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuth(parts.extensions.get::<Identity>().copied()))
    }
}

pub const LAWYER: u8 = 1;
pub const ADMIN: u8 = 2;

/// Requires an identity whose role satisfies `ROLE` (admin satisfies all).
/// 401 when unauthenticated, 403 when the role is insufficient.
pub struct RoleRequired<const ROLE: u8>(pub Identity);

pub type LawyerRequired = RoleRequired<LAWYER>;
pub type AdminRequired = RoleRequired<ADMIN>;

impl<const ROLE: u8, S: Send + Sync> FromRequestParts<S> for RoleRequired<ROLE> {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthRequired(identity) = AuthRequired::from_request_parts(parts, state).await?;
        let required = match ROLE {
            LAWYER => UserRole::Lawyer,
            _ => UserRole::Admin,
        };
        if !identity.role.satisfies(&required) {
            return Err(AppError::forbidden(format!("{} role required", required.as_str())));
        }
        Ok(RoleRequired(identity))
    }
}
