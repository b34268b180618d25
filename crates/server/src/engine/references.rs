use shared_types::{AppError, UserRole};
use uuid::Uuid;

use super::Engine;

/// Kind of document a foreign key must point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// A user, optionally required to hold exactly this role.
    User(Option<UserRole>),
    Request,
    Incident,
    Case,
}

/// Parse an entity id supplied for `field`.
pub fn parse_id(raw: &str, field: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::malformed_id(field))
}

impl Engine {
    /// Check that `raw`, when present, names an existing document of `kind`.
    ///
    /// Absent and blank references pass as `None`. Failures are
    /// `MalformedId`, `DanglingReference` or `RoleMismatch`, in that order.
    pub async fn validate_reference(
        &self,
        raw: Option<&str>,
        kind: ReferenceKind,
        field: &str,
    ) -> Result<Option<Uuid>, AppError> {
        let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
            return Ok(None);
        };
        let id = parse_id(raw, field)?;
        self.validate_reference_id(id, kind, field).await?;
        Ok(Some(id))
    }

    /// Same as [`Engine::validate_reference`] for an already parsed id.
    pub async fn validate_reference_id(
        &self,
        id: Uuid,
        kind: ReferenceKind,
        field: &str,
    ) -> Result<(), AppError> {
        match kind {
            ReferenceKind::User(role) => {
                let user = self
                    .store
                    .find_user(id)
                    .await?
                    .ok_or_else(|| AppError::dangling_reference(field))?;
                if let Some(role) = role {
                    if user.role != role {
                        return Err(AppError::role_mismatch(field, role.as_str()));
                    }
                }
            }
            ReferenceKind::Request => {
                self.store
                    .find_request(id)
                    .await?
                    .ok_or_else(|| AppError::dangling_reference(field))?;
            }
            ReferenceKind::Incident => {
                self.store
                    .find_incident(id)
                    .await?
                    .ok_or_else(|| AppError::dangling_reference(field))?;
            }
            ReferenceKind::Case => {
                self.store
                    .find_case(id)
                    .await?
                    .ok_or_else(|| AppError::dangling_reference(field))?;
            }
        }
        Ok(())
    }
}
