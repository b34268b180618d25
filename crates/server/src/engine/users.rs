use chrono::{DateTime, Utc};
use shared_types::{
    AppError, CreateUserRequest, Identity, PasswordResetTicket, SeedAdminConfig,
    UpdateUserRequest, User, UserRole, UserStatus,
};
use uuid::Uuid;

use super::validation::{check_user, trim, trim_patch, FieldErrors};
use super::Engine;
use crate::auth::jwt::hash_token;
use crate::auth::password::{hash_password, verify_password};
use crate::error_convert::ValidateRequest;
use crate::repo::{CaseFilter, PasswordReset};

const MIN_PASSWORD_CHARS: usize = 8;

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Password reset token handed out once. Only its digest is stored.
#[derive(Debug, Clone)]
pub struct ResetToken {
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl From<ResetToken> for PasswordResetTicket {
    fn from(reset: ResetToken) -> Self {
        Self {
            user_id: reset.user_id.to_string(),
            token: reset.token,
            expires_at: reset.expires_at.to_rfc3339(),
        }
    }
}

impl Engine {
    pub async fn create_user(&self, data: CreateUserRequest) -> Result<User, AppError> {
        let data = CreateUserRequest {
            full_name: trim(data.full_name),
            telephone: trim(data.telephone),
            email: normalize_email(&data.email),
            ..data
        };

        let mut errors = FieldErrors::new();
        errors.absorb(data.validate_request());
        let now = Utc::now();
        let mut user = User {
            id: Uuid::new_v4(),
            full_name: data.full_name,
            telephone: data.telephone,
            email: data.email,
            password_hash: String::new(),
            role: data.role,
            status: data.status.unwrap_or_default(),
            baro_registration_number: data.baro_registration_number,
            requests: vec![],
            cases: vec![],
            refresh_token_hash: None,
            created_at: now,
            updated_at: now,
        };
        check_user(&user, &mut errors);
        errors.finish()?;

        if self.store.find_user_by_email(&user.email).await?.is_some() {
            return Err(AppError::conflict("A user with this email already exists"));
        }
        user.password_hash = hash_password(&data.password)?;
        self.store.insert_user(&user).await?;

        tracing::info!(user_id = %user.id, role = user.role.as_str(), "User created");
        Ok(user)
    }

    /// Admins may change any account; other users only their own profile,
    /// without touching role or status.
    pub async fn update_user(
        &self,
        actor: &Identity,
        id: Uuid,
        data: UpdateUserRequest,
    ) -> Result<User, AppError> {
        if !actor.is_admin() {
            if actor.user_id != id {
                return Err(AppError::forbidden("You may only change your own account"));
            }
            if data.role.is_some() || data.status.is_some() {
                return Err(AppError::forbidden("Only administrators may change role or status"));
            }
        }

        let existing = self.get_user(id).await?;
        let data = UpdateUserRequest {
            full_name: trim_patch(data.full_name),
            telephone: trim_patch(data.telephone),
            email: data.email.as_deref().map(normalize_email),
            ..data
        };

        let mut errors = FieldErrors::new();
        errors.absorb(data.validate_request());
        let mut user = existing.clone();
        if let Some(full_name) = &data.full_name {
            user.full_name.clone_from(full_name);
        }
        if let Some(telephone) = &data.telephone {
            user.telephone.clone_from(telephone);
        }
        if let Some(email) = &data.email {
            user.email.clone_from(email);
        }
        if let Some(role) = data.role {
            user.role = role;
        }
        if let Some(status) = data.status {
            user.status = status;
        }
        if data.baro_registration_number.is_some() {
            user.baro_registration_number = data.baro_registration_number;
        }
        check_user(&user, &mut errors);
        errors.finish()?;

        if user.email != existing.email {
            if let Some(other) = self.store.find_user_by_email(&user.email).await? {
                if other.id != id {
                    return Err(AppError::conflict("A user with this email already exists"));
                }
            }
        }
        // References to the user were checked against the old role.
        if user.role != existing.role
            && (!existing.requests.is_empty() || !existing.cases.is_empty())
        {
            return Err(AppError::conflict(
                "Cannot change the role of a user with assigned requests or cases",
            ));
        }
        if let Some(password) = &data.password {
            user.password_hash = hash_password(password)?;
        }

        user.updated_at = Utc::now();
        if !self.store.update_user(&user).await? {
            return Err(AppError::not_found("User not found"));
        }
        tracing::info!(user_id = %id, "User updated");
        Ok(user)
    }

    /// Delete an account. Refused while the user is the lawyer of a case;
    /// otherwise every request naming the user is cleared first.
    pub async fn delete_user(&self, actor: &Identity, id: Uuid) -> Result<(), AppError> {
        if actor.user_id == id {
            return Err(AppError::conflict("You cannot delete your own account"));
        }
        self.get_user(id).await?;

        let cases = self
            .store
            .list_cases(CaseFilter {
                lawyer: Some(id),
                ..CaseFilter::default()
            })
            .await?;
        if !cases.is_empty() {
            return Err(AppError::conflict(format!(
                "User is still the lawyer of {} case(s)",
                cases.len()
            )));
        }

        let cleared = self.store.clear_user_from_requests(id).await?;
        self.store.delete_user(id).await?;
        tracing::info!(user_id = %id, cleared_requests = cleared, "User deleted");
        Ok(())
    }

    pub async fn get_user(&self, id: Uuid) -> Result<User, AppError> {
        self.store
            .find_user(id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))
    }

    pub async fn list_users(&self, role: Option<UserRole>) -> Result<Vec<User>, AppError> {
        self.store.list_users(role).await
    }

    /// Create the configured admin account unless the email is taken.
    /// Returns the new user, or `None` when one already exists.
    pub async fn ensure_seed_admin(
        &self,
        seed: &SeedAdminConfig,
        password: &str,
    ) -> Result<Option<User>, AppError> {
        if self
            .store
            .find_user_by_email(&normalize_email(&seed.email))
            .await?
            .is_some()
        {
            tracing::debug!(email = %seed.email, "Seed admin already present");
            return Ok(None);
        }
        let admin = self
            .create_user(CreateUserRequest {
                full_name: seed.full_name.clone(),
                telephone: seed.telephone.clone(),
                email: seed.email.clone(),
                password: password.to_string(),
                role: UserRole::Admin,
                status: Some(UserStatus::Active),
                baro_registration_number: None,
            })
            .await?;
        tracing::info!(user_id = %admin.id, "Seed admin created");
        Ok(Some(admin))
    }

    // ── Password reset ──────────────────────────────────────────────

    /// Issue a single-use reset token for an active account, replacing any
    /// earlier one.
    pub async fn request_password_reset(&self, email: &str) -> Result<ResetToken, AppError> {
        let user = self
            .store
            .find_user_by_email(&normalize_email(email))
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;
        if user.status != UserStatus::Active {
            return Err(AppError::forbidden("Account is inactive"));
        }

        let ttl = chrono::Duration::from_std(self.settings.password_reset_ttl)
            .map_err(|_| AppError::internal("Password reset lifetime is out of range"))?;
        let token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        let reset = PasswordReset {
            user_id: user.id,
            token_hash: hash_token(&token),
            expires_at: Utc::now() + ttl,
        };
        self.store.put_password_reset(&reset).await?;

        tracing::info!(user_id = %user.id, expires_at = %reset.expires_at, "Password reset issued");
        Ok(ResetToken {
            user_id: user.id,
            token,
            expires_at: reset.expires_at,
        })
    }

    /// Set a new password with a reset token. The token is consumed even
    /// when it turns out to be expired, and open sessions are revoked.
    pub async fn confirm_password_reset(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<User, AppError> {
        let invalid = || AppError::invalid_field("token", "Reset token is invalid or has expired");
        if new_password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AppError::invalid_field(
                "new_password",
                "Password must be at least 8 characters",
            ));
        }
        let token = token.trim();
        if token.is_empty() {
            return Err(invalid());
        }

        let reset = self
            .store
            .take_password_reset(&hash_token(token))
            .await?
            .ok_or_else(invalid)?;
        if reset.expires_at <= Utc::now() {
            tracing::info!(user_id = %reset.user_id, "Password reset rejected: token expired");
            return Err(invalid());
        }
        let mut user = self
            .store
            .find_user(reset.user_id)
            .await?
            .ok_or_else(invalid)?;

        user.password_hash = hash_password(new_password)?;
        user.updated_at = Utc::now();
        if !self.store.update_user(&user).await? {
            return Err(invalid());
        }
        self.store.set_refresh_token(user.id, None).await?;
        user.refresh_token_hash = None;

        tracing::info!(user_id = %user.id, "Password reset completed");
        Ok(user)
    }

    // ── Sessions ────────────────────────────────────────────────────

    /// Check credentials. Unknown emails and wrong passwords are
    /// indistinguishable to the caller.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AppError> {
        let invalid = || AppError::unauthorized("Invalid email or password");
        let user = self
            .store
            .find_user_by_email(&normalize_email(email))
            .await?
            .ok_or_else(invalid)?;
        if !verify_password(password, &user.password_hash) {
            tracing::info!(user_id = %user.id, "Login rejected: wrong password");
            return Err(invalid());
        }
        if user.status != UserStatus::Active {
            return Err(AppError::forbidden("Account is inactive"));
        }
        Ok(user)
    }

    /// Record (or with `None`, revoke) the user's single refresh token.
    pub async fn store_refresh_token(
        &self,
        user_id: Uuid,
        token_hash: Option<&str>,
    ) -> Result<(), AppError> {
        self.store.set_refresh_token(user_id, token_hash).await
    }

    /// Resolve the user presenting a refresh token, which must be the one
    /// currently on record.
    pub async fn user_for_refresh(&self, user_id: Uuid, token_hash: &str) -> Result<User, AppError> {
        let revoked = || AppError::unauthorized("Session has expired, please log in again");
        let user = self.store.find_user(user_id).await?.ok_or_else(revoked)?;
        if user.refresh_token_hash.as_deref() != Some(token_hash) {
            return Err(revoked());
        }
        if user.status != UserStatus::Active {
            return Err(AppError::forbidden("Account is inactive"));
        }
        Ok(user)
    }
}
