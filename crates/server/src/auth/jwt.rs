use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shared_types::{AppError, AuthConfig, Identity, User, UserRole};
use thiserror::Error;
use uuid::Uuid;

/// Token type discriminator. A refresh token is never accepted as an access
/// token and vice versa.
const TOKEN_TYPE_ACCESS: &str = "access";
const TOKEN_TYPE_REFRESH: &str = "refresh";

/// Minimum length accepted for `JWT_SECRET`.
const MIN_SECRET_LEN: usize = 16;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: UserRole,
    pub exp: i64,
    pub iat: i64,
    /// Distinguishes tokens issued to the same user within one second.
    pub jti: String,
    pub typ: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("token invalid")]
    Invalid,
    #[error("token could not be signed: {0}")]
    Signing(String),
    #[error("JWT_SECRET must be set to at least {MIN_SECRET_LEN} characters")]
    MissingSecret,
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AppError::unauthorized("Session expired"),
            TokenError::Invalid => AppError::unauthorized("Invalid token"),
            TokenError::Signing(_) | TokenError::MissingSecret => {
                tracing::error!(error = %err, "Token issuance failed");
                AppError::internal("Could not issue token")
            }
        }
    }
}

/// SHA-256 hex digest of a raw token. Only this digest is persisted; the
/// raw refresh token lives in the client cookie.
pub fn hash_token(raw_token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Signs and verifies access and refresh tokens with one HMAC secret.
pub struct TokenAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    cookie_secure: bool,
}

impl TokenAuthority {
    pub fn new(secret: &str, config: &AuthConfig) -> Result<Self, TokenError> {
        if secret.trim().len() < MIN_SECRET_LEN {
            return Err(TokenError::MissingSecret);
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl: Duration::minutes(config.access_token_minutes.max(1)),
            refresh_ttl: Duration::days(config.refresh_token_days.max(1)),
            cookie_secure: config.cookie_secure,
        })
    }

    /// Build from `JWT_SECRET`.
    pub fn from_env(config: &AuthConfig) -> Result<Self, TokenError> {
        let secret = std::env::var("JWT_SECRET").map_err(|_| TokenError::MissingSecret)?;
        Self::new(&secret, config)
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }

    pub fn issue_access(&self, user: &User) -> Result<String, TokenError> {
        self.issue(user, TOKEN_TYPE_ACCESS, self.access_ttl)
    }

    pub fn issue_refresh(&self, user: &User) -> Result<String, TokenError> {
        self.issue(user, TOKEN_TYPE_REFRESH, self.refresh_ttl)
    }

    fn issue(&self, user: &User, typ: &str, ttl: Duration) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
            typ: typ.to_string(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    fn decode(&self, token: &str, typ: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default()).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            },
        )?;
        if data.claims.typ != typ {
            return Err(TokenError::Invalid);
        }
        Ok(data.claims)
    }

    /// Identity carried by a valid access token.
    pub fn verify_access(&self, token: &str) -> Result<Identity, TokenError> {
        let claims = self.decode(token, TOKEN_TYPE_ACCESS)?;
        Ok(Identity {
            user_id: claims.sub,
            role: claims.role,
        })
    }

    /// User id carried by a valid refresh token. The caller still has to
    /// match the token hash against the one stored on the user.
    pub fn verify_refresh(&self, token: &str) -> Result<Uuid, TokenError> {
        Ok(self.decode(token, TOKEN_TYPE_REFRESH)?.sub)
    }
}
