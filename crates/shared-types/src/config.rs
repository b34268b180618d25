use serde::{Deserialize, Serialize};

/// Top-level config file structure matching `config.toml`.
///
/// Every section and field is defaulted so that a missing or partial file
/// yields a runnable local configuration. Secrets never live here; they are
/// read from the environment.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub uploads: UploadConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub seed_admin: Option<SeedAdminConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: DatabaseBackend::Postgres,
            max_connections: 10,
            acquire_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    S3,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Public base URL under which stored objects are addressed. When unset,
    /// `{endpoint}/{bucket}` is used.
    pub public_base_url: Option<String>,
    pub presign_ttl_secs: u64,
    pub operation_timeout_secs: u64,
    pub retry_attempts: u32,
    pub retry_base_delay_ms: u64,
    /// Objects younger than this are never collected by the orphan sweep.
    pub sweep_grace_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::S3,
            public_base_url: None,
            presign_ttl_secs: 3600,
            operation_timeout_secs: 30,
            retry_attempts: 5,
            retry_base_delay_ms: 100,
            sweep_grace_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UploadConfig {
    pub max_file_bytes: usize,
    pub max_body_bytes: usize,
    pub allowed_content_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: 10 * 1024 * 1024,
            max_body_bytes: 50 * 1024 * 1024,
            allowed_content_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "application/pdf".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuthConfig {
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
    pub cookie_secure: bool,
    /// Lifetime of a password reset token.
    pub password_reset_minutes: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token_minutes: 15,
            refresh_token_days: 7,
            cookie_secure: false,
            password_reset_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Account created at startup through the regular user path when no user
/// with `email` exists yet. The password comes from `SEED_ADMIN_PASSWORD`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeedAdminConfig {
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub telephone: String,
}
