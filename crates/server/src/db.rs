use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;
use shared_types::{AppConfig, DatabaseBackend, DatabaseConfig, StorageBackend};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use thiserror::Error;

use crate::auth::jwt::{TokenAuthority, TokenError};
use crate::engine::{Engine, EngineSettings};
use crate::repo::{DocumentStore, MemoryStore, PgStore};
use crate::storage::{MemoryObjectStore, ObjectStore, S3ObjectStore, StorageError};

/// Failures that stop the server from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("object storage: {0}")]
    Storage(#[from] StorageError),
    #[error("auth: {0}")]
    Token(#[from] TokenError),
}

/// Shared application state passed to Axum handlers via `State`.
/// Derives `FromRef` so handlers can extract `State<Arc<Engine>>` directly.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub tokens: Arc<TokenAuthority>,
}

impl AppState {
    pub fn new(engine: Engine, tokens: TokenAuthority) -> Self {
        Self {
            engine: Arc::new(engine),
            tokens: Arc::new(tokens),
        }
    }
}

/// Base URL of the in-memory object store when `storage.backend = "memory"`.
const MEMORY_OBJECT_BASE: &str = "http://localhost/objects";

/// Create a Postgres pool from `DATABASE_URL`. No connections open until the
/// first query.
pub fn create_pool(config: &DatabaseConfig) -> Result<Pool<Postgres>, sqlx::Error> {
    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| sqlx::Error::Configuration("DATABASE_URL must be set".into()))?;

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect_lazy(&database_url)
}

pub async fn run_migrations(pool: &Pool<Postgres>) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}

/// Build the configured store, running migrations for Postgres.
pub async fn build_store(config: &AppConfig) -> Result<Arc<dyn DocumentStore>, StartupError> {
    match config.database.backend {
        DatabaseBackend::Memory => {
            tracing::warn!("Using in-memory document store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        DatabaseBackend::Postgres => {
            let pool = create_pool(&config.database)?;
            run_migrations(&pool).await?;
            tracing::info!("Database migrations applied");
            Ok(Arc::new(PgStore::new(pool)))
        }
    }
}

/// Build the configured object store, creating the bucket for S3.
pub async fn build_object_store(config: &AppConfig) -> Result<Arc<dyn ObjectStore>, StartupError> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory object store; uploads are lost on restart");
            let base = config
                .storage
                .public_base_url
                .clone()
                .unwrap_or_else(|| MEMORY_OBJECT_BASE.to_string());
            Ok(Arc::new(MemoryObjectStore::new(base)))
        }
        StorageBackend::S3 => {
            let store = S3ObjectStore::from_env(&config.storage)?;
            store.ensure_bucket().await;
            Ok(Arc::new(store))
        }
    }
}

/// Assemble the state served by the router.
pub async fn build_state(config: &AppConfig) -> Result<AppState, StartupError> {
    let store = build_store(config).await?;
    let objects = build_object_store(config).await?;
    let tokens = TokenAuthority::from_env(&config.auth)?;
    let engine = Engine::new(store, objects, EngineSettings::from_config(config));
    Ok(AppState::new(engine, tokens))
}
