//! Entity relationship and document lifecycle engine.
//!
//! Every mutation enters a workflow (`requests`, `incidents`, `cases`,
//! `users`), which validates foreign keys through [`references`], reconciles
//! file-bearing fields through [`attachments`], and only then writes to the
//! [`DocumentStore`]. Follow-up writes on other documents go through
//! [`retry`]. Reads are decorated by [`presign`].

pub mod attachments;
pub mod cases;
pub mod incidents;
pub mod presign;
pub mod references;
pub mod requests;
pub mod retry;
pub mod sweep;
#[cfg(test)]
pub(crate) mod testing;
pub mod users;
pub mod validation;

use std::sync::Arc;
use std::time::Duration;

use shared_types::AppConfig;

use crate::repo::DocumentStore;
use crate::storage::ObjectStore;

pub use attachments::{FileUpload, Folder};
pub use cases::CaseUploads;
pub use references::ReferenceKind;
pub use requests::{AidRequestChanges, NewAidRequest};
pub use users::ResetToken;
pub use retry::RetryPolicy;

/// Tunables derived from the `storage` and `uploads` config sections.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub presign_ttl: Duration,
    pub storage_timeout: Duration,
    pub max_file_bytes: usize,
    pub allowed_content_types: Vec<String>,
    pub retry: RetryPolicy,
    pub sweep_grace: Duration,
    pub password_reset_ttl: Duration,
}

impl EngineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            presign_ttl: Duration::from_secs(config.storage.presign_ttl_secs),
            storage_timeout: Duration::from_secs(config.storage.operation_timeout_secs),
            max_file_bytes: config.uploads.max_file_bytes,
            allowed_content_types: config
                .uploads
                .allowed_content_types
                .iter()
                .map(|t| t.trim().to_lowercase())
                .collect(),
            retry: RetryPolicy {
                max_attempts: config.storage.retry_attempts,
                base_delay: Duration::from_millis(config.storage.retry_base_delay_ms),
            },
            sweep_grace: Duration::from_secs(config.storage.sweep_grace_secs),
            password_reset_ttl: Duration::from_secs(
                config.auth.password_reset_minutes.max(1).unsigned_abs() * 60,
            ),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Owns the persistent store and the object store and exposes every
/// operation on requests, incidents, cases and users.
pub struct Engine {
    store: Arc<dyn DocumentStore>,
    objects: Arc<dyn ObjectStore>,
    settings: EngineSettings,
}

impl Engine {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        objects: Arc<dyn ObjectStore>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            objects,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn objects(&self) -> &Arc<dyn ObjectStore> {
        &self.objects
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }
}
