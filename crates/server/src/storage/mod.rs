pub mod memory;
pub mod s3;

pub use memory::MemoryObjectStore;
pub use s3::S3ObjectStore;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Failures raised by object store adapters. Never shown to callers; the
/// engine maps them to `StorageWrite` / `StorageDelete` with a generic message.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object store request failed: {0}")]
    Backend(String),
    #[error("presign configuration invalid: {0}")]
    Presign(String),
    #[error("object store misconfigured: {0}")]
    Config(String),
}

// ── Trait ────────────────────────────────────────────────────────────

/// Durable blob storage for attached documents.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Base URL every stored object URL starts with.
    fn base_url(&self) -> &str;

    /// Upload bytes under `key` and return the permanent URL.
    async fn put(&self, key: &str, content_type: &str, body: Vec<u8>)
        -> Result<String, StorageError>;

    /// Delete an object. Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Time-limited GET URL for `key`.
    async fn presign(&self, key: &str, ttl: Duration) -> Result<String, StorageError>;

    /// Every key in the bucket.
    async fn list(&self) -> Result<Vec<String>, StorageError>;

    fn url_for(&self, key: &str) -> String {
        object_url(self.base_url(), key)
    }

    /// Key of a URL previously returned by `put`, or `None` for foreign URLs.
    fn key_for(&self, url: &str) -> Option<String> {
        key_from_url(self.base_url(), url)
    }
}

// ── Location helpers ────────────────────────────────────────────────

/// Permanent URL of `key` under `base_url`, each path segment percent-encoded.
pub fn object_url(base_url: &str, key: &str) -> String {
    let encoded: Vec<String> = key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!("{}/{}", base_url.trim_end_matches('/'), encoded.join("/"))
}

/// Inverse of [`object_url`]. Query strings are ignored so presigned URLs
/// handed back by clients resolve to the same key.
pub fn key_from_url(base_url: &str, url: &str) -> Option<String> {
    let path = url.trim().split(['?', '#']).next()?;
    let prefix = format!("{}/", base_url.trim_end_matches('/'));
    let rest = path.strip_prefix(&prefix)?;
    if rest.is_empty() {
        return None;
    }
    urlencoding::decode(rest).ok().map(|key| key.into_owned())
}

/// Key addressed by a removal instruction, which may be a stored URL or a
/// bare key. Foreign URLs and blank input address nothing.
pub fn key_from_location(base_url: &str, location: &str) -> Option<String> {
    let trimmed = location.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.contains("://") {
        key_from_url(base_url, trimmed)
    } else {
        let key = trimmed.trim_start_matches('/');
        (!key.is_empty()).then(|| key.to_string())
    }
}

/// Read an env var, trying the primary name first then a fallback.
pub fn env_or(primary: &str, fallback: &str) -> Option<String> {
    std::env::var(primary)
        .ok()
        .or_else(|| std::env::var(fallback).ok())
}
