use serde::{Deserialize, Serialize};

/// Bucket listing returned to admins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StoredObjectList {
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PresignedUrlResponse {
    pub key: String,
    pub url: String,
    pub expires_in_secs: u64,
}

/// Outcome of an orphaned-object sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SweepReport {
    pub dry_run: bool,
    /// Keys present in the bucket.
    pub scanned: usize,
    /// Keys still referenced by a request, incident or case.
    pub referenced: usize,
    /// Unreferenced keys younger than the grace period, left in place.
    pub skipped_recent: usize,
    pub orphaned: Vec<String>,
    pub deleted: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
