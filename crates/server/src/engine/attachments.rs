use std::collections::HashSet;

use chrono::Utc;
use futures::future::{join_all, try_join_all};
use shared_types::{AppError, AppErrorKind, CaseFolder, Submission, DEFAULT_SUBMISSION_DESCRIPTION};
use uuid::Uuid;

use super::Engine;
use crate::storage::key_from_location;

/// A file received from a client and not yet stored.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    /// Only used for request submissions.
    pub description: Option<String>,
}

impl FileUpload {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
            description: None,
        }
    }
}

/// Logical storage folder an attachment list lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Folder {
    Requests,
    Incidents,
    Case(CaseFolder),
}

impl Folder {
    pub fn prefix(&self) -> &'static str {
        match self {
            Folder::Requests => "requests",
            Folder::Incidents => "incidents",
            Folder::Case(CaseFolder::HearingReports) => "cases/hearingReports",
            Folder::Case(CaseFolder::Petitions) => "cases/petitions",
            Folder::Case(CaseFolder::HearingMinutes) => "cases/hearingMinutes",
        }
    }
}

/// An element of an attachment list: something that carries the stored
/// location of one object.
pub trait AttachedDocument: Send + Sized {
    fn location(&self) -> &str;

    /// Build the list element for a freshly stored upload.
    fn stored(url: String, description: Option<String>) -> Self;
}

impl AttachedDocument for String {
    fn location(&self) -> &str {
        self
    }

    fn stored(url: String, _description: Option<String>) -> Self {
        url
    }
}

impl AttachedDocument for Submission {
    fn location(&self) -> &str {
        &self.document
    }

    fn stored(url: String, description: Option<String>) -> Self {
        Submission {
            document: url,
            document_description: description
                .unwrap_or_else(|| DEFAULT_SUBMISSION_DESCRIPTION.to_string()),
        }
    }
}

// ── Keys ────────────────────────────────────────────────────────────

/// Reduce a client supplied file name to a safe final key segment.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

/// `{folder}/{millis}_{8 hex}_{sanitized name}`.
pub fn derive_key(folder: Folder, file_name: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}/{}_{}_{}",
        folder.prefix(),
        Utc::now().timestamp_millis(),
        &suffix[..8],
        sanitize_file_name(file_name)
    )
}

/// Upload time (unix millis) encoded in a key produced by [`derive_key`].
pub fn key_timestamp(key: &str) -> Option<i64> {
    key.rsplit('/').next()?.split('_').next()?.parse().ok()
}

fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

/// Give each upload the description at the same index, if any.
pub fn attach_descriptions(uploads: &mut [FileUpload], descriptions: &[String]) {
    for (upload, description) in uploads.iter_mut().zip(descriptions) {
        let description = description.trim();
        if !description.is_empty() {
            upload.description = Some(description.to_string());
        }
    }
}

// ── Reconcile ───────────────────────────────────────────────────────

impl Engine {
    /// Reject unsupported content types and oversize files. Runs before
    /// any network call.
    pub fn check_uploads(&self, uploads: &[FileUpload]) -> Result<(), AppError> {
        for upload in uploads {
            let content_type = normalize_content_type(&upload.content_type);
            if !self
                .settings
                .allowed_content_types
                .iter()
                .any(|allowed| *allowed == content_type)
            {
                return Err(AppError::unsupported_media_type(format!(
                    "{} has unsupported type '{}'; allowed types: {}",
                    upload.file_name,
                    content_type,
                    self.settings.allowed_content_types.join(", ")
                )));
            }
            if upload.bytes.len() > self.settings.max_file_bytes {
                return Err(AppError::invalid_field(
                    "files",
                    format!(
                        "{} exceeds the maximum size of {} bytes",
                        upload.file_name, self.settings.max_file_bytes
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Synchronize an attachment list with object storage.
    ///
    /// Uploads every add concurrently (any failure aborts with
    /// `StorageWrite` before the list changes), drops every current entry
    /// addressed by `removes` (by stored URL or key) and deletes its object
    /// best-effort. Survivors keep their order; new entries are appended.
    pub async fn reconcile<T: AttachedDocument>(
        &self,
        folder: Folder,
        current: Vec<T>,
        adds: Vec<FileUpload>,
        removes: &[String],
    ) -> Result<Vec<T>, AppError> {
        self.check_uploads(&adds)?;

        let added: Vec<T> = try_join_all(
            adds.into_iter()
                .map(|upload| self.upload_one::<T>(folder, upload)),
        )
        .await?;

        let (mut kept, dropped) = self.partition_removed(current, removes);
        if !dropped.is_empty() {
            self.delete_locations(dropped.iter().map(AttachedDocument::location))
                .await;
        }

        tracing::debug!(
            folder = folder.prefix(),
            added = added.len(),
            removed = dropped.len(),
            kept = kept.len(),
            "Reconciled attachment list"
        );

        kept.extend(added);
        Ok(kept)
    }

    async fn upload_one<T: AttachedDocument>(
        &self,
        folder: Folder,
        upload: FileUpload,
    ) -> Result<T, AppError> {
        let key = derive_key(folder, &upload.file_name);
        let content_type = normalize_content_type(&upload.content_type);
        let size = upload.bytes.len();

        let put = self.objects.put(&key, &content_type, upload.bytes);
        match tokio::time::timeout(self.settings.storage_timeout, put).await {
            Ok(Ok(url)) => {
                tracing::info!(key = %key, size, "Stored attachment");
                Ok(T::stored(url, upload.description))
            }
            Ok(Err(e)) => {
                tracing::error!(key = %key, error = %e, "Attachment upload failed");
                Err(AppError::storage_write("An uploaded file could not be stored"))
            }
            Err(_) => {
                tracing::error!(
                    key = %key,
                    timeout_secs = self.settings.storage_timeout.as_secs(),
                    "Attachment upload timed out"
                );
                Err(AppError::storage_write("Storing an uploaded file timed out"))
            }
        }
    }

    /// Split `current` into (kept, dropped) per the removal instructions.
    fn partition_removed<T: AttachedDocument>(
        &self,
        current: Vec<T>,
        removes: &[String],
    ) -> (Vec<T>, Vec<T>) {
        let targets: HashSet<&str> = removes
            .iter()
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .collect();
        if targets.is_empty() {
            return (current, Vec::new());
        }

        let base = self.objects.base_url();
        let target_keys: HashSet<String> = targets
            .iter()
            .filter_map(|t| key_from_location(base, t))
            .collect();

        current.into_iter().partition(|doc| {
            let location = doc.location().trim();
            let addressed = targets.contains(location)
                || key_from_location(base, location)
                    .is_some_and(|key| target_keys.contains(&key));
            !addressed
        })
    }

    /// Delete the objects behind stored locations, concurrently and
    /// best-effort. Returns how many deletes succeeded.
    pub(crate) async fn delete_locations<'a>(
        &self,
        locations: impl IntoIterator<Item = &'a str>,
    ) -> usize {
        let base = self.objects.base_url();
        let mut keys: Vec<String> = Vec::new();
        for location in locations {
            match key_from_location(base, location) {
                Some(key) if !keys.contains(&key) => keys.push(key),
                Some(_) => {}
                None => tracing::debug!(location, "Not deleting document outside the bucket"),
            }
        }

        let results = join_all(keys.iter().map(|key| self.delete_key(key))).await;
        results.into_iter().filter(|deleted| *deleted).count()
    }

    async fn delete_key(&self, key: &str) -> bool {
        let kind = AppErrorKind::StorageDelete;
        match tokio::time::timeout(self.settings.storage_timeout, self.objects.delete(key)).await {
            Ok(Ok(())) => {
                tracing::info!(key, "Deleted attachment");
                true
            }
            Ok(Err(e)) => {
                tracing::warn!(key, %kind, error = %e, "Attachment delete failed; left for the orphan sweep");
                false
            }
            Err(_) => {
                tracing::warn!(key, %kind, "Attachment delete timed out; left for the orphan sweep");
                false
            }
        }
    }
}
