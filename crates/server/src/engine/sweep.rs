use std::collections::HashSet;

use chrono::Utc;
use shared_types::{AppError, PresignedUrlResponse, SweepReport};

use super::attachments::key_timestamp;
use super::requests::submission_locations;
use super::Engine;
use crate::repo::{CaseFilter, RequestFilter};
use crate::storage::key_from_location;

impl Engine {
    /// Every key in the bucket.
    pub async fn list_stored_objects(&self) -> Result<Vec<String>, AppError> {
        match tokio::time::timeout(self.settings.storage_timeout, self.objects.list()).await {
            Ok(Ok(mut keys)) => {
                keys.sort();
                Ok(keys)
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Listing stored objects failed");
                Err(AppError::internal("Could not list stored objects"))
            }
            Err(_) => {
                tracing::error!("Listing stored objects timed out");
                Err(AppError::internal("Could not list stored objects"))
            }
        }
    }

    pub async fn presign_object(&self, key: &str) -> Result<PresignedUrlResponse, AppError> {
        let key = key.trim().trim_start_matches('/');
        if key.is_empty() {
            return Err(AppError::invalid_field("key", "Key is required"));
        }
        let ttl = self.settings.presign_ttl;
        match tokio::time::timeout(self.settings.storage_timeout, self.objects.presign(key, ttl)).await {
            Ok(Ok(url)) => Ok(PresignedUrlResponse {
                key: key.to_string(),
                url,
                expires_in_secs: ttl.as_secs(),
            }),
            Ok(Err(e)) => {
                tracing::error!(key, error = %e, "Presign failed");
                Err(AppError::internal("Could not create a download link"))
            }
            Err(_) => {
                tracing::error!(key, "Presign timed out");
                Err(AppError::internal("Could not create a download link"))
            }
        }
    }

    /// Keys referenced by any request submission, incident file or case
    /// document.
    pub async fn referenced_keys(&self) -> Result<HashSet<String>, AppError> {
        let base = self.objects.base_url();
        let requests = self.store.list_requests(RequestFilter::default()).await?;
        let incidents = self.store.list_incidents().await?;
        let cases = self.store.list_cases(CaseFilter::default()).await?;

        let locations = requests
            .iter()
            .flat_map(submission_locations)
            .chain(incidents.iter().flat_map(|i| {
                i.uploaded_files
                    .iter()
                    .chain(i.image_link.iter())
                    .map(String::as_str)
            }))
            .chain(cases.iter().flat_map(|c| c.documents.all().map(String::as_str)));

        Ok(locations
            .filter_map(|location| key_from_location(base, location))
            .collect())
    }

    /// Find bucket objects no entity references and, unless `dry_run`,
    /// delete them. Objects younger than the grace period are left alone
    /// since their entity may not be committed yet.
    pub async fn sweep_orphans(&self, dry_run: bool) -> Result<SweepReport, AppError> {
        let keys = self.list_stored_objects().await?;
        let referenced = self.referenced_keys().await?;
        let cutoff = Utc::now().timestamp_millis()
            - i64::try_from(self.settings.sweep_grace.as_millis()).unwrap_or(i64::MAX);

        let mut report = SweepReport {
            dry_run,
            scanned: keys.len(),
            ..SweepReport::default()
        };
        for key in keys {
            if referenced.contains(&key) {
                report.referenced += 1;
            } else if key_timestamp(&key).is_some_and(|ts| ts > cutoff) {
                report.skipped_recent += 1;
            } else {
                report.orphaned.push(key);
            }
        }

        if !dry_run && !report.orphaned.is_empty() {
            report.deleted = self
                .delete_locations(report.orphaned.iter().map(String::as_str))
                .await;
        }

        tracing::info!(
            dry_run,
            scanned = report.scanned,
            referenced = report.referenced,
            skipped_recent = report.skipped_recent,
            orphaned = report.orphaned.len(),
            deleted = report.deleted,
            "Orphan sweep finished"
        );
        Ok(report)
    }
}
