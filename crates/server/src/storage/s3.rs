use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::{
    config::{Credentials, Region},
    presigning::PresigningConfig,
    primitives::ByteStream,
    types::ServerSideEncryption,
    Client,
};
use shared_types::StorageConfig;

use super::{env_or, ObjectStore, StorageError};

const DEFAULT_BUCKET: &str = "intake-documents";

/// S3-compatible object store (AWS S3, MinIO, Tigris).
/// All uploads are encrypted with SSE-S3 (AES256).
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    base_url: String,
}

impl S3ObjectStore {
    /// Build a store from environment variables.
    ///
    /// Supports both Fly/Tigris (`AWS_*`) and local MinIO (`S3_*`) naming:
    ///   - `AWS_ENDPOINT_URL_S3` / `S3_ENDPOINT`
    ///   - `AWS_ACCESS_KEY_ID`   / `S3_ACCESS_KEY`
    ///   - `AWS_SECRET_ACCESS_KEY` / `S3_SECRET_KEY`
    ///   - `AWS_REGION`          / `S3_REGION`
    ///   - `BUCKET_NAME`         / `S3_BUCKET`
    pub fn from_env(config: &StorageConfig) -> Result<Self, StorageError> {
        let endpoint = env_or("AWS_ENDPOINT_URL_S3", "S3_ENDPOINT").ok_or_else(|| {
            StorageError::Config("AWS_ENDPOINT_URL_S3 or S3_ENDPOINT must be set".to_string())
        })?;
        let access_key = env_or("AWS_ACCESS_KEY_ID", "S3_ACCESS_KEY").ok_or_else(|| {
            StorageError::Config("AWS_ACCESS_KEY_ID or S3_ACCESS_KEY must be set".to_string())
        })?;
        let secret_key = env_or("AWS_SECRET_ACCESS_KEY", "S3_SECRET_KEY").ok_or_else(|| {
            StorageError::Config(
                "AWS_SECRET_ACCESS_KEY or S3_SECRET_KEY must be set".to_string(),
            )
        })?;
        let region =
            env_or("AWS_REGION", "S3_REGION").unwrap_or_else(|| "us-east-1".to_string());
        let bucket =
            env_or("BUCKET_NAME", "S3_BUCKET").unwrap_or_else(|| DEFAULT_BUCKET.to_string());

        let creds = Credentials::new(&access_key, &secret_key, None, None, "env");

        let sdk_config = aws_sdk_s3::Config::builder()
            .endpoint_url(&endpoint)
            .region(Region::new(region))
            .credentials_provider(creds)
            .force_path_style(true)
            .behavior_version_latest()
            .build();

        let base_url = config
            .public_base_url
            .clone()
            .unwrap_or_else(|| format!("{}/{}", endpoint.trim_end_matches('/'), bucket));

        Ok(Self {
            client: Client::from_conf(sdk_config),
            bucket,
            base_url,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Create the bucket if it does not exist. Objects stay private; reads
    /// go through presigned URLs.
    pub async fn ensure_bucket(&self) {
        let exists = self
            .client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .is_ok();

        if exists {
            tracing::info!(bucket = %self.bucket, "Document bucket already exists");
            return;
        }

        tracing::info!(bucket = %self.bucket, "Creating document bucket");
        match self.client.create_bucket().bucket(&self.bucket).send().await {
            Ok(_) => tracing::info!(bucket = %self.bucket, "Document bucket created"),
            Err(e) => tracing::warn!(
                bucket = %self.bucket,
                error = %e,
                "Failed to create document bucket"
            ),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn put(
        &self,
        key: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<String, StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .server_side_encryption(ServerSideEncryption::Aes256)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                let svc = e.into_service_error();
                tracing::error!(key, error = ?svc, "S3 PutObject failed");
                StorageError::Backend(format!("PutObject: {svc}"))
            })?;

        Ok(self.url_for(key))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let svc = e.into_service_error();
                StorageError::Backend(format!("DeleteObject: {svc}"))
            })?;
        Ok(())
    }

    async fn presign(&self, key: &str, ttl: Duration) -> Result<String, StorageError> {
        let presign_config = PresigningConfig::builder()
            .expires_in(ttl)
            .build()
            .map_err(|e| StorageError::Presign(e.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presign_config)
            .await
            .map_err(|e| StorageError::Backend(format!("Presign GET: {e}")))?;

        Ok(presigned.uri().to_string())
    }

    async fn list(&self) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let resp = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| {
                    let svc = e.into_service_error();
                    StorageError::Backend(format!("ListObjectsV2: {svc}"))
                })?;

            keys.extend(
                resp.contents()
                    .iter()
                    .filter_map(|object| object.key().map(str::to_string)),
            );

            match resp.next_continuation_token() {
                Some(token) if resp.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        Ok(keys)
    }
}
