//! Blob storage for generated media (`spec.md` §4.1, §6.4).
//!
//! Grounded on the teacher's `S3Storage` (`crates/services/src/files/storage.rs`),
//! minus its client-side encryption wrapper — nothing in `spec.md` calls for
//! at-rest encryption, and carrying it would mean inventing a key-management
//! story the spec never asks for.

use crate::errors::ObjectStoreError;
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use tracing::{debug, error};

#[async_trait]
pub trait ObjectStoreTrait: Send + Sync {
    /// Uploads `data` under `key`. When `upsert` is `false` (the default for
    /// every key layout in `spec.md` §6.4), a pre-existing object at `key`
    /// is an error rather than being overwritten.
    async fn put(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<(), ObjectStoreError>;

    async fn get(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError>;

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError>;

    async fn exists(&self, key: &str) -> Result<bool, ObjectStoreError>;
}

#[derive(Clone)]
pub struct S3ObjectStore {
    client: S3Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(client: S3Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    pub async fn from_config(cfg: &config::ObjectStoreConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(cfg.region.clone()));
        if let Some(endpoint) = &cfg.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        if let (Some(key), Some(secret)) = (&cfg.access_key_id, &cfg.secret_access_key) {
            loader = loader.credentials_provider(aws_sdk_s3::config::Credentials::new(
                key.clone(),
                secret.clone(),
                None,
                None,
                "avatar-platform-static",
            ));
        }
        let shared = loader.load().await;
        let client = S3Client::new(&shared);
        Self::new(client, cfg.bucket.clone())
    }
}

#[async_trait]
impl ObjectStoreTrait for S3ObjectStore {
    async fn put(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<(), ObjectStoreError> {
        if !upsert && self.exists(key).await? {
            return Err(ObjectStoreError::AlreadyExists(key.to_string()));
        }

        debug!(bucket = %self.bucket, key, "uploading object");
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                error!(key, error = %e, "object upload failed");
                ObjectStoreError::Backend(e.to_string())
            })?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().map(|s| s.is_no_such_key()).unwrap_or(false) {
                    ObjectStoreError::NotFound(key.to_string())
                } else {
                    ObjectStoreError::Backend(e.to_string())
                }
            })?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?
            .into_bytes()
            .to_vec();
        Ok(bytes)
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                error!(key, error = %e, "object delete failed");
                ObjectStoreError::Backend(e.to_string())
            })?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, ObjectStoreError> {
        match self.client.head_object().bucket(&self.bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.as_service_error().map(|s| s.is_not_found()).unwrap_or(false) {
                    Ok(false)
                } else {
                    Err(ObjectStoreError::Backend(e.to_string()))
                }
            }
        }
    }
}
