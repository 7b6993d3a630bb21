use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::Client;
use bytes::Bytes;
use log::{debug, error, info};

use super::{MediaStorage, ObjectMetadata, StorageError};
use crate::config::settings::StorageConfig;

const DEFAULT_CONTENT_TYPE: &str = "video/mp4";

/// S3-compatible backend. A custom endpoint switches to path-style addressing for MinIO.
pub struct S3MediaStorage {
    client: Client,
    bucket: String,
}

impl S3MediaStorage {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    pub async fn from_config(config: &StorageConfig) -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &config.endpoint {
            info!("Using custom S3 endpoint {} (path-style)", endpoint);
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self::new(Client::from_conf(builder.build()), config.bucket.clone())
    }

    async fn get(&self, key: &str, range: Option<String>) -> Result<Bytes, StorageError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .set_range(range)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().map(|se| se.is_no_such_key()).unwrap_or(false) {
                    StorageError::NotFound(key.to_string())
                } else {
                    error!("S3 get_object failed for {}: {}", key, e);
                    StorageError::Backend(e.to_string())
                }
            })?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Backend(format!("failed to read object body: {}", e)))?;
        Ok(data.into_bytes())
    }
}

#[async_trait]
impl MediaStorage for S3MediaStorage {
    async fn metadata(&self, key: &str) -> Result<ObjectMetadata, StorageError> {
        let head = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().map(|se| se.is_not_found()).unwrap_or(false) {
                    StorageError::NotFound(key.to_string())
                } else {
                    error!("S3 head_object failed for {}: {}", key, e);
                    StorageError::Backend(e.to_string())
                }
            })?;

        let size = head.content_length().unwrap_or(0).max(0) as u64;
        debug!("S3 object {} is {} bytes", key, size);

        Ok(ObjectMetadata {
            size,
            content_type: head.content_type().unwrap_or(DEFAULT_CONTENT_TYPE).to_string(),
        })
    }

    async fn download(&self, key: &str) -> Result<Bytes, StorageError> {
        self.get(key, None).await
    }

    async fn download_range(&self, key: &str, start: u64, end: u64) -> Result<Bytes, StorageError> {
        self.get(key, Some(format!("bytes={}-{}", start, end))).await
    }
}
