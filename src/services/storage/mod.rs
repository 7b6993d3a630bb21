//! Object storage for project media.
//!
//! The proxy only needs three operations: size/type lookup, a full download and an
//! inclusive byte-range download. Both backends implement [`MediaStorage`].

mod local;
mod s3;

pub use local::LocalMediaStorage;
pub use s3::S3MediaStorage;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub size: u64,
    pub content_type: String,
}

#[async_trait]
pub trait MediaStorage: Send + Sync {
    async fn metadata(&self, key: &str) -> Result<ObjectMetadata, StorageError>;

    async fn download(&self, key: &str) -> Result<Bytes, StorageError>;

    /// Reads bytes `start..=end`.
    async fn download_range(&self, key: &str, start: u64, end: u64) -> Result<Bytes, StorageError>;
}

/// Object key for a stored media URL: the URL path without its leading bucket segment.
///
/// `http://minio:9000/clipforge/projects/x/source.mp4` -> `projects/x/source.mp4`.
pub fn storage_key_from_url(stored_url: &str) -> Result<String, StorageError> {
    let parsed = Url::parse(stored_url).map_err(|_| StorageError::InvalidKey(stored_url.to_string()))?;

    let mut segments = parsed
        .path_segments()
        .ok_or_else(|| StorageError::InvalidKey(stored_url.to_string()))?
        .filter(|s| !s.is_empty());

    // bucket
    segments.next();

    let key = segments.collect::<Vec<_>>().join("/");
    if key.is_empty() {
        return Err(StorageError::InvalidKey(stored_url.to_string()));
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_strips_bucket() {
        assert_eq!(
            storage_key_from_url("http://localhost:9000/clipforge/projects/x/source.mp4").unwrap(),
            "projects/x/source.mp4"
        );
        assert_eq!(
            storage_key_from_url("https://s3.amazonaws.com/media-bucket/a.mov?X-Amz-Signature=abc").unwrap(),
            "a.mov"
        );
    }

    #[test]
    fn test_key_rejects_bucket_only_and_garbage() {
        assert!(matches!(
            storage_key_from_url("http://localhost:9000/clipforge/"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(storage_key_from_url("not a url"), Err(StorageError::InvalidKey(_))));
    }
}
