use std::io::{ErrorKind, SeekFrom};
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use super::{MediaStorage, ObjectMetadata, StorageError};
use crate::utils::mime_utils::get_mime_type_from_filename;

/// Filesystem backend rooted at a single directory, used in development and tests.
pub struct LocalMediaStorage {
    root: PathBuf,
}

impl LocalMediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.is_empty() || escapes {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

fn map_io(key: &str, err: std::io::Error) -> StorageError {
    if err.kind() == ErrorKind::NotFound {
        StorageError::NotFound(key.to_string())
    } else {
        StorageError::Io(err)
    }
}

#[async_trait]
impl MediaStorage for LocalMediaStorage {
    async fn metadata(&self, key: &str) -> Result<ObjectMetadata, StorageError> {
        let path = self.resolve(key)?;
        let meta = tokio::fs::metadata(&path).await.map_err(|e| map_io(key, e))?;
        if !meta.is_file() {
            return Err(StorageError::NotFound(key.to_string()));
        }

        Ok(ObjectMetadata {
            size: meta.len(),
            content_type: get_mime_type_from_filename(key).to_string(),
        })
    }

    async fn download(&self, key: &str) -> Result<Bytes, StorageError> {
        let path = self.resolve(key)?;
        let data = tokio::fs::read(&path).await.map_err(|e| map_io(key, e))?;
        Ok(Bytes::from(data))
    }

    async fn download_range(&self, key: &str, start: u64, end: u64) -> Result<Bytes, StorageError> {
        if end < start {
            return Err(StorageError::Backend(format!("invalid range {}-{}", start, end)));
        }

        let path = self.resolve(key)?;
        let mut file = tokio::fs::File::open(&path).await.map_err(|e| map_io(key, e))?;
        file.seek(SeekFrom::Start(start)).await?;

        let mut buf = Vec::with_capacity((end - start + 1) as usize);
        file.take(end - start + 1).read_to_end(&mut buf).await?;

        debug!("Read {} bytes of {} from local storage", buf.len(), key);
        Ok(Bytes::from(buf))
    }
}
