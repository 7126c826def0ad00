use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid storage path: {0}")]
    InvalidPath(String),

    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("object store error: {0}")]
    Remote(String),
}

/// Where uploaded bytes actually live. Paths are always relative to the
/// backend's public root.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn put(&self, path: &str, data: Bytes, content_type: &str) -> Result<(), StorageError>;

    /// Deleting a path that does not exist succeeds.
    async fn delete(&self, path: &str) -> Result<(), StorageError>;

    async fn exists(&self, path: &str) -> Result<bool, StorageError>;
}

pub struct LocalDiskStorage {
    root: PathBuf,
}

impl LocalDiskStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, relative: &str) -> Result<PathBuf, StorageError> {
        let candidate = Path::new(relative);
        let clean = candidate
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if relative.is_empty() || !clean {
            return Err(StorageError::InvalidPath(relative.to_string()));
        }
        Ok(self.root.join(candidate))
    }
}

#[async_trait]
impl StorageBackend for LocalDiskStorage {
    async fn put(&self, path: &str, data: Bytes, _content_type: &str) -> Result<(), StorageError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StorageError::Io {
                    path: path.to_string(),
                    source,
                })?;
        }
        tokio::fs::write(&target, &data)
            .await
            .map_err(|source| StorageError::Io {
                path: path.to_string(),
                source,
            })
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let target = self.resolve(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                path: path.to_string(),
                source,
            }),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let target = self.resolve(path)?;
        tokio::fs::try_exists(&target)
            .await
            .map_err(|source| StorageError::Io {
                path: path.to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalDiskStorage::new(dir.path());

        storage
            .put("events/a.jpg", Bytes::from_static(b"abc"), "image/jpeg")
            .await
            .unwrap();
        assert!(storage.exists("events/a.jpg").await.unwrap());

        storage.delete("events/a.jpg").await.unwrap();
        storage.delete("events/a.jpg").await.unwrap();
        assert!(!storage.exists("events/a.jpg").await.unwrap());
    }

    #[tokio::test]
    async fn rejects_paths_escaping_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalDiskStorage::new(dir.path());

        let err = storage
            .put("../outside.txt", Bytes::from_static(b"x"), "text/plain")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidPath(_)));
        assert!(storage.delete("/etc/passwd").await.is_err());
    }
}
