//! Filesystem-based attachment storage
//!
//! Stores files flat under the upload directory: `{base_path}/{name}`.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use super::error::FileStorageError;
use super::storage::AttachmentStorage;

/// Filesystem-based attachment storage
#[derive(Debug, Clone)]
pub struct FilesystemStorage {
    base_path: PathBuf,
}

impl FilesystemStorage {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Resolve a stored name, rejecting anything that could leave the base directory
    fn file_path(&self, name: &str) -> Result<PathBuf, FileStorageError> {
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\', '\0']);
        if !valid {
            return Err(FileStorageError::InvalidName(name.to_string()));
        }
        Ok(self.base_path.join(name))
    }
}

#[async_trait]
impl AttachmentStorage for FilesystemStorage {
    async fn store(&self, name: &str, data: &[u8]) -> Result<(), FileStorageError> {
        let path = self.file_path(name)?;
        fs::create_dir_all(&self.base_path).await?;
        fs::write(&path, data).await?;

        tracing::debug!(name, size = data.len(), path = %path.display(), "Attachment stored");
        Ok(())
    }

    async fn exists(&self, name: &str) -> Result<bool, FileStorageError> {
        let path = self.file_path(name)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn delete(&self, name: &str) -> Result<(), FileStorageError> {
        let path = self.file_path(name)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(name, "Attachment deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_store_and_delete() {
        let dir = TempDir::new().unwrap();
        let storage = FilesystemStorage::new(dir.path().join("uploads"));

        storage.store("a.png", b"png-bytes").await.unwrap();
        assert!(storage.exists("a.png").await.unwrap());
        assert_eq!(
            std::fs::read(dir.path().join("uploads/a.png")).unwrap(),
            b"png-bytes"
        );

        storage.delete("a.png").await.unwrap();
        assert!(!storage.exists("a.png").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let dir = TempDir::new().unwrap();
        let storage = FilesystemStorage::new(dir.path().to_path_buf());
        storage.delete("never-written.txt").await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_traversal_names() {
        let dir = TempDir::new().unwrap();
        let storage = FilesystemStorage::new(dir.path().to_path_buf());

        for name in ["", "..", "../etc/passwd", "sub/file", "a\\b"] {
            let err = storage.store(name, b"x").await.unwrap_err();
            assert!(matches!(err, FileStorageError::InvalidName(_)), "{}", name);
        }
    }
}
