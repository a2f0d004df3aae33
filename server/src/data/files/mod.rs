//! Attachment storage for issue screenshots
//!
//! - `storage` - Trait definition for attachment storage backends
//! - `filesystem` - Local filesystem implementation
//! - `error` - Error types for storage and upload validation
//!
//! Stored files get a generated name and are referenced from issues by their
//! public path `/uploads/<name>`, which the HTTP server serves statically.

pub mod error;
pub mod filesystem;
pub mod storage;

use std::path::PathBuf;
use std::sync::Arc;

use crate::core::constants::{MAX_ATTACHMENT_BYTES, MAX_ATTACHMENTS, UPLOADS_URL_PREFIX};
use crate::utils::file::upload_extension;

pub use error::{FileStorageError, UploadError};
pub use filesystem::FilesystemStorage;
pub use storage::AttachmentStorage;

/// One uploaded file as received from a multipart request
#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Validates, names and stores attachments
#[derive(Clone)]
pub struct UploadService {
    storage: Arc<dyn AttachmentStorage>,
    dir: PathBuf,
}

impl UploadService {
    /// Upload service backed by the local filesystem at `dir`
    pub fn filesystem(dir: PathBuf) -> Self {
        let storage = Arc::new(FilesystemStorage::new(dir.clone()));
        Self { storage, dir }
    }

    /// Directory served under `/uploads`
    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    /// Reject a batch that exceeds the count or per-file size limits
    pub fn check_limits(attachments: &[Attachment]) -> Result<(), UploadError> {
        if attachments.len() > MAX_ATTACHMENTS {
            return Err(UploadError::TooMany {
                count: attachments.len(),
                max: MAX_ATTACHMENTS,
            });
        }
        if let Some(big) = attachments.iter().find(|a| a.data.len() > MAX_ATTACHMENT_BYTES) {
            return Err(UploadError::TooLarge {
                name: big.file_name.clone().unwrap_or_default(),
                size: big.data.len(),
                max: MAX_ATTACHMENT_BYTES,
            });
        }
        Ok(())
    }

    /// Store every attachment and return their public paths in order
    ///
    /// On failure the files already written for this batch are removed.
    pub async fn save_all(&self, attachments: &[Attachment]) -> Result<Vec<String>, UploadError> {
        Self::check_limits(attachments)?;

        let mut stored = Vec::with_capacity(attachments.len());
        for attachment in attachments {
            let name = stored_name(attachment);
            if let Err(e) = self.storage.store(&name, &attachment.data).await {
                self.remove_paths(&stored).await;
                return Err(e.into());
            }
            stored.push(public_path(&name));
        }
        Ok(stored)
    }

    /// Best-effort removal of files referenced by public paths
    ///
    /// Paths outside `/uploads/` are ignored; failures are logged.
    pub async fn remove_paths(&self, paths: &[String]) {
        for path in paths {
            let Some(name) = stored_name_from_path(path) else {
                continue;
            };
            if let Err(e) = self.storage.delete(name).await {
                tracing::warn!(error = %e, %path, "Failed to delete attachment");
            }
        }
    }
}

/// Generated storage name: random id plus a sanitized extension
fn stored_name(attachment: &Attachment) -> String {
    let id = cuid2::create_id();
    match upload_extension(
        attachment.file_name.as_deref(),
        attachment.content_type.as_deref(),
    ) {
        Some(ext) => format!("{}.{}", id, ext),
        None => id,
    }
}

fn public_path(name: &str) -> String {
    format!("{}/{}", UPLOADS_URL_PREFIX, name)
}

fn stored_name_from_path(path: &str) -> Option<&str> {
    path.strip_prefix(UPLOADS_URL_PREFIX)?
        .strip_prefix('/')
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn attachment(name: &str, size: usize) -> Attachment {
        Attachment {
            file_name: Some(name.to_string()),
            content_type: Some("image/png".to_string()),
            data: vec![0u8; size],
        }
    }

    #[tokio::test]
    async fn test_save_all_returns_public_paths() {
        let dir = TempDir::new().unwrap();
        let service = UploadService::filesystem(dir.path().to_path_buf());

        let paths = service
            .save_all(&[attachment("one.png", 4), attachment("two.PNG", 8)])
            .await
            .unwrap();

        assert_eq!(paths.len(), 2);
        assert_ne!(paths[0], paths[1]);
        for path in &paths {
            assert!(path.starts_with("/uploads/"));
            assert!(path.ends_with(".png"));
            let name = stored_name_from_path(path).unwrap();
            assert!(dir.path().join(name).exists());
        }
    }

    #[tokio::test]
    async fn test_remove_paths_deletes_files() {
        let dir = TempDir::new().unwrap();
        let service = UploadService::filesystem(dir.path().to_path_buf());
        let paths = service.save_all(&[attachment("a.png", 1)]).await.unwrap();

        service.remove_paths(&paths).await;
        let name = stored_name_from_path(&paths[0]).unwrap();
        assert!(!dir.path().join(name).exists());
    }

    #[tokio::test]
    async fn test_remove_paths_ignores_foreign_paths() {
        let dir = TempDir::new().unwrap();
        let service = UploadService::filesystem(dir.path().to_path_buf());
        service
            .remove_paths(&["https://example.com/a.png".to_string(), "/uploads/".to_string()])
            .await;
    }

    #[test]
    fn test_check_limits_count() {
        let batch: Vec<Attachment> = (0..MAX_ATTACHMENTS + 1)
            .map(|i| attachment(&format!("{}.png", i), 1))
            .collect();
        assert!(matches!(
            UploadService::check_limits(&batch),
            Err(UploadError::TooMany { .. })
        ));
    }

    #[test]
    fn test_check_limits_size() {
        let batch = vec![attachment("huge.png", MAX_ATTACHMENT_BYTES + 1)];
        match UploadService::check_limits(&batch) {
            Err(UploadError::TooLarge { name, .. }) => assert_eq!(name, "huge.png"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_stored_name_from_path() {
        assert_eq!(stored_name_from_path("/uploads/abc.png"), Some("abc.png"));
        assert_eq!(stored_name_from_path("/uploads/"), None);
        assert_eq!(stored_name_from_path("/elsewhere/abc.png"), None);
    }
}
