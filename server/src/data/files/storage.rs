//! Attachment storage trait definition

use async_trait::async_trait;

use super::error::FileStorageError;

/// Trait for attachment storage backends
///
/// Files are addressed by a flat, server-generated name. Implementations must
/// be thread-safe for use from request handlers.
#[async_trait]
pub trait AttachmentStorage: Send + Sync {
    /// Store a file under `name`, replacing any previous content
    async fn store(&self, name: &str, data: &[u8]) -> Result<(), FileStorageError>;

    /// Check if a file exists
    async fn exists(&self, name: &str) -> Result<bool, FileStorageError>;

    /// Delete a file; a missing file is not an error
    async fn delete(&self, name: &str) -> Result<(), FileStorageError>;
}
