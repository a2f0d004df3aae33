//! File storage error types

use thiserror::Error;

/// Errors from low-level attachment storage
#[derive(Error, Debug)]
pub enum FileStorageError {
    #[error("Invalid file name: {0}")]
    InvalidName(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the upload service
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Too many attachments: {count} (max: {max})")]
    TooMany { count: usize, max: usize },

    #[error("File too large: {name} is {size} bytes (max: {max})")]
    TooLarge { name: String, size: usize, max: usize },

    #[error("Storage error: {0}")]
    Storage(#[from] FileStorageError),
}
