//! Error types for the disk cache store.

use std::path::PathBuf;

/// Result type for cache store operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors that can occur while reading, writing or sweeping the cache directory.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Key cannot be used as a file name inside the cache directory
    #[error("Invalid cache key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    /// Directory creation failed
    #[error("Failed to create directory: {path:?} - {source}")]
    DirectoryCreation {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Permissions error
    #[error("Permission denied: {operation} on {path:?}")]
    Permission { operation: String, path: PathBuf },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}
