//! Error types for the store module.

use revstore_core::ContentAddress;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A lock guarding backend state was poisoned by a panicking writer.
    #[error("lock poisoned: {0}")]
    Poisoned(String),

    /// A blocking task failed to complete.
    #[error("blocking task failed: {0}")]
    Task(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors resolving content through the content adapter.
#[derive(Debug, Error)]
pub enum ContentError {
    /// The blob is not present locally. Retry against a remote replica.
    #[error("content {0} is missing")]
    Missing(ContentAddress),

    /// The stored bytes do not hash to their address.
    #[error("content {address} is corrupt: bytes hash to {actual}")]
    Corrupt {
        address: ContentAddress,
        actual: ContentAddress,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ContentError {
    /// Only a missing blob is worth retrying elsewhere.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Missing(_))
    }
}
