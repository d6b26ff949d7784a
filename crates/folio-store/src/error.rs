//! Error types for storage, saving, and configuration.

use folio_doc::WireError;
use thiserror::Error;

/// Errors from a note storage backend or the save path.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite failure.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// JSON encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Blocks could not be encoded for the wire.
    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    /// Any other backend failure (remote service, test doubles).
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Result type for storage operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Error type for config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("config encode error: {0}")]
    Encode(#[from] ron::Error),
}
