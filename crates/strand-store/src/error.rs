use std::path::PathBuf;

use strand_object::ObjectError;
use strand_types::Hash;

/// Errors from graph store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(Hash),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted snapshot cannot be read back.
    #[error("corrupt snapshot {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// The object could not be hashed.
    #[error("object error: {0}")]
    Object(#[from] ObjectError),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
