//! Error types for store operations

use std::error::Error;
use std::fmt;

/// Error type for store operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Record not found
    NotFound(String),

    /// Revision mismatch on update or delete
    PreconditionFailed(String),

    /// Record already exists
    AlreadyExists(String),

    /// Malformed or unsupported query
    Query(String),

    /// Serialization/deserialization error
    Serialization(String),

    /// Internal error
    Internal(String),

    /// Other error
    Other(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::NotFound(msg) => write!(f, "Not found: {}", msg),
            StorageError::PreconditionFailed(msg) => write!(f, "Precondition failed: {}", msg),
            StorageError::AlreadyExists(msg) => write!(f, "Already exists: {}", msg),
            StorageError::Query(msg) => write!(f, "Query error: {}", msg),
            StorageError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            StorageError::Internal(msg) => write!(f, "Internal error: {}", msg),
            StorageError::Other(msg) => write!(f, "Other error: {}", msg),
        }
    }
}

impl Error for StorageError {}

/// Convert a JSON error to a storage error
impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

// This allows StorageError to be converted to the top-level LinksetError
impl From<StorageError> for crate::LinksetError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(msg) => crate::LinksetError::NotFound(msg),
            StorageError::PreconditionFailed(msg) => crate::LinksetError::PreconditionFailed(msg),
            StorageError::Query(msg) => crate::LinksetError::BadRequest(msg),
            other => crate::LinksetError::Internal(other.to_string()),
        }
    }
}
