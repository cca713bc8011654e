use std::path::PathBuf;

use loam_types::{ObjectId, TypeError};

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    /// The stored bytes could not be decompressed, decoded, or verified.
    #[error("corrupt object {id}: {reason}")]
    CorruptObject { id: ObjectId, reason: String },

    /// Canonical encoding without a valid `"<kind> <len>\0"` header.
    #[error("malformed object: {0}")]
    MalformedObject(String),

    /// A tree payload record is truncated or ill-formed.
    #[error("malformed tree entry at offset {offset}: {reason}")]
    MalformedTree { offset: usize, reason: String },

    /// A commit payload could not be parsed.
    #[error("malformed commit: {0}")]
    MalformedCommit(String),

    /// Caller-supplied fields cannot be encoded.
    #[error("invalid fields: {0}")]
    InvalidFields(String),

    /// An object id string could not be parsed.
    #[error("invalid object id: {0}")]
    InvalidObjectId(#[from] TypeError),

    /// I/O error from the underlying filesystem.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Wrap an I/O error with the path it occurred at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
