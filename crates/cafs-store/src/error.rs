/// Errors from blob store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested blob was not found.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// A `NoOverWrite` put targeted an existing blob.
    #[error("blob already exists: {0}")]
    AlreadyExists(String),

    /// The key cannot be mapped to a storage location.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Payload did not match the checksum supplied with it.
    #[error("checksum mismatch for {key}: expected {expected:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        key: String,
        expected: u32,
        computed: u32,
    },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Storage backend is read-only or otherwise unavailable.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
