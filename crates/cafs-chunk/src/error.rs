use cafs_store::StoreError;
use cafs_types::{ContentKey, KeyError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Existence check or put for a leaf failed.
    #[error("write segment file {path} (leaf {index}): {source}")]
    Upload {
        index: u64,
        path: String,
        #[source]
        source: StoreError,
    },

    /// Opening or reading a stored object during reconstruction failed.
    #[error("fetch {path}: {source}")]
    Fetch {
        path: String,
        #[source]
        source: StoreError,
    },

    #[error("malformed leaf directory for {root}: {source}")]
    BadDirectory {
        root: ContentKey,
        #[source]
        source: KeyError,
    },

    #[error("leaf {index} is larger than the leaf size of {leaf_size} bytes")]
    OversizedLeaf { index: usize, leaf_size: u32 },

    #[error("leaf {index} finished without reporting a key")]
    MissingLeaf { index: u64 },

    #[error("stream closed without being flushed")]
    ClosedWithoutFlush,

    #[error("writer already flushed")]
    WriterFlushed,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("leaf task failed: {0}")]
    TaskFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ChunkResult<T> = Result<T, ChunkError>;
