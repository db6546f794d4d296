//! Blob storage for the content-addressable chunk store.
//!
//! The chunk store only needs a narrow key/value contract from its backing
//! storage: existence check, streaming get, put, delete and key enumeration.
//! Stores that can verify a CRC-32C before committing a write advertise it
//! through [`BlobStore::as_checksum_store`].
//!
//! # Storage Backends
//!
//! - [`InMemoryBlobStore`] -- `HashMap`-based store for tests and embedding
//!   (checksum-capable)
//! - [`FileBlobStore`] -- one file per key below a root directory
//!
//! # Design Rules
//!
//! 1. The store never interprets blob contents -- it is a pure key-value store.
//! 2. Implementations are safe for concurrent use.
//! 3. All I/O errors are propagated, never silently ignored.
//! 4. No retries: retry policy belongs to the caller.

pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use file::FileBlobStore;
pub use memory::InMemoryBlobStore;
pub use traits::{BlobReader, BlobStore, ChecksumBlobStore, WritePolicy};
