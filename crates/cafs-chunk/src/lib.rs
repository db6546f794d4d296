//! Chunk writer and reader for the content-addressable chunk store.
//!
//! A byte stream is split into fixed-size leaves. Each leaf is hashed with a
//! position-aware BLAKE2b tree hash and stored once under its key; the
//! stream as a whole is identified by a root key computed over the ordered
//! leaf keys. The ordered keys themselves are persisted as the stream's
//! leaf directory, reachable from the root key.
//!
//! # Architecture
//!
//! - **ChunkWriter**: buffers writes into leaves and uploads them
//!   concurrently under a fixed bound, skipping leaves the store already holds
//! - **ChunkReader**: single-pass `AsyncRead` that streams leaves back in order
//! - **Leaf directory**: flat concatenation of leaf keys stored under the root
//! - **ChunkStore**: ties the three together over one backing [`BlobStore`]
//!
//! [`BlobStore`]: cafs_store::BlobStore

pub mod config;
pub mod directory;
pub mod error;
pub mod path;
pub mod reader;
pub mod store;
pub mod writer;

#[cfg(test)]
mod test_support;

pub use config::ChunkStoreConfig;
pub use directory::{leaves_for_root, store_leaf_directory, StreamDescriptor};
pub use error::{ChunkError, ChunkResult};
pub use path::{prefix_pather, Pather};
pub use reader::ChunkReader;
pub use store::{ChunkStore, PutOutcome};
pub use writer::{ChunkWriter, WriterState};
