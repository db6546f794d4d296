use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::StoreResult;

/// Readable handle on a stored blob. Dropping it releases the handle.
pub type BlobReader = Box<dyn AsyncRead + Send + Unpin>;

/// What `put` does when the target key already holds a blob.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WritePolicy {
    /// Replace the existing blob.
    #[default]
    OverWrite,
    /// Fail with `StoreError::AlreadyExists`.
    NoOverWrite,
}

/// Key/value byte store backing the chunk store.
///
/// Keys are store paths (a hex content key, optionally prefixed). All
/// implementations must be safe for concurrent use: the chunk writer issues
/// many puts in parallel against one shared store.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Check whether a blob exists under `key`.
    async fn has(&self, key: &str) -> StoreResult<bool>;

    /// Open a blob for reading.
    ///
    /// Returns `StoreError::NotFound` if nothing is stored under `key`.
    async fn get(&self, key: &str) -> StoreResult<BlobReader>;

    /// Store `data` under `key`.
    async fn put(&self, key: &str, data: Bytes, policy: WritePolicy) -> StoreResult<()>;

    /// Remove the blob under `key`.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// All keys currently stored.
    async fn keys(&self) -> StoreResult<Vec<String>>;

    /// Remove every blob. Default implementation deletes key by key.
    async fn clear(&self) -> StoreResult<()> {
        for key in self.keys().await? {
            self.delete(&key).await?;
        }
        Ok(())
    }

    /// Read a whole blob into memory.
    async fn read_all(&self, key: &str) -> StoreResult<Vec<u8>> {
        let mut reader = self.get(key).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Capability query for checksum-verified writes.
    ///
    /// Stores that implement [`ChecksumBlobStore`] override this to return
    /// themselves.
    fn as_checksum_store(&self) -> Option<&dyn ChecksumBlobStore> {
        None
    }
}

/// A store that verifies a CRC-32C of the payload before committing it.
#[async_trait]
pub trait ChecksumBlobStore: BlobStore {
    async fn put_with_checksum(
        &self,
        key: &str,
        data: Bytes,
        policy: WritePolicy,
        crc32c: u32,
    ) -> StoreResult<()>;
}
