use std::collections::HashMap;
use std::io::Cursor;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{StoreError, StoreResult};
use crate::traits::{BlobReader, BlobStore, ChecksumBlobStore, WritePolicy};

/// In-memory, HashMap-based blob store.
///
/// Intended for tests and embedding. Blobs are held as `Bytes` behind a
/// `RwLock` for safe concurrent access, so reads hand out cheap clones.
/// Supports checksum-verified writes.
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, Bytes>>,
}

impl InMemoryBlobStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.blobs.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.blobs.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes across all stored blobs.
    pub fn total_bytes(&self) -> u64 {
        self.blobs
            .read()
            .expect("lock poisoned")
            .values()
            .map(|b| b.len() as u64)
            .sum()
    }

    fn insert(&self, key: &str, data: Bytes, policy: WritePolicy) -> StoreResult<()> {
        let mut map = self.blobs.write().expect("lock poisoned");
        if policy == WritePolicy::NoOverWrite && map.contains_key(key) {
            return Err(StoreError::AlreadyExists(key.to_string()));
        }
        map.insert(key.to_string(), data);
        Ok(())
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn has(&self, key: &str) -> StoreResult<bool> {
        let map = self.blobs.read().expect("lock poisoned");
        Ok(map.contains_key(key))
    }

    async fn get(&self, key: &str) -> StoreResult<BlobReader> {
        let map = self.blobs.read().expect("lock poisoned");
        let data = map
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        Ok(Box::new(Cursor::new(data)))
    }

    async fn put(&self, key: &str, data: Bytes, policy: WritePolicy) -> StoreResult<()> {
        self.insert(key, data, policy)
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut map = self.blobs.write().expect("lock poisoned");
        map.remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn keys(&self) -> StoreResult<Vec<String>> {
        let map = self.blobs.read().expect("lock poisoned");
        let mut keys: Vec<String> = map.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    async fn clear(&self) -> StoreResult<()> {
        self.blobs.write().expect("lock poisoned").clear();
        Ok(())
    }

    fn as_checksum_store(&self) -> Option<&dyn ChecksumBlobStore> {
        Some(self)
    }
}

#[async_trait]
impl ChecksumBlobStore for InMemoryBlobStore {
    async fn put_with_checksum(
        &self,
        key: &str,
        data: Bytes,
        policy: WritePolicy,
        crc32c: u32,
    ) -> StoreResult<()> {
        let computed = cafs_crypto::crc32c(&data);
        if computed != crc32c {
            return Err(StoreError::ChecksumMismatch {
                key: key.to_string(),
                expected: crc32c,
                computed,
            });
        }
        self.insert(key, data, policy)
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len();
        f.debug_struct("InMemoryBlobStore")
            .field("blob_count", &count)
            .finish()
    }
}
