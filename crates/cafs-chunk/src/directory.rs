use bytes::Bytes;
use cafs_store::{BlobStore, WritePolicy};
use cafs_types::{decode_keys, encode_keys, ContentKey};
use tracing::debug;

use crate::error::{ChunkError, ChunkResult};
use crate::path::Pather;

/// A flushed stream: its root key and the ordered keys of its leaves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamDescriptor {
    pub root: ContentKey,
    pub leaves: Vec<ContentKey>,
}

impl StreamDescriptor {
    /// The leaf directory bytes: every leaf key concatenated in stream order.
    pub fn leaf_directory(&self) -> Vec<u8> {
        encode_keys(&self.leaves)
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }
}

/// Fetch and decode the leaf directory stored for `root`.
pub async fn leaves_for_root(
    store: &dyn BlobStore,
    root: &ContentKey,
    pather: &Pather,
) -> ChunkResult<Vec<ContentKey>> {
    let path = pather(root);
    let data = store
        .read_all(&path)
        .await
        .map_err(|source| ChunkError::Fetch { path, source })?;
    decode_keys(&data).map_err(|source| ChunkError::BadDirectory {
        root: *root,
        source,
    })
}

/// Persist the leaf directory under the root's path.
///
/// Returns `true` when a directory was already stored for this root, in
/// which case nothing is written.
pub async fn store_leaf_directory(
    store: &dyn BlobStore,
    descriptor: &StreamDescriptor,
    pather: &Pather,
) -> ChunkResult<bool> {
    let path = pather(&descriptor.root);
    if store.has(&path).await? {
        debug!(root = %descriptor.root, "duplicate leaf directory");
        return Ok(true);
    }
    store
        .put(
            &path,
            Bytes::from(descriptor.leaf_directory()),
            WritePolicy::OverWrite,
        )
        .await?;
    debug!(root = %descriptor.root, leaves = descriptor.leaf_count(), "stored leaf directory");
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::prefix_pather;
    use cafs_store::{InMemoryBlobStore, StoreError};
    use cafs_types::{KeyError, KEY_SIZE};

    fn key(seed: u8) -> ContentKey {
        ContentKey::from([seed; KEY_SIZE])
    }

    #[tokio::test]
    async fn directory_roundtrip() {
        let store = InMemoryBlobStore::new();
        let pather = prefix_pather("dirs/");
        let descriptor = StreamDescriptor {
            root: key(0),
            leaves: vec![key(1), key(2), key(3)],
        };
        assert!(!store_leaf_directory(&store, &descriptor, &pather).await.unwrap());
        assert!(store.has(&pather(&key(0))).await.unwrap());

        let leaves = leaves_for_root(&store, &key(0), &pather).await.unwrap();
        assert_eq!(leaves, descriptor.leaves);
    }

    #[tokio::test]
    async fn second_store_is_duplicate() {
        let store = InMemoryBlobStore::new();
        let pather = prefix_pather("");
        let descriptor = StreamDescriptor {
            root: key(5),
            leaves: vec![key(6)],
        };
        assert!(!store_leaf_directory(&store, &descriptor, &pather).await.unwrap());
        assert!(store_leaf_directory(&store, &descriptor, &pather).await.unwrap());
    }

    #[tokio::test]
    async fn ragged_directory_is_rejected() {
        let store = InMemoryBlobStore::new();
        let pather = prefix_pather("");
        store
            .put(
                &pather(&key(7)),
                Bytes::from(vec![0u8; KEY_SIZE * 2 - 1]),
                WritePolicy::OverWrite,
            )
            .await
            .unwrap();
        let err = leaves_for_root(&store, &key(7), &pather).await.unwrap_err();
        match err {
            ChunkError::BadDirectory { root, source } => {
                assert_eq!(root, key(7));
                assert_eq!(source, KeyError::BadDirectoryLength { len: KEY_SIZE * 2 - 1 });
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_directory_reports_path() {
        let store = InMemoryBlobStore::new();
        let pather = prefix_pather("dirs/");
        let err = leaves_for_root(&store, &key(8), &pather).await.unwrap_err();
        match err {
            ChunkError::Fetch { path, source } => {
                assert_eq!(path, pather(&key(8)));
                assert!(matches!(source, StoreError::NotFound(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
