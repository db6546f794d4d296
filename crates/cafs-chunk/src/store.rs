use std::sync::Arc;

use cafs_store::BlobStore;
use cafs_types::ContentKey;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::info;

use crate::config::ChunkStoreConfig;
use crate::directory::{self, StreamDescriptor};
use crate::error::{ChunkError, ChunkResult};
use crate::path::{prefix_pather, Pather};
use crate::reader::ChunkReader;
use crate::writer::ChunkWriter;

/// Upper bound on the copy buffer `put` reads into.
const MAX_COPY_BUFFER: usize = 1024 * 1024;

/// Result of storing one stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PutOutcome {
    /// Bytes consumed from the source.
    pub written: u64,
    pub root: ContentKey,
    pub leaves: Vec<ContentKey>,
    /// The leaf directory for `root` was already stored.
    pub duplicate: bool,
}

/// Content-addressable store for whole byte streams.
///
/// Streams go in through a [`ChunkWriter`] and come back out through a
/// [`ChunkReader`]; the root key returned by `put` is all a caller needs
/// to read the stream again. Leaves and leaf directories share one backing
/// store and one path layout.
#[derive(Clone)]
pub struct ChunkStore {
    config: ChunkStoreConfig,
    store: Arc<dyn BlobStore>,
    pather: Pather,
}

impl ChunkStore {
    pub fn new(config: ChunkStoreConfig, store: Arc<dyn BlobStore>) -> ChunkResult<Self> {
        config.validate()?;
        let pather = prefix_pather(config.prefix.clone());
        Ok(Self {
            config,
            store,
            pather,
        })
    }

    /// Replace the default `prefix + hex` path layout.
    pub fn with_pather(mut self, pather: Pather) -> Self {
        self.pather = pather;
        self
    }

    pub fn config(&self) -> &ChunkStoreConfig {
        &self.config
    }

    pub fn backend(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    /// A fresh writer sharing this store's settings.
    pub fn writer(&self) -> ChunkResult<ChunkWriter> {
        ChunkWriter::new(
            Arc::clone(&self.store),
            self.config.leaf_size,
            self.config.max_concurrent_uploads,
            Arc::clone(&self.pather),
        )
    }

    /// Store everything `source` yields and persist its leaf directory.
    pub async fn put<R>(&self, mut source: R) -> ChunkResult<PutOutcome>
    where
        R: AsyncRead + Unpin,
    {
        let mut writer = self.writer()?;
        let mut buf = vec![0u8; (self.config.leaf_size as usize).min(MAX_COPY_BUFFER)];
        loop {
            let n = source.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            writer.write(&buf[..n]).await?;
        }
        let descriptor = writer.flush().await?;
        writer.close()?;

        let duplicate =
            directory::store_leaf_directory(self.store.as_ref(), &descriptor, &self.pather).await?;
        info!(
            root = %descriptor.root,
            bytes = writer.bytes_written(),
            duplicate,
            "stored stream"
        );

        let StreamDescriptor { root, leaves } = descriptor;
        Ok(PutOutcome {
            written: writer.bytes_written(),
            root,
            leaves,
            duplicate,
        })
    }

    pub async fn put_bytes(&self, data: &[u8]) -> ChunkResult<PutOutcome> {
        self.put(data).await
    }

    /// The ordered leaf keys recorded for `root`.
    pub async fn leaves_for_root(&self, root: &ContentKey) -> ChunkResult<Vec<ContentKey>> {
        directory::leaves_for_root(self.store.as_ref(), root, &self.pather).await
    }

    /// Open the stream identified by `root` for reading.
    pub async fn get(&self, root: &ContentKey) -> ChunkResult<ChunkReader> {
        let leaves = self.leaves_for_root(root).await?;
        Ok(ChunkReader::new(
            Arc::clone(&self.store),
            *root,
            leaves,
            self.config.leaf_size,
            Arc::clone(&self.pather),
        ))
    }

    pub async fn read_to_end(&self, root: &ContentKey) -> ChunkResult<Vec<u8>> {
        let mut reader = self.get(root).await?;
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await?;
        Ok(out)
    }

    /// Whether a leaf directory is stored for `root`.
    pub async fn has(&self, root: &ContentKey) -> ChunkResult<bool> {
        Ok(self.store.has(&(self.pather)(root)).await?)
    }

    /// Remove the leaf directory for `root`. Leaves are left in place since
    /// other streams may share them.
    pub async fn delete(&self, root: &ContentKey) -> ChunkResult<()> {
        let path = (self.pather)(root);
        self.store
            .delete(&path)
            .await
            .map_err(|source| ChunkError::Fetch { path, source })
    }
}

impl std::fmt::Debug for ChunkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkStore")
            .field("config", &self.config)
            .finish()
    }
}
