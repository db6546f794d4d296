use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use cafs_crypto::TreeHasher;
use cafs_store::{BlobStore, WritePolicy};
use cafs_types::ContentKey;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

use crate::directory::StreamDescriptor;
use crate::error::{ChunkError, ChunkResult};
use crate::path::Pather;

/// What a single leaf task reports back: its index and key, or why it failed.
type LeafOutcome = ChunkResult<(u64, ContentKey)>;

/// Lifecycle of a writer. Transitions only move forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriterState {
    /// Accepting writes.
    Open,
    /// `flush` is draining leaf tasks.
    Flushing,
    /// `flush` succeeded; only `close` is valid.
    Flushed,
    /// `flush` failed; the writer is unusable.
    Failed,
    Closed,
}

/// Streaming writer that splits bytes into leaves and uploads them concurrently.
///
/// Every time the internal buffer reaches the leaf size the full leaf is
/// handed to its own task, which hashes it, checks the store for an existing
/// copy and uploads it if absent. At most `max_concurrent_uploads` such tasks
/// run at once; `write` waits for a free slot when the bound is reached.
///
/// Tasks finish in any order. Each one reports its leaf index alongside the
/// key, and [`flush`](Self::flush) places keys by index, so the leaf order
/// and root key never depend on scheduling.
pub struct ChunkWriter {
    store: Arc<dyn BlobStore>,
    hasher: TreeHasher,
    pather: Pather,
    leaf_size: usize,
    buf: BytesMut,
    next_index: u64,
    written: u64,
    admission: Arc<Semaphore>,
    tasks: JoinSet<LeafOutcome>,
    completed: Vec<(u64, ContentKey)>,
    first_error: Option<ChunkError>,
    state: WriterState,
}

impl ChunkWriter {
    pub fn new(
        store: Arc<dyn BlobStore>,
        leaf_size: u32,
        max_concurrent_uploads: usize,
        pather: Pather,
    ) -> ChunkResult<Self> {
        if leaf_size == 0 {
            return Err(ChunkError::InvalidConfig("leaf_size must be positive".into()));
        }
        if max_concurrent_uploads == 0 {
            return Err(ChunkError::InvalidConfig(
                "max_concurrent_uploads must be positive".into(),
            ));
        }
        Ok(Self {
            store,
            hasher: TreeHasher::new(leaf_size),
            pather,
            leaf_size: leaf_size as usize,
            buf: BytesMut::with_capacity(leaf_size as usize),
            next_index: 0,
            written: 0,
            admission: Arc::new(Semaphore::new(max_concurrent_uploads)),
            tasks: JoinSet::new(),
            completed: Vec::new(),
            first_error: None,
            state: WriterState::Open,
        })
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    /// Total bytes accepted by `write` so far.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Buffer `data`, dispatching an upload for every leaf it completes.
    ///
    /// Upload failures do not fail `write`; they are reported by `flush`.
    pub async fn write(&mut self, data: &[u8]) -> ChunkResult<usize> {
        if self.state != WriterState::Open {
            return Err(ChunkError::WriterFlushed);
        }
        let mut consumed = 0;
        while consumed < data.len() {
            let room = self.leaf_size - self.buf.len();
            let take = room.min(data.len() - consumed);
            self.buf.extend_from_slice(&data[consumed..consumed + take]);
            consumed += take;
            if self.buf.len() == self.leaf_size {
                self.dispatch_full_leaf().await?;
            }
        }
        self.written += data.len() as u64;
        Ok(data.len())
    }

    async fn dispatch_full_leaf(&mut self) -> ChunkResult<()> {
        let permit = Arc::clone(&self.admission)
            .acquire_owned()
            .await
            .map_err(|e| ChunkError::TaskFailed(e.to_string()))?;

        let index = self.next_index;
        self.next_index += 1;
        let leaf = std::mem::replace(&mut self.buf, BytesMut::with_capacity(self.leaf_size)).freeze();

        let store = Arc::clone(&self.store);
        let pather = Arc::clone(&self.pather);
        let hasher = self.hasher;
        self.tasks.spawn(async move {
            let _permit = permit;
            let key = upload_leaf(store.as_ref(), hasher, &pather, index, leaf, false).await?;
            Ok((index, key))
        });

        while let Some(joined) = self.tasks.try_join_next() {
            self.record(joined);
        }
        Ok(())
    }

    fn record(&mut self, joined: Result<LeafOutcome, JoinError>) {
        match joined {
            Ok(Ok(done)) => self.completed.push(done),
            Ok(Err(e)) => {
                if self.first_error.is_none() {
                    self.first_error = Some(e);
                }
            }
            Err(e) => {
                if self.first_error.is_none() {
                    self.first_error = Some(ChunkError::TaskFailed(e.to_string()));
                }
            }
        }
    }

    /// Finish the stream.
    ///
    /// Waits for every in-flight leaf upload. If any failed, the first
    /// recorded error is returned and the trailing leaf is not written.
    /// Otherwise the trailing partial buffer is uploaded as the last leaf (an
    /// empty stream still produces one zero-length leaf) and the root key is
    /// computed over the ordered leaf keys.
    ///
    /// Valid exactly once.
    pub async fn flush(&mut self) -> ChunkResult<StreamDescriptor> {
        if self.state != WriterState::Open {
            return Err(ChunkError::WriterFlushed);
        }
        self.state = WriterState::Flushing;

        match self.finish().await {
            Ok(descriptor) => {
                self.state = WriterState::Flushed;
                info!(
                    root = %descriptor.root,
                    leaves = descriptor.leaf_count(),
                    bytes = self.written,
                    "flushed stream"
                );
                Ok(descriptor)
            }
            Err(e) => {
                self.state = WriterState::Failed;
                Err(e)
            }
        }
    }

    async fn finish(&mut self) -> ChunkResult<StreamDescriptor> {
        while let Some(joined) = self.tasks.join_next().await {
            self.record(joined);
        }
        if let Some(e) = self.first_error.take() {
            return Err(e);
        }

        let mut slots: Vec<Option<ContentKey>> = vec![None; self.next_index as usize];
        for (index, key) in self.completed.drain(..) {
            slots[index as usize] = Some(key);
        }
        let mut leaves = slots
            .into_iter()
            .enumerate()
            .map(|(index, key)| key.ok_or(ChunkError::MissingLeaf { index: index as u64 }))
            .collect::<ChunkResult<Vec<_>>>()?;

        if !self.buf.is_empty() || leaves.is_empty() {
            let index = self.next_index;
            let tail = std::mem::take(&mut self.buf).freeze();
            let key = upload_leaf(self.store.as_ref(), self.hasher, &self.pather, index, tail, true)
                .await?;
            self.next_index += 1;
            leaves.push(key);
        }

        let root = self.hasher.root(&leaves);
        Ok(StreamDescriptor { root, leaves })
    }

    /// Valid once, and only after a successful `flush`.
    pub fn close(&mut self) -> ChunkResult<()> {
        if self.state != WriterState::Flushed {
            return Err(ChunkError::ClosedWithoutFlush);
        }
        self.state = WriterState::Closed;
        Ok(())
    }
}

impl std::fmt::Debug for ChunkWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkWriter")
            .field("leaf_size", &self.leaf_size)
            .field("next_index", &self.next_index)
            .field("in_flight", &self.tasks.len())
            .field("state", &self.state)
            .finish()
    }
}

/// Hash one leaf and upload it unless the store already holds its key.
async fn upload_leaf(
    store: &dyn BlobStore,
    hasher: TreeHasher,
    pather: &Pather,
    index: u64,
    leaf: Bytes,
    is_last: bool,
) -> ChunkResult<ContentKey> {
    let key = hasher.leaf(index, &leaf, is_last);
    let path = pather(&key);

    let found = store
        .has(&path)
        .await
        .map_err(|source| ChunkError::Upload {
            index,
            path: path.clone(),
            source,
        })?;
    if found {
        debug!(key = %key, index, bytes = leaf.len(), "duplicate leaf");
        return Ok(key);
    }

    let bytes = leaf.len();
    let result = match store.as_checksum_store() {
        Some(checked) => {
            let crc = cafs_crypto::crc32c(&leaf);
            checked
                .put_with_checksum(&path, leaf, WritePolicy::OverWrite, crc)
                .await
        }
        None => store.put(&path, leaf, WritePolicy::OverWrite).await,
    };
    if let Err(source) = result {
        warn!(key = %key, index, error = %source, "leaf upload failed");
        return Err(ChunkError::Upload {
            index,
            path,
            source,
        });
    }
    debug!(key = %key, index, bytes, "uploaded leaf");
    Ok(key)
}
