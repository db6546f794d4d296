use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use cafs_store::{BlobReader, BlobStore, StoreResult};
use cafs_types::ContentKey;
use tokio::io::{AsyncRead, ReadBuf};

use crate::error::ChunkError;
use crate::path::Pather;

type OpenFuture = Pin<Box<dyn Future<Output = StoreResult<BlobReader>> + Send>>;

enum ReadState {
    /// No leaf open; the next poll opens `leaves[idx]`.
    Idle,
    Opening(OpenFuture),
    Reading(BlobReader),
    Done,
    Failed(Arc<ChunkError>),
}

/// Single-pass reader that rebuilds a stream from its ordered leaf keys.
///
/// Leaves are opened lazily, one at a time, and each handle is released as
/// soon as its leaf is exhausted. A read that fills the caller's buffer
/// exactly at the end of the final leaf returns the full count; end of data
/// is reported by the following read.
///
/// Store failures abort the stream: the error is returned (after any bytes
/// already copied into the caller's buffer) and every later read fails with
/// the same error. Nothing is retried.
pub struct ChunkReader {
    store: Arc<dyn BlobStore>,
    root: ContentKey,
    leaves: Vec<ContentKey>,
    leaf_size: u32,
    pather: Pather,
    idx: usize,
    leaf_read: u64,
    state: ReadState,
}

impl ChunkReader {
    pub fn new(
        store: Arc<dyn BlobStore>,
        root: ContentKey,
        leaves: Vec<ContentKey>,
        leaf_size: u32,
        pather: Pather,
    ) -> Self {
        Self {
            store,
            root,
            leaves,
            leaf_size,
            pather,
            idx: 0,
            leaf_read: 0,
            state: ReadState::Idle,
        }
    }

    /// The root key of the stream being read.
    pub fn root(&self) -> &ContentKey {
        &self.root
    }

    pub fn leaves(&self) -> &[ContentKey] {
        &self.leaves
    }

    /// Release the open leaf handle, if any. Later reads report end of data.
    pub fn close(&mut self) {
        if !matches!(self.state, ReadState::Failed(_)) {
            self.state = ReadState::Done;
        }
    }

    fn fail(&mut self, err: ChunkError) -> io::Error {
        let err = Arc::new(err);
        self.state = ReadState::Failed(Arc::clone(&err));
        io::Error::other(err)
    }

    fn fetch_error(&mut self, source: cafs_store::StoreError) -> io::Error {
        let path = (self.pather)(&self.leaves[self.idx]);
        self.fail(ChunkError::Fetch { path, source })
    }
}

impl AsyncRead for ChunkReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let start = buf.filled().len();
        // Hand back what is already copied rather than parking on the next leaf.
        let partial = |buf: &ReadBuf<'_>| -> Poll<io::Result<()>> {
            if buf.filled().len() > start {
                Poll::Ready(Ok(()))
            } else {
                Poll::Pending
            }
        };

        loop {
            if let ReadState::Failed(err) = &this.state {
                if buf.filled().len() > start {
                    return Poll::Ready(Ok(()));
                }
                return Poll::Ready(Err(io::Error::other(Arc::clone(err))));
            }
            if buf.remaining() == 0 {
                return Poll::Ready(Ok(()));
            }

            match &mut this.state {
                ReadState::Done | ReadState::Failed(_) => return Poll::Ready(Ok(())),
                ReadState::Idle => {
                    if this.idx >= this.leaves.len() {
                        this.state = ReadState::Done;
                        continue;
                    }
                    let path = (this.pather)(&this.leaves[this.idx]);
                    let store = Arc::clone(&this.store);
                    this.leaf_read = 0;
                    this.state = ReadState::Opening(Box::pin(async move { store.get(&path).await }));
                }
                ReadState::Opening(fut) => match fut.as_mut().poll(cx) {
                    Poll::Pending => return partial(buf),
                    Poll::Ready(Ok(reader)) => this.state = ReadState::Reading(reader),
                    Poll::Ready(Err(source)) => {
                        let err = this.fetch_error(source);
                        if buf.filled().len() > start {
                            return Poll::Ready(Ok(()));
                        }
                        return Poll::Ready(Err(err));
                    }
                },
                ReadState::Reading(reader) => {
                    let before = buf.filled().len();
                    match Pin::new(reader).poll_read(cx, buf) {
                        Poll::Pending => return partial(buf),
                        Poll::Ready(Ok(())) => {
                            let n = (buf.filled().len() - before) as u64;
                            if n == 0 {
                                // Leaf exhausted: drop its handle and move on.
                                this.state = ReadState::Idle;
                                this.idx += 1;
                                continue;
                            }
                            this.leaf_read += n;
                            if this.leaf_read > u64::from(this.leaf_size) {
                                // An errored poll must leave the buffer as it found it.
                                buf.set_filled(before);
                                let err = this.fail(ChunkError::OversizedLeaf {
                                    index: this.idx,
                                    leaf_size: this.leaf_size,
                                });
                                if buf.filled().len() > start {
                                    return Poll::Ready(Ok(()));
                                }
                                return Poll::Ready(Err(err));
                            }
                        }
                        Poll::Ready(Err(e)) => {
                            let err = this.fetch_error(cafs_store::StoreError::Io(e));
                            if buf.filled().len() > start {
                                return Poll::Ready(Ok(()));
                            }
                            return Poll::Ready(Err(err));
                        }
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for ChunkReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkReader")
            .field("root", &self.root)
            .field("leaves", &self.leaves.len())
            .field("idx", &self.idx)
            .finish()
    }
}
