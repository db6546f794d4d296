//! Store doubles shared by the writer, reader and facade tests.

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use cafs_store::{
    BlobReader, BlobStore, ChecksumBlobStore, InMemoryBlobStore, StoreError, StoreResult,
    WritePolicy,
};
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

/// Wraps an in-memory store and counts the writes it receives.
pub struct CountingStore {
    inner: InMemoryBlobStore,
    checksum_capable: bool,
    put_delay: Option<Duration>,
    plain_puts: AtomicUsize,
    checksum_puts: AtomicUsize,
    gets: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    paths: Mutex<Vec<String>>,
}

impl CountingStore {
    pub fn new(checksum_capable: bool) -> Self {
        Self {
            inner: InMemoryBlobStore::new(),
            checksum_capable,
            put_delay: None,
            plain_puts: AtomicUsize::new(0),
            checksum_puts: AtomicUsize::new(0),
            gets: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            paths: Mutex::new(Vec::new()),
        }
    }

    pub fn with_put_delay(mut self, delay: Duration) -> Self {
        self.put_delay = Some(delay);
        self
    }

    pub fn inner(&self) -> &InMemoryBlobStore {
        &self.inner
    }

    pub fn puts(&self) -> usize {
        self.plain_puts() + self.checksum_puts()
    }

    pub fn plain_puts(&self) -> usize {
        self.plain_puts.load(Ordering::SeqCst)
    }

    pub fn checksum_puts(&self) -> usize {
        self.checksum_puts.load(Ordering::SeqCst)
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn put_paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }

    async fn track<F>(&self, key: &str, put: F) -> StoreResult<()>
    where
        F: std::future::Future<Output = StoreResult<()>>,
    {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.paths.lock().unwrap().push(key.to_string());
        if let Some(delay) = self.put_delay {
            tokio::time::sleep(delay).await;
        }
        let result = put.await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[async_trait]
impl BlobStore for CountingStore {
    async fn has(&self, key: &str) -> StoreResult<bool> {
        self.inner.has(key).await
    }

    async fn get(&self, key: &str) -> StoreResult<BlobReader> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, data: Bytes, policy: WritePolicy) -> StoreResult<()> {
        self.plain_puts.fetch_add(1, Ordering::SeqCst);
        self.track(key, self.inner.put(key, data, policy)).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.inner.delete(key).await
    }

    async fn keys(&self) -> StoreResult<Vec<String>> {
        self.inner.keys().await
    }

    fn as_checksum_store(&self) -> Option<&dyn ChecksumBlobStore> {
        if self.checksum_capable {
            Some(self)
        } else {
            None
        }
    }
}

#[async_trait]
impl ChecksumBlobStore for CountingStore {
    async fn put_with_checksum(
        &self,
        key: &str,
        data: Bytes,
        policy: WritePolicy,
        crc32c: u32,
    ) -> StoreResult<()> {
        self.checksum_puts.fetch_add(1, Ordering::SeqCst);
        self.track(key, self.inner.put_with_checksum(key, data, policy, crc32c))
            .await
    }
}

/// Holds back the first put it receives so later leaves finish before it.
pub struct SlowFirstLeafStore {
    inner: InMemoryBlobStore,
    delay: Duration,
    first_taken: AtomicBool,
    finished: Mutex<Vec<bool>>,
}

impl SlowFirstLeafStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: InMemoryBlobStore::new(),
            delay,
            first_taken: AtomicBool::new(false),
            finished: Mutex::new(Vec::new()),
        }
    }

    /// True when the held-back put completed after every other put.
    pub fn delayed_put_finished_last(&self) -> bool {
        let finished = self.finished.lock().unwrap();
        finished.len() > 1 && finished.last() == Some(&true)
    }
}

#[async_trait]
impl BlobStore for SlowFirstLeafStore {
    async fn has(&self, key: &str) -> StoreResult<bool> {
        self.inner.has(key).await
    }

    async fn get(&self, key: &str) -> StoreResult<BlobReader> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, data: Bytes, policy: WritePolicy) -> StoreResult<()> {
        let delayed = !self.first_taken.swap(true, Ordering::SeqCst);
        if delayed {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.put(key, data, policy).await?;
        self.finished.lock().unwrap().push(delayed);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.inner.delete(key).await
    }

    async fn keys(&self) -> StoreResult<Vec<String>> {
        self.inner.keys().await
    }
}

/// Every existence check misses and every read or write fails.
pub struct FailingStore;

#[async_trait]
impl BlobStore for FailingStore {
    async fn has(&self, _key: &str) -> StoreResult<bool> {
        Ok(false)
    }

    async fn get(&self, key: &str) -> StoreResult<BlobReader> {
        Err(StoreError::Unavailable(format!("get {key}")))
    }

    async fn put(&self, key: &str, _data: Bytes, _policy: WritePolicy) -> StoreResult<()> {
        Err(StoreError::Unavailable(format!("put {key}")))
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        Err(StoreError::Unavailable(format!("delete {key}")))
    }

    async fn keys(&self) -> StoreResult<Vec<String>> {
        Err(StoreError::Unavailable("keys".into()))
    }
}

/// Existence checks fail; writes and reads go to an in-memory store.
pub struct UnreachableIndexStore {
    inner: InMemoryBlobStore,
}

impl UnreachableIndexStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryBlobStore::new(),
        }
    }

    pub fn inner(&self) -> &InMemoryBlobStore {
        &self.inner
    }
}

#[async_trait]
impl BlobStore for UnreachableIndexStore {
    async fn has(&self, key: &str) -> StoreResult<bool> {
        Err(StoreError::Unavailable(format!("has {key}")))
    }

    async fn get(&self, key: &str) -> StoreResult<BlobReader> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, data: Bytes, policy: WritePolicy) -> StoreResult<()> {
        self.inner.put(key, data, policy).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.inner.delete(key).await
    }

    async fn keys(&self) -> StoreResult<Vec<String>> {
        self.inner.keys().await
    }
}

/// Reader that fails every poll.
struct ResetReader;

impl AsyncRead for ResetReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "connection reset mid-blob",
        )))
    }
}

/// Serves only the first `cut_after` bytes of each blob, then fails the read.
pub struct TruncatingStore {
    inner: InMemoryBlobStore,
    cut_after: usize,
}

impl TruncatingStore {
    pub fn new(cut_after: usize) -> Self {
        Self {
            inner: InMemoryBlobStore::new(),
            cut_after,
        }
    }
}

#[async_trait]
impl BlobStore for TruncatingStore {
    async fn has(&self, key: &str) -> StoreResult<bool> {
        self.inner.has(key).await
    }

    async fn get(&self, key: &str) -> StoreResult<BlobReader> {
        let mut data = self.inner.read_all(key).await?;
        data.truncate(self.cut_after);
        Ok(Box::new(io::Cursor::new(data).chain(ResetReader)))
    }

    async fn put(&self, key: &str, data: Bytes, policy: WritePolicy) -> StoreResult<()> {
        self.inner.put(key, data, policy).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.inner.delete(key).await
    }

    async fn keys(&self) -> StoreResult<Vec<String>> {
        self.inner.keys().await
    }
}
