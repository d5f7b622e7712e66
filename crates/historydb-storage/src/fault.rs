//! Fault-Injecting Object Store
//!
//! Wraps a replica and fails requests on demand, so quorum and failover
//! behaviour can be exercised against real `object_store` semantics.
//!
//! ```ignore
//! let faulty = Arc::new(FaultyObjectStore::new(Arc::new(InMemory::new())));
//! let substrate = ReplicatedObjectStore::new()
//!     .with_replica(1, Arc::new(InMemory::new()))
//!     .with_replica(2, faulty.clone());
//!
//! faulty.set_offline(true);   // group 2 stops answering
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use object_store::{
    path::Path, GetOptions, GetResult, ListResult, MultipartId, ObjectMeta, ObjectStore,
    PutOptions, PutResult, Result,
};
use std::fmt::{Debug, Display, Formatter};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::AsyncWrite;

const STORE_NAME: &str = "FaultyObjectStore";

pub struct FaultyObjectStore {
    inner: Arc<dyn ObjectStore>,
    offline: AtomicBool,
    reject_writes: AtomicBool,
    injected: AtomicU64,
}

impl FaultyObjectStore {
    pub fn new(inner: Arc<dyn ObjectStore>) -> Self {
        Self {
            inner,
            offline: AtomicBool::new(false),
            reject_writes: AtomicBool::new(false),
            injected: AtomicU64::new(0),
        }
    }

    /// Fail every request.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Fail writes while reads keep working.
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Number of requests failed so far.
    pub fn injected_faults(&self) -> u64 {
        self.injected.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &Arc<dyn ObjectStore> {
        &self.inner
    }

    fn check_read(&self, location: &Path) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(self.fault(location, "replica offline"));
        }
        Ok(())
    }

    fn check_write(&self, location: &Path) -> Result<()> {
        self.check_read(location)?;
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(self.fault(location, "replica rejects writes"));
        }
        Ok(())
    }

    fn fault(&self, location: &Path, reason: &str) -> object_store::Error {
        self.injected.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(object = %location, reason, "Injected replica fault");
        object_store::Error::Generic {
            store: STORE_NAME,
            source: format!("{}: {}", reason, location).into(),
        }
    }
}

impl Debug for FaultyObjectStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaultyObjectStore")
            .field("offline", &self.offline.load(Ordering::SeqCst))
            .field("reject_writes", &self.reject_writes.load(Ordering::SeqCst))
            .field("inner", &self.inner)
            .finish()
    }
}

impl Display for FaultyObjectStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "FaultyObjectStore({})", self.inner)
    }
}

#[async_trait]
impl ObjectStore for FaultyObjectStore {
    async fn put(&self, location: &Path, bytes: Bytes) -> Result<PutResult> {
        self.check_write(location)?;
        self.inner.put(location, bytes).await
    }

    async fn put_opts(&self, location: &Path, bytes: Bytes, opts: PutOptions) -> Result<PutResult> {
        self.check_write(location)?;
        self.inner.put_opts(location, bytes, opts).await
    }

    async fn put_multipart(
        &self,
        location: &Path,
    ) -> Result<(MultipartId, Box<dyn AsyncWrite + Unpin + Send>)> {
        self.check_write(location)?;
        self.inner.put_multipart(location).await
    }

    async fn abort_multipart(&self, location: &Path, multipart_id: &MultipartId) -> Result<()> {
        self.check_write(location)?;
        self.inner.abort_multipart(location, multipart_id).await
    }

    async fn get_opts(&self, location: &Path, options: GetOptions) -> Result<GetResult> {
        self.check_read(location)?;
        self.inner.get_opts(location, options).await
    }

    async fn head(&self, location: &Path) -> Result<ObjectMeta> {
        self.check_read(location)?;
        self.inner.head(location).await
    }

    async fn delete(&self, location: &Path) -> Result<()> {
        self.check_write(location)?;
        self.inner.delete(location).await
    }

    fn list(&self, prefix: Option<&Path>) -> BoxStream<'_, Result<ObjectMeta>> {
        let root = Path::default();
        match self.check_read(prefix.unwrap_or(&root)) {
            Ok(()) => self.inner.list(prefix),
            Err(e) => stream::once(async move { Err(e) }).boxed(),
        }
    }

    async fn list_with_delimiter(&self, prefix: Option<&Path>) -> Result<ListResult> {
        let root = Path::default();
        self.check_read(prefix.unwrap_or(&root))?;
        self.inner.list_with_delimiter(prefix).await
    }

    async fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        self.check_write(to)?;
        self.inner.copy(from, to).await
    }

    async fn copy_if_not_exists(&self, from: &Path, to: &Path) -> Result<()> {
        self.check_write(to)?;
        self.inner.copy_if_not_exists(from, to).await
    }
}
