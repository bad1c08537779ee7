//! Failure-injecting blob store.

use async_trait::async_trait;
use stayspot_core::Metadata;
use stayspot_storage::{
    BlobDownload, BlobStore, BlobWriter, NewBlob, StorageBackend, StorageError,
    StorageResult,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Wraps a store and fails selected operations on demand.
pub struct FaultyStore {
    inner: Arc<dyn BlobStore>,
    pub fail_deletes: AtomicBool,
    /// Makes `open_download` report the blob as gone, as if deleted right after `find`.
    pub vanish_on_open: AtomicBool,
    pub delete_calls: AtomicUsize,
}

impl FaultyStore {
    pub fn new(inner: Arc<dyn BlobStore>) -> Self {
        Self {
            inner,
            fail_deletes: AtomicBool::new(false),
            vanish_on_open: AtomicBool::new(false),
            delete_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl BlobStore for FaultyStore {
    async fn begin_upload(&self, blob: NewBlob) -> StorageResult<Box<dyn BlobWriter>> {
        self.inner.begin_upload(blob).await
    }

    async fn open_download(&self, name: &str) -> StorageResult<BlobDownload> {
        if self.vanish_on_open.load(Ordering::SeqCst) {
            return Err(StorageError::NotFound(name.to_string()));
        }
        self.inner.open_download(name).await
    }

    async fn find(&self, name: &str) -> StorageResult<Option<Metadata>> {
        self.inner.find(name).await
    }

    async fn delete(&self, name: &str) -> StorageResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("injected delete failure".to_string()));
        }
        self.inner.delete(name).await
    }

    async fn close(&self) -> StorageResult<()> {
        self.inner.close().await
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    fn backend_type(&self) -> StorageBackend {
        self.inner.backend_type()
    }

    fn chunk_size(&self) -> usize {
        self.inner.chunk_size()
    }
}
