use crate::chunking::Chunker;
use crate::keys::{is_valid_blob_name, resolve_blob_name};
use crate::traits::{
    BlobDownload, BlobStore, BlobWriter, ByteStream, NewBlob, StorageError, StorageResult,
};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use stayspot_core::{BlobDescriptor, Metadata};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug)]
struct StoredBlob {
    metadata: Metadata,
    chunks: Vec<Bytes>,
}

type BlobMap = Arc<RwLock<HashMap<String, Arc<StoredBlob>>>>;

/// In-process blob store.
///
/// Committed blobs are shared behind `Arc`, so a download that already holds a blob keeps
/// streaming it after the name is deleted or the store is dropped.
#[derive(Clone)]
pub struct MemoryBlobStore {
    blobs: BlobMap,
    chunk_size: usize,
    closed: Arc<AtomicBool>,
}

impl MemoryBlobStore {
    pub fn new(chunk_size: usize) -> StorageResult<Self> {
        if chunk_size == 0 {
            return Err(StorageError::ConfigError(
                "Chunk size must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            blobs: Arc::new(RwLock::new(HashMap::new())),
            chunk_size,
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Number of committed blobs.
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }

    fn ensure_open(&self) -> StorageResult<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(StorageError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn begin_upload(&self, blob: NewBlob) -> StorageResult<Box<dyn BlobWriter>> {
        self.ensure_open()?;
        let name = resolve_blob_name(blob.name.as_deref(), &blob.content_type)?;

        if blob.name.is_some() && self.blobs.read().await.contains_key(&name) {
            return Err(StorageError::AlreadyExists(name));
        }

        Ok(Box::new(MemoryBlobWriter {
            name,
            blob,
            chunker: Chunker::new(self.chunk_size),
            chunks: Vec::new(),
            written: 0,
            blobs: self.blobs.clone(),
            closed: self.closed.clone(),
        }))
    }

    async fn open_download(&self, name: &str) -> StorageResult<BlobDownload> {
        self.ensure_open()?;
        let stored = self
            .blobs
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(name.to_string()))?;

        let chunks = stored.chunks.clone();
        let stream: ByteStream = Box::pin(futures::stream::iter(chunks.into_iter().map(Ok)));

        tracing::debug!(
            name = %name,
            size_bytes = stored.metadata.size_bytes,
            "Memory storage download opened"
        );

        Ok(BlobDownload {
            metadata: stored.metadata.clone(),
            stream,
        })
    }

    async fn find(&self, name: &str) -> StorageResult<Option<Metadata>> {
        self.ensure_open()?;
        Ok(self
            .blobs
            .read()
            .await
            .get(name)
            .map(|stored| stored.metadata.clone()))
    }

    async fn delete(&self, name: &str) -> StorageResult<()> {
        self.ensure_open()?;
        if !is_valid_blob_name(name) {
            return Err(StorageError::NotFound(name.to_string()));
        }

        match self.blobs.write().await.remove(name) {
            Some(_) => {
                tracing::info!(name = %name, "Memory storage delete successful");
                Ok(())
            }
            None => Err(StorageError::NotFound(name.to_string())),
        }
    }

    async fn close(&self) -> StorageResult<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::info!("Memory blob store closed");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

struct MemoryBlobWriter {
    name: String,
    blob: NewBlob,
    chunker: Chunker,
    chunks: Vec<Bytes>,
    written: u64,
    blobs: BlobMap,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl BlobWriter for MemoryBlobWriter {
    fn name(&self) -> &str {
        &self.name
    }

    fn bytes_written(&self) -> u64 {
        self.written
    }

    async fn write(&mut self, data: Bytes) -> StorageResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorageError::Closed);
        }
        self.written += data.len() as u64;
        let full = self.chunker.push(&data);
        self.chunks.extend(full);
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> StorageResult<BlobDescriptor> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorageError::Closed);
        }
        if let Some(expected) = self.blob.expected_size {
            if expected != self.written {
                return Err(StorageError::SizeMismatch {
                    expected,
                    actual: self.written,
                });
            }
        }

        if let Some(tail) = self.chunker.finish() {
            self.chunks.push(tail);
        }

        let metadata = Metadata {
            content_type: self.blob.content_type.clone(),
            size_bytes: self.written,
            uploaded_at: Utc::now(),
            original_filename: self.blob.original_filename.clone(),
        };

        let stored = Arc::new(StoredBlob {
            metadata: metadata.clone(),
            chunks: std::mem::take(&mut self.chunks),
        });

        {
            let mut blobs = self.blobs.write().await;
            if blobs.contains_key(&self.name) {
                return Err(StorageError::AlreadyExists(self.name.clone()));
            }
            blobs.insert(self.name.clone(), stored);
        }

        tracing::info!(
            name = %self.name,
            size_bytes = self.written,
            chunks = self.written.div_ceil(self.chunker_size()),
            "Memory storage upload committed"
        );

        Ok(BlobDescriptor {
            name: self.name.clone(),
            metadata,
        })
    }

    async fn abort(self: Box<Self>) -> StorageResult<()> {
        tracing::debug!(name = %self.name, "Memory storage upload aborted");
        Ok(())
    }
}

impl MemoryBlobWriter {
    fn chunker_size(&self) -> u64 {
        self.chunker.chunk_size() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::upload_bytes;
    use futures::StreamExt;

    async fn collect(download: BlobDownload) -> Vec<u8> {
        let mut out = Vec::new();
        let mut stream = download.stream;
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_memory_round_trip_in_chunks() {
        let store = MemoryBlobStore::new(4).unwrap();
        let descriptor = upload_bytes(&store, NewBlob::new("image/png"), Bytes::from_static(b"0123456789"))
            .await
            .unwrap();

        assert!(descriptor.name.ends_with(".png"));
        assert_eq!(descriptor.metadata.size_bytes, 10);

        let download = store.open_download(&descriptor.name).await.unwrap();
        let mut stream = download.stream;
        let mut sizes = Vec::new();
        while let Some(chunk) = stream.next().await {
            sizes.push(chunk.unwrap().len());
        }
        assert_eq!(sizes, vec![4, 4, 2]);
    }

    #[tokio::test]
    async fn test_uncommitted_upload_is_invisible() {
        let store = MemoryBlobStore::new(4).unwrap();
        let mut writer = store
            .begin_upload(NewBlob::new("image/png").with_name("pending.png"))
            .await
            .unwrap();
        writer.write(Bytes::from_static(b"abc")).await.unwrap();

        assert!(store.find("pending.png").await.unwrap().is_none());
        writer.abort().await.unwrap();
        assert!(store.find("pending.png").await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_open_download_survives_delete() {
        let store = MemoryBlobStore::new(2).unwrap();
        let descriptor = upload_bytes(&store, NewBlob::new("image/gif"), Bytes::from_static(b"hello"))
            .await
            .unwrap();

        let download = store.open_download(&descriptor.name).await.unwrap();
        store.delete(&descriptor.name).await.unwrap();

        assert_eq!(collect(download).await, b"hello");
        assert!(matches!(
            store.open_download(&descriptor.name).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_caller_name_taken() {
        let store = MemoryBlobStore::new(8).unwrap();
        upload_bytes(&store, NewBlob::new("image/png").with_name("a.png"), Bytes::from_static(b"1"))
            .await
            .unwrap();

        let result = store
            .begin_upload(NewBlob::new("image/png").with_name("a.png"))
            .await;
        assert!(matches!(result, Err(StorageError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_size_mismatch_creates_nothing() {
        let store = MemoryBlobStore::new(8).unwrap();
        let result = upload_bytes(
            &store,
            NewBlob::new("image/png").with_name("short.png").with_expected_size(10),
            Bytes::from_static(b"abc"),
        )
        .await;

        assert!(matches!(
            result,
            Err(StorageError::SizeMismatch { expected: 10, actual: 3 })
        ));
        assert!(store.find("short.png").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let store = MemoryBlobStore::new(8).unwrap();
        assert!(matches!(
            store.delete("missing.png").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_closed_store_rejects_operations() {
        let store = MemoryBlobStore::new(8).unwrap();
        store.close().await.unwrap();

        assert!(store.is_closed());
        assert!(matches!(store.find("a.png").await, Err(StorageError::Closed)));
        assert!(matches!(
            store.begin_upload(NewBlob::new("image/png")).await,
            Err(StorageError::Closed)
        ));
    }
}
