use crate::chunking::Chunker;
use crate::keys::{is_valid_blob_name, resolve_blob_name};
use crate::traits::{
    BlobDownload, BlobStore, BlobWriter, ByteStream, NewBlob, StorageError, StorageResult,
};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use stayspot_core::{BlobDescriptor, Metadata};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use uuid::Uuid;

const BLOBS_DIR: &str = "blobs";
const STAGING_DIR: &str = "staging";
const TRASH_DIR: &str = "trash";
const META_FILE: &str = "meta.json";
const DATA_FILE: &str = "data";

/// On-disk record written next to a blob's data file.
#[derive(Debug, Serialize, Deserialize)]
struct BlobRecord {
    #[serde(flatten)]
    metadata: Metadata,
    chunk_size: usize,
    /// Start of each chunk in the data file.
    chunk_offsets: Vec<u64>,
}

impl BlobRecord {
    /// Length of every chunk, in order.
    fn chunk_lengths(&self, name: &str) -> StorageResult<Vec<usize>> {
        let corrupt = || StorageError::Backend(format!("Corrupt chunk table for blob {}", name));

        match self.chunk_offsets.first() {
            Some(&0) => {}
            None if self.metadata.size_bytes == 0 => {}
            _ => return Err(corrupt()),
        }

        let ends = self
            .chunk_offsets
            .iter()
            .skip(1)
            .copied()
            .chain(std::iter::once(self.metadata.size_bytes));

        self.chunk_offsets
            .iter()
            .copied()
            .zip(ends)
            .map(|(start, end)| {
                end.checked_sub(start)
                    .and_then(|len| usize::try_from(len).ok())
                    .filter(|len| *len <= self.chunk_size)
                    .ok_or_else(corrupt)
            })
            .collect()
    }
}

/// Local filesystem blob store
///
/// Layout under the root directory:
///
/// ```text
/// staging/{upload-id}/data     uploads in progress
/// blobs/{name}/meta.json       committed blobs: metadata and chunk offsets
/// blobs/{name}/data            chunks stored back to back
/// trash/{id}/                  blobs being deleted
/// ```
///
/// A blob becomes visible by renaming its staging directory into `blobs/`, and disappears
/// by renaming it into `trash/`. A download holds one handle on the data file, so a delete
/// after open does not affect the bytes served.
#[derive(Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    chunk_size: usize,
    closed: Arc<AtomicBool>,
}

impl LocalBlobStore {
    /// Open (or create) a store rooted at `root`.
    ///
    /// Leftover staging and trash directories from a previous process are removed.
    pub async fn open(root: impl Into<PathBuf>, chunk_size: usize) -> StorageResult<Self> {
        let root = root.into();
        if chunk_size == 0 {
            return Err(StorageError::ConfigError(
                "Chunk size must be greater than 0".to_string(),
            ));
        }

        for dir in [BLOBS_DIR, STAGING_DIR, TRASH_DIR] {
            fs::create_dir_all(root.join(dir)).await.map_err(|e| {
                StorageError::ConfigError(format!(
                    "Failed to create storage directory {}: {}",
                    root.join(dir).display(),
                    e
                ))
            })?;
        }

        let store = Self {
            root,
            chunk_size,
            closed: Arc::new(AtomicBool::new(false)),
        };

        let removed = store.clean_stale().await?;
        if removed > 0 {
            tracing::info!(removed = removed, "Removed stale staging directories");
        }

        tracing::info!(
            root = %store.root.display(),
            chunk_size = chunk_size,
            "Local blob store opened"
        );

        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn clean_stale(&self) -> StorageResult<usize> {
        let mut removed = 0;
        for dir in [STAGING_DIR, TRASH_DIR] {
            let mut entries = fs::read_dir(self.root.join(dir)).await?;
            while let Some(entry) = entries.next_entry().await? {
                match fs::remove_dir_all(entry.path()).await {
                    Ok(()) => removed += 1,
                    Err(e) => tracing::warn!(
                        path = %entry.path().display(),
                        error = %e,
                        "Failed to remove stale storage directory"
                    ),
                }
            }
        }
        Ok(removed)
    }

    /// Directory of a committed blob, or `None` for names that can never exist.
    fn blob_dir(&self, name: &str) -> Option<PathBuf> {
        is_valid_blob_name(name).then(|| self.root.join(BLOBS_DIR).join(name))
    }

    fn ensure_open(&self) -> StorageResult<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(StorageError::Closed)
        } else {
            Ok(())
        }
    }

    async fn read_record(dir: &Path, name: &str) -> StorageResult<BlobRecord> {
        let raw = match fs::read(dir.join(META_FILE)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(name.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&raw).map_err(|e| {
            StorageError::Backend(format!("Corrupt metadata for blob {}: {}", name, e))
        })
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn begin_upload(&self, blob: NewBlob) -> StorageResult<Box<dyn BlobWriter>> {
        self.ensure_open()?;
        let name = resolve_blob_name(blob.name.as_deref(), &blob.content_type)?;
        let target = self.root.join(BLOBS_DIR).join(&name);

        if blob.name.is_some() && fs::try_exists(&target).await? {
            return Err(StorageError::AlreadyExists(name));
        }

        let staging = self
            .root
            .join(STAGING_DIR)
            .join(Uuid::new_v4().simple().to_string());
        fs::create_dir_all(&staging).await?;
        let data = match fs::File::create(staging.join(DATA_FILE)).await {
            Ok(data) => data,
            Err(e) => {
                let _ = fs::remove_dir_all(&staging).await;
                return Err(e.into());
            }
        };

        Ok(Box::new(LocalBlobWriter {
            name,
            blob,
            chunker: Chunker::new(self.chunk_size),
            data: Some(data),
            chunk_offsets: Vec::new(),
            written: 0,
            staging,
            target,
            started: std::time::Instant::now(),
            finished: false,
            closed: self.closed.clone(),
        }))
    }

    async fn open_download(&self, name: &str) -> StorageResult<BlobDownload> {
        self.ensure_open()?;
        let dir = self
            .blob_dir(name)
            .ok_or_else(|| StorageError::NotFound(name.to_string()))?;
        let record = Self::read_record(&dir, name).await?;
        let lengths = record.chunk_lengths(name)?;

        let file = match fs::File::open(dir.join(DATA_FILE)).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(name.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(
            name = %name,
            size_bytes = record.metadata.size_bytes,
            chunks = lengths.len(),
            "Local storage download opened"
        );

        let stream: ByteStream = Box::pin(futures::stream::try_unfold(
            (file, lengths.into_iter()),
            |(mut file, mut lengths)| async move {
                let Some(length) = lengths.next() else {
                    return Ok(None);
                };
                let mut buf = vec![0u8; length];
                file.read_exact(&mut buf).await?;
                Ok::<_, StorageError>(Some((Bytes::from(buf), (file, lengths))))
            },
        ));

        Ok(BlobDownload {
            metadata: record.metadata,
            stream,
        })
    }

    async fn find(&self, name: &str) -> StorageResult<Option<Metadata>> {
        self.ensure_open()?;
        let Some(dir) = self.blob_dir(name) else {
            return Ok(None);
        };

        match Self::read_record(&dir, name).await {
            Ok(record) => Ok(Some(record.metadata)),
            Err(StorageError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn delete(&self, name: &str) -> StorageResult<()> {
        self.ensure_open()?;
        let dir = self
            .blob_dir(name)
            .ok_or_else(|| StorageError::NotFound(name.to_string()))?;
        let start = std::time::Instant::now();

        let trash = self
            .root
            .join(TRASH_DIR)
            .join(Uuid::new_v4().simple().to_string());

        match fs::rename(&dir, &trash).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(name.to_string()))
            }
            Err(e) => return Err(e.into()),
        }

        // The blob is gone once renamed; leftover trash is swept on next open.
        if let Err(e) = fs::remove_dir_all(&trash).await {
            tracing::warn!(
                name = %name,
                path = %trash.display(),
                error = %e,
                "Failed to remove deleted blob chunks"
            );
        }

        tracing::info!(
            name = %name,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    async fn close(&self) -> StorageResult<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::info!(root = %self.root.display(), "Local blob store closed");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

struct LocalBlobWriter {
    name: String,
    blob: NewBlob,
    chunker: Chunker,
    data: Option<fs::File>,
    chunk_offsets: Vec<u64>,
    written: u64,
    staging: PathBuf,
    target: PathBuf,
    started: std::time::Instant,
    finished: bool,
    closed: Arc<AtomicBool>,
}

impl LocalBlobWriter {
    async fn write_chunk(&mut self, chunk: Bytes) -> StorageResult<()> {
        let offset = self
            .chunk_offsets
            .last()
            .map_or(0, |last| last + self.chunker.chunk_size() as u64);
        let data = self
            .data
            .as_mut()
            .ok_or_else(|| StorageError::Backend("Upload data file already closed".to_string()))?;
        data.write_all(&chunk).await?;
        self.chunk_offsets.push(offset);
        Ok(())
    }

    async fn discard(&mut self) -> StorageResult<()> {
        self.finished = true;
        self.data = None;
        match fs::remove_dir_all(&self.staging).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn publish(&mut self) -> StorageResult<Metadata> {
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
            self.write_chunk(tail).await?;
        }
        if let Some(mut data) = self.data.take() {
            data.flush().await?;
            data.sync_all().await?;
        }

        let record = BlobRecord {
            metadata: Metadata {
                content_type: self.blob.content_type.clone(),
                size_bytes: self.written,
                uploaded_at: Utc::now(),
                original_filename: self.blob.original_filename.clone(),
            },
            chunk_size: self.chunker.chunk_size(),
            chunk_offsets: std::mem::take(&mut self.chunk_offsets),
        };

        let json = serde_json::to_vec(&record)
            .map_err(|e| StorageError::Backend(format!("Failed to encode metadata: {}", e)))?;
        let mut meta = fs::File::create(self.staging.join(META_FILE)).await?;
        meta.write_all(&json).await?;
        meta.sync_all().await?;

        if fs::try_exists(&self.target).await? {
            return Err(StorageError::AlreadyExists(self.name.clone()));
        }

        if let Err(e) = fs::rename(&self.staging, &self.target).await {
            if fs::try_exists(&self.target).await.unwrap_or(false) {
                return Err(StorageError::AlreadyExists(self.name.clone()));
            }
            return Err(e.into());
        }
        self.finished = true;

        Ok(record.metadata)
    }
}

#[async_trait]
impl BlobWriter for LocalBlobWriter {
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
        for chunk in self.chunker.push(&data) {
            self.write_chunk(chunk).await?;
        }
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> StorageResult<BlobDescriptor> {
        let metadata = match self.publish().await {
            Ok(metadata) => metadata,
            Err(e) => {
                if let Err(cleanup) = self.discard().await {
                    tracing::warn!(
                        name = %self.name,
                        error = %cleanup,
                        "Failed to remove staged chunks after failed commit"
                    );
                }
                return Err(e);
            }
        };

        tracing::info!(
            name = %self.name,
            size_bytes = self.written,
            chunks = self.written.div_ceil(self.chunker.chunk_size() as u64),
            duration_ms = self.started.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload committed"
        );

        Ok(BlobDescriptor {
            name: self.name.clone(),
            metadata,
        })
    }

    async fn abort(mut self: Box<Self>) -> StorageResult<()> {
        tracing::debug!(name = %self.name, "Local storage upload aborted");
        self.discard().await
    }
}

impl Drop for LocalBlobWriter {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        let staging = self.staging.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    let _ = fs::remove_dir_all(&staging).await;
                });
            }
            Err(_) => {
                let _ = std::fs::remove_dir_all(&staging);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::upload_bytes;
    use futures::StreamExt;
    use std::time::Duration;
    use tempfile::tempdir;

    async fn read_all(download: BlobDownload) -> Vec<u8> {
        let mut out = Vec::new();
        let mut stream = download.stream;
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }
        out
    }

    async fn dir_entries(path: &Path) -> usize {
        let mut entries = fs::read_dir(path).await.unwrap();
        let mut count = 0;
        while entries.next_entry().await.unwrap().is_some() {
            count += 1;
        }
        count
    }

    #[tokio::test]
    async fn test_local_upload_download() {
        let dir = tempdir().unwrap();
        let store = LocalBlobStore::open(dir.path(), 4).await.unwrap();

        let descriptor = upload_bytes(
            &store,
            NewBlob::new("image/jpeg").with_original_filename("beach.jpg"),
            Bytes::from_static(b"0123456789"),
        )
        .await
        .unwrap();

        assert!(descriptor.name.ends_with(".jpg"));
        let found = store.find(&descriptor.name).await.unwrap().unwrap();
        assert_eq!(found.size_bytes, 10);
        assert_eq!(found.content_type, "image/jpeg");
        assert_eq!(found.original_filename.as_deref(), Some("beach.jpg"));

        let download = store.open_download(&descriptor.name).await.unwrap();
        assert_eq!(read_all(download).await, b"0123456789");
        assert_eq!(dir_entries(&dir.path().join(STAGING_DIR)).await, 0);
    }

    #[tokio::test]
    async fn test_empty_blob() {
        let dir = tempdir().unwrap();
        let store = LocalBlobStore::open(dir.path(), 4).await.unwrap();

        let descriptor = upload_bytes(&store, NewBlob::new("image/png"), Bytes::new())
            .await
            .unwrap();
        let download = store.open_download(&descriptor.name).await.unwrap();
        assert_eq!(download.metadata.size_bytes, 0);
        assert!(read_all(download).await.is_empty());
    }

    #[tokio::test]
    async fn test_aborted_upload_leaves_nothing() {
        let dir = tempdir().unwrap();
        let store = LocalBlobStore::open(dir.path(), 4).await.unwrap();

        let mut writer = store
            .begin_upload(NewBlob::new("image/png").with_name("draft.png"))
            .await
            .unwrap();
        writer.write(Bytes::from_static(b"partial data")).await.unwrap();
        assert!(store.find("draft.png").await.unwrap().is_none());

        writer.abort().await.unwrap();
        assert!(store.find("draft.png").await.unwrap().is_none());
        assert_eq!(dir_entries(&dir.path().join(STAGING_DIR)).await, 0);
    }

    #[tokio::test]
    async fn test_dropped_writer_discards_staged_data() {
        let dir = tempdir().unwrap();
        let store = LocalBlobStore::open(dir.path(), 4).await.unwrap();
        let staging = dir.path().join(STAGING_DIR);

        let mut writer = store
            .begin_upload(NewBlob::new("image/png").with_name("cancelled.png"))
            .await
            .unwrap();
        writer.write(Bytes::from_static(b"0123456789")).await.unwrap();
        assert_eq!(dir_entries(&staging).await, 1);

        drop(writer);

        let mut remaining = dir_entries(&staging).await;
        for _ in 0..100 {
            if remaining == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            remaining = dir_entries(&staging).await;
        }
        assert_eq!(remaining, 0);
        assert!(store.find("cancelled.png").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_download_holds_one_file_per_blob() {
        let dir = tempdir().unwrap();
        let store = LocalBlobStore::open(dir.path(), 1).await.unwrap();

        let payload: Vec<u8> = (0..2000u32).map(|i| (i % 251) as u8).collect();
        let descriptor = upload_bytes(&store, NewBlob::new("image/png"), Bytes::from(payload.clone()))
            .await
            .unwrap();

        let blob_dir = dir.path().join(BLOBS_DIR).join(&descriptor.name);
        assert_eq!(dir_entries(&blob_dir).await, 2);
        assert!(blob_dir.join(DATA_FILE).exists());

        // One handle per download regardless of chunk count.
        let mut downloads = Vec::new();
        for _ in 0..64 {
            downloads.push(store.open_download(&descriptor.name).await.unwrap());
        }
        store.delete(&descriptor.name).await.unwrap();

        for download in downloads {
            let mut stream = download.stream;
            let mut chunks = 0;
            let mut out = Vec::new();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.unwrap();
                assert_eq!(chunk.len(), 1);
                out.extend_from_slice(&chunk);
                chunks += 1;
            }
            assert_eq!(chunks, 2000);
            assert_eq!(out, payload);
        }
    }

    #[tokio::test]
    async fn test_corrupt_chunk_table_is_backend_error() {
        let dir = tempdir().unwrap();
        let store = LocalBlobStore::open(dir.path(), 4).await.unwrap();
        let descriptor = upload_bytes(&store, NewBlob::new("image/png"), Bytes::from_static(b"0123456789"))
            .await
            .unwrap();

        let meta_path = dir.path().join(BLOBS_DIR).join(&descriptor.name).join(META_FILE);
        let mut record: BlobRecord =
            serde_json::from_slice(&std::fs::read(&meta_path).unwrap()).unwrap();
        assert_eq!(record.chunk_offsets, vec![0, 4, 8]);
        record.chunk_offsets = vec![0, 9, 4];
        std::fs::write(&meta_path, serde_json::to_vec(&record).unwrap()).unwrap();

        assert!(matches!(
            store.open_download(&descriptor.name).await,
            Err(StorageError::Backend(_))
        ));
    }

    #[tokio::test]
    async fn test_download_snapshot_after_delete() {
        let dir = tempdir().unwrap();
        let store = LocalBlobStore::open(dir.path(), 3).await.unwrap();

        let descriptor = upload_bytes(&store, NewBlob::new("image/webp"), Bytes::from_static(b"snapshot"))
            .await
            .unwrap();

        let download = store.open_download(&descriptor.name).await.unwrap();
        store.delete(&descriptor.name).await.unwrap();

        assert!(store.find(&descriptor.name).await.unwrap().is_none());
        assert_eq!(read_all(download).await, b"snapshot");
        assert!(matches!(
            store.delete(&descriptor.name).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_caller_name_conflict_and_validation() {
        let dir = tempdir().unwrap();
        let store = LocalBlobStore::open(dir.path(), 16).await.unwrap();

        upload_bytes(&store, NewBlob::new("image/png").with_name("logo.png"), Bytes::from_static(b"x"))
            .await
            .unwrap();

        let taken = store
            .begin_upload(NewBlob::new("image/png").with_name("logo.png"))
            .await;
        assert!(matches!(taken, Err(StorageError::AlreadyExists(_))));

        let invalid = store
            .begin_upload(NewBlob::new("image/png").with_name("../escape.png"))
            .await;
        assert!(matches!(invalid, Err(StorageError::InvalidName(_))));

        assert!(store.find("../../etc/passwd").await.unwrap().is_none());
        assert!(matches!(
            store.open_download("../../etc/passwd").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_commit_same_name() {
        let dir = tempdir().unwrap();
        let store = LocalBlobStore::open(dir.path(), 16).await.unwrap();

        let mut first = store
            .begin_upload(NewBlob::new("image/png").with_name("race.png"))
            .await
            .unwrap();
        let mut second = store
            .begin_upload(NewBlob::new("image/png").with_name("race.png"))
            .await
            .unwrap();
        first.write(Bytes::from_static(b"first")).await.unwrap();
        second.write(Bytes::from_static(b"second")).await.unwrap();

        first.commit().await.unwrap();
        assert!(matches!(
            second.commit().await,
            Err(StorageError::AlreadyExists(_))
        ));

        let download = store.open_download("race.png").await.unwrap();
        assert_eq!(read_all(download).await, b"first");
    }

    #[tokio::test]
    async fn test_size_mismatch_discards_upload() {
        let dir = tempdir().unwrap();
        let store = LocalBlobStore::open(dir.path(), 16).await.unwrap();

        let result = upload_bytes(
            &store,
            NewBlob::new("image/png").with_name("sized.png").with_expected_size(100),
            Bytes::from_static(b"tiny"),
        )
        .await;

        assert!(matches!(
            result,
            Err(StorageError::SizeMismatch { expected: 100, actual: 4 })
        ));
        assert!(store.find("sized.png").await.unwrap().is_none());
        assert_eq!(dir_entries(&dir.path().join(STAGING_DIR)).await, 0);
    }

    #[tokio::test]
    async fn test_reopen_sweeps_stale_staging() {
        let dir = tempdir().unwrap();
        let stale = dir.path().join(STAGING_DIR).join("crashed-upload");
        std::fs::create_dir_all(&stale).unwrap();
        std::fs::write(stale.join(DATA_FILE), b"junk").unwrap();

        let _store = LocalBlobStore::open(dir.path(), 16).await.unwrap();
        assert!(!stale.exists());
    }

    #[tokio::test]
    async fn test_committed_blobs_survive_reopen() {
        let dir = tempdir().unwrap();
        let name = {
            let store = LocalBlobStore::open(dir.path(), 4).await.unwrap();
            let descriptor = upload_bytes(&store, NewBlob::new("image/png"), Bytes::from_static(b"persisted"))
                .await
                .unwrap();
            store.close().await.unwrap();
            descriptor.name
        };

        let store = LocalBlobStore::open(dir.path(), 8).await.unwrap();
        let download = store.open_download(&name).await.unwrap();
        assert_eq!(read_all(download).await, b"persisted");
    }

    #[tokio::test]
    async fn test_closed_store() {
        let dir = tempdir().unwrap();
        let store = LocalBlobStore::open(dir.path(), 4).await.unwrap();
        store.close().await.unwrap();

        assert!(matches!(
            store.open_download("a.png").await,
            Err(StorageError::Closed)
        ));
        assert!(matches!(store.delete("a.png").await, Err(StorageError::Closed)));
    }
}
