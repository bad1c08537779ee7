//! Blob storage abstraction
//!
//! This module defines the [`BlobStore`] trait every backend implements, together with
//! the upload writer and download types that flow through it.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use stayspot_core::{AppError, BlobDescriptor, Metadata, StorageBackend};
use std::pin::Pin;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Blob already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid blob name: {0}")]
    InvalidName(String),

    #[error("Upload size mismatch: expected {expected} bytes, received {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("Blob store is closed")]
    Closed,

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(name) => AppError::NotFound(format!("File not found: {}", name)),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// Stream of blob content, one stored chunk per item.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Declaration of a blob about to be uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBlob {
    pub content_type: String,
    pub original_filename: Option<String>,
    /// Caller-assigned name; the store generates one when absent.
    pub name: Option<String>,
    /// When set, commit fails unless exactly this many bytes were written.
    pub expected_size: Option<u64>,
}

impl NewBlob {
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            original_filename: None,
            name: None,
            expected_size: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_original_filename(mut self, filename: impl Into<String>) -> Self {
        self.original_filename = Some(filename.into());
        self
    }

    pub fn with_expected_size(mut self, size: u64) -> Self {
        self.expected_size = Some(size);
        self
    }
}

/// An opened download: the metadata snapshot and the stream serving it.
pub struct BlobDownload {
    pub metadata: Metadata,
    pub stream: ByteStream,
}

impl std::fmt::Debug for BlobDownload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobDownload")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// Write half of an in-progress upload.
///
/// Nothing written is visible to readers until [`BlobWriter::commit`] succeeds. Dropping a
/// writer without committing discards everything staged so far.
#[async_trait]
pub trait BlobWriter: Send {
    /// Name the blob will be committed under.
    fn name(&self) -> &str;

    /// Bytes accepted so far.
    fn bytes_written(&self) -> u64;

    /// Append bytes to the upload.
    async fn write(&mut self, data: Bytes) -> StorageResult<()>;

    /// Make the blob visible under its name and return its descriptor.
    async fn commit(self: Box<Self>) -> StorageResult<BlobDescriptor>;

    /// Discard the upload.
    async fn abort(self: Box<Self>) -> StorageResult<()>;
}

/// Chunked blob storage
///
/// All backends (local filesystem, memory) implement this trait. The store owns its
/// backend handle for the whole process lifetime: it is built once at startup and
/// [`BlobStore::close`]d once at shutdown.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Start an upload. Fails early with `InvalidName`/`AlreadyExists` for bad caller names.
    async fn begin_upload(&self, blob: NewBlob) -> StorageResult<Box<dyn BlobWriter>>;

    /// Open a committed blob for reading.
    ///
    /// The returned stream keeps serving the bytes that existed when it was opened, even if
    /// the blob is deleted before the stream is drained.
    async fn open_download(&self, name: &str) -> StorageResult<BlobDownload>;

    /// Look up metadata of a committed blob.
    async fn find(&self, name: &str) -> StorageResult<Option<Metadata>>;

    /// Delete a committed blob and all of its chunks.
    async fn delete(&self, name: &str) -> StorageResult<()>;

    /// Release the backend. Every later operation fails with `Closed`.
    async fn close(&self) -> StorageResult<()>;

    /// Whether [`BlobStore::close`] has been called.
    fn is_closed(&self) -> bool;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;

    /// Size of the fixed chunks blobs are stored in.
    fn chunk_size(&self) -> usize;
}
