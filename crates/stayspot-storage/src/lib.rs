//! StaySpot Storage Library
//!
//! Chunked binary storage behind the [`BlobStore`] trait. Blobs are written through a
//! [`BlobWriter`] that only becomes visible on commit, read back as byte streams, and
//! deleted by name.
//!
//! # Blob names
//!
//! Store-assigned names are `{uuid}.{ext}`. Caller-assigned names must be 1-255
//! characters of `[A-Za-z0-9._-]`, must not start with `.` and must not contain `..`.
//! Name rules live in the `keys` module so every backend agrees on them.

pub(crate) mod chunking;
pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-memory")]
pub mod memory;
pub mod traits;
pub mod upload;

// Re-export commonly used types
pub use factory::create_blob_store;
#[cfg(feature = "storage-local")]
pub use local::LocalBlobStore;
#[cfg(feature = "storage-memory")]
pub use memory::MemoryBlobStore;
pub use stayspot_core::StorageBackend;
pub use traits::{
    BlobDownload, BlobStore, BlobWriter, ByteStream, NewBlob, StorageError, StorageResult,
};
pub use upload::{upload_bytes, upload_stream};
