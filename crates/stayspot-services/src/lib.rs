//! StaySpot Services Layer
//!
//! Business services on top of the blob store. [`MediaService`] validates image uploads,
//! stores them and moves owner references from old blobs to new ones; the reference
//! records themselves live behind [`MediaReferenceStore`]. Keep HTTP handling in
//! stayspot-api.

pub mod media;
pub mod references;

pub use media::{sanitize_filename, ImageUpload, MediaService, UploadPolicy};
pub use references::{InMemoryReferenceStore, MediaReferenceStore};
pub use stayspot_storage::{
    create_blob_store, BlobStore, LocalBlobStore, MemoryBlobStore, StorageBackend, StorageError,
    StorageResult,
};
