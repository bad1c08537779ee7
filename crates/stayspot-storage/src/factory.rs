#[cfg(feature = "storage-local")]
use crate::LocalBlobStore;
#[cfg(feature = "storage-memory")]
use crate::MemoryBlobStore;
use crate::{BlobStore, StorageBackend, StorageError, StorageResult};
use stayspot_core::Config;
use std::sync::Arc;

/// Create the blob store selected by configuration.
///
/// Called once at startup; the returned handle is shared by every consumer and closed
/// at shutdown.
pub async fn create_blob_store(config: &Config) -> StorageResult<Arc<dyn BlobStore>> {
    let chunk_size = config.chunk_size_bytes();

    match config.storage_backend() {
        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let root = config.local_storage_path().ok_or_else(|| {
                StorageError::ConfigError("LOCAL_STORAGE_PATH not configured".to_string())
            })?;

            let store = LocalBlobStore::open(root, chunk_size).await?;
            Ok(Arc::new(store))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-memory")]
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory blob store; uploads are lost on restart");
            Ok(Arc::new(MemoryBlobStore::new(chunk_size)?))
        }

        #[cfg(not(feature = "storage-memory"))]
        StorageBackend::Memory => Err(StorageError::ConfigError(
            "Memory storage backend not available (storage-memory feature not enabled)".to_string(),
        )),
    }
}
