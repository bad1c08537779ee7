//! Storage setup and initialization

use anyhow::Result;
use stayspot_core::Config;
use stayspot_storage::{create_blob_store, BlobStore};
use std::sync::Arc;

/// Open the configured blob store.
pub async fn setup_storage(config: &Config) -> Result<Arc<dyn BlobStore>> {
    tracing::info!("Initializing blob store...");
    let store = create_blob_store(config).await?;
    tracing::info!(
        backend = %store.backend_type(),
        chunk_size = store.chunk_size(),
        "Blob store initialized successfully"
    );
    Ok(store)
}
