//! Application setup and initialization

pub mod routes;
pub mod server;
pub mod storage;

use crate::state::AppState;
use anyhow::{Context, Result};
use stayspot_core::Config;
use stayspot_services::{InMemoryReferenceStore, MediaReferenceStore, MediaService, UploadPolicy};
use stayspot_storage::BlobStore;
use std::sync::Arc;

/// Initialize the entire application
///
/// Owner records are kept in process memory; deployments embedding the media service
/// provide their own [`MediaReferenceStore`] through [`build_state`].
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    config.validate().context("Configuration validation failed")?;

    stayspot_infra::init_telemetry(config.log_format(), config.environment())
        .context("Failed to initialize telemetry")?;

    tracing::info!("Configuration loaded and validated successfully");

    let store = storage::setup_storage(&config).await?;
    let references: Arc<dyn MediaReferenceStore> = Arc::new(InMemoryReferenceStore::new());

    let state = build_state(config.clone(), store, references);
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}

/// Wire the media service and gateway around an existing store.
pub fn build_state(
    config: Config,
    store: Arc<dyn BlobStore>,
    references: Arc<dyn MediaReferenceStore>,
) -> Arc<AppState> {
    let media = MediaService::new(store.clone(), references, UploadPolicy::from_config(&config));
    Arc::new(AppState::new(config, store, media))
}
