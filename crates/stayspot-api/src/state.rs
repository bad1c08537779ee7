//! Application state shared by all handlers.

use stayspot_core::Config;
use stayspot_services::MediaService;
use stayspot_storage::BlobStore;
use std::sync::Arc;

use crate::gateway::StreamingGateway;

/// Application state
///
/// Built once at startup. `store` is the single backend handle; the media service and the
/// gateway hold clones of it.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn BlobStore>,
    pub media: MediaService,
    pub gateway: StreamingGateway,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn BlobStore>, media: MediaService) -> Self {
        Self {
            gateway: StreamingGateway::new(store.clone()),
            config,
            store,
            media,
        }
    }
}
