//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p stayspot-api`.

pub mod fixtures;
pub mod storage;

use axum_test::TestServer;
use stayspot_api::setup::{build_state, routes};
use stayspot_api::state::AppState;
use stayspot_core::{Config, OwnerRef};
use stayspot_services::{InMemoryReferenceStore, MediaService};
use stayspot_storage::{BlobStore, LocalBlobStore, MemoryBlobStore};
use std::sync::Arc;
use tempfile::TempDir;

pub const TEST_CHUNK_SIZE: usize = 16;

/// Test application: server plus direct handles on its collaborators.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub references: Arc<InMemoryReferenceStore>,
    pub _temp_dir: Option<TempDir>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn media(&self) -> &MediaService {
        &self.state.media
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.state.store
    }
}

/// Build a test app around `store`, with one user, one listing and one blog post.
pub async fn setup_with_store(store: Arc<dyn BlobStore>, temp_dir: Option<TempDir>) -> TestApp {
    let config = Config::default();
    let references = Arc::new(InMemoryReferenceStore::new());
    references.register(OwnerRef::user("guest-1"), "guest-1").await;
    references.register(OwnerRef::listing("listing-1"), "host-1").await;
    references.register(OwnerRef::blog_post("post-1"), "author-1").await;

    let state = build_state(config.clone(), store, references.clone());
    let router = routes::setup_routes(&config, state.clone()).expect("routes");
    let server = TestServer::new(router).expect("test server");

    TestApp {
        server,
        state,
        references,
        _temp_dir: temp_dir,
    }
}

/// Test app on the in-memory backend.
pub async fn setup_test_app() -> TestApp {
    let store = Arc::new(MemoryBlobStore::new(TEST_CHUNK_SIZE).expect("memory store"));
    setup_with_store(store, None).await
}

/// Test app on the local filesystem backend in a temporary directory.
pub async fn setup_local_test_app() -> TestApp {
    let temp_dir = TempDir::new().expect("temp dir");
    let store = LocalBlobStore::open(temp_dir.path(), TEST_CHUNK_SIZE)
        .await
        .expect("local store");
    setup_with_store(Arc::new(store), Some(temp_dir)).await
}
