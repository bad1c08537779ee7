//! Streaming file gateway
//!
//! Serves committed blobs by name. Bytes are piped from the store chunk by chunk; nothing
//! is buffered whole.

use crate::error::HttpAppError;
use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::Response,
};
use futures::StreamExt;
use stayspot_core::AppError;
use stayspot_storage::{BlobStore, StorageError};
use std::sync::Arc;

/// Blob names are never reused for different bytes.
pub const CACHE_CONTROL_IMMUTABLE: &str = "public, max-age=31536000, immutable";

#[derive(Clone)]
pub struct StreamingGateway {
    store: Arc<dyn BlobStore>,
}

impl StreamingGateway {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    /// Stream the blob named `name`.
    ///
    /// Unknown names, including blobs deleted between lookup and open, produce a 404 before
    /// any byte is sent. A backend error after the headers went out aborts the body.
    #[tracing::instrument(skip(self), fields(operation = "serve_file"))]
    pub async fn serve(&self, name: &str) -> Result<Response, HttpAppError> {
        if self.store.find(name).await?.is_none() {
            return Err(not_found(name));
        }

        let download = match self.store.open_download(name).await {
            Ok(download) => download,
            Err(StorageError::NotFound(_)) => return Err(not_found(name)),
            Err(e) => {
                tracing::error!(name = %name, error = %e, "Failed to open blob download");
                return Err(e.into());
            }
        };

        let metadata = download.metadata;
        let stream_name = name.to_string();
        let body_stream = download.stream.map(move |result| {
            result.map_err(|e| {
                tracing::error!(name = %stream_name, error = %e, "Blob stream failed mid-response");
                std::io::Error::other(format!("Storage stream error: {}", e))
            })
        });

        let content_type = HeaderValue::from_str(&metadata.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

        tracing::debug!(
            name = %name,
            size_bytes = metadata.size_bytes,
            content_type = %metadata.content_type,
            "Streaming blob"
        );

        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CONTENT_LENGTH, metadata.size_bytes)
            .header(header::CACHE_CONTROL, CACHE_CONTROL_IMMUTABLE)
            .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff")
            .body(Body::from_stream(body_stream))
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to build response");
                HttpAppError::from(AppError::Internal(e.to_string()))
            })
    }
}

fn not_found(name: &str) -> HttpAppError {
    HttpAppError(AppError::NotFound(format!("File not found: {}", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use stayspot_core::Metadata;
    use stayspot_storage::{
        upload_bytes, BlobDownload, BlobWriter, ByteStream, MemoryBlobStore, NewBlob,
        StorageBackend, StorageResult,
    };

    /// Serves the first chunk of a real blob, then fails.
    struct BrokenStream {
        inner: MemoryBlobStore,
    }

    #[async_trait]
    impl BlobStore for BrokenStream {
        async fn begin_upload(&self, blob: NewBlob) -> StorageResult<Box<dyn BlobWriter>> {
            self.inner.begin_upload(blob).await
        }

        async fn open_download(&self, name: &str) -> StorageResult<BlobDownload> {
            let download = self.inner.open_download(name).await?;
            let stream: ByteStream = Box::pin(download.stream.take(1).chain(futures::stream::iter([
                Err(StorageError::Backend("disk read failed".to_string())),
            ])));
            Ok(BlobDownload {
                metadata: download.metadata,
                stream,
            })
        }

        async fn find(&self, name: &str) -> StorageResult<Option<Metadata>> {
            self.inner.find(name).await
        }

        async fn delete(&self, name: &str) -> StorageResult<()> {
            self.inner.delete(name).await
        }

        async fn close(&self) -> StorageResult<()> {
            self.inner.close().await
        }

        fn is_closed(&self) -> bool {
            self.inner.is_closed()
        }

        fn backend_type(&self) -> StorageBackend {
            StorageBackend::Memory
        }

        fn chunk_size(&self) -> usize {
            self.inner.chunk_size()
        }
    }

    #[tokio::test]
    async fn test_mid_stream_error_aborts_body_after_headers() {
        let store = Arc::new(BrokenStream {
            inner: MemoryBlobStore::new(2).unwrap(),
        });
        let descriptor = upload_bytes(
            store.as_ref(),
            NewBlob::new("image/png"),
            Bytes::from_static(b"abcdef"),
        )
        .await
        .unwrap();

        let gateway = StreamingGateway::new(store);
        let response = gateway.serve(&descriptor.name).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "6");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await;
        assert!(body.is_err());
    }

    #[tokio::test]
    async fn test_unknown_name_is_not_found_before_streaming() {
        let gateway = StreamingGateway::new(Arc::new(MemoryBlobStore::new(4).unwrap()));
        let error = gateway.serve("missing.png").await.unwrap_err();
        assert!(matches!(error.0, AppError::NotFound(_)));
    }
}
