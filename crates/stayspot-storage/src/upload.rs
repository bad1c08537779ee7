//! Helpers that drive a [`BlobWriter`] to completion.
//!
//! Both helpers abort the upload on any error, so a failed upload never leaves a
//! visible blob behind.

use crate::traits::{BlobStore, BlobWriter, NewBlob, StorageError, StorageResult};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use stayspot_core::BlobDescriptor;

/// Upload an in-memory payload as one blob.
pub async fn upload_bytes(
    store: &dyn BlobStore,
    blob: NewBlob,
    data: Bytes,
) -> StorageResult<BlobDescriptor> {
    let mut writer = store.begin_upload(blob).await?;
    if let Err(e) = writer.write(data).await {
        abort_quietly(writer).await;
        return Err(e);
    }
    writer.commit().await
}

/// Upload a stream of byte chunks as one blob.
pub async fn upload_stream<S, E>(
    store: &dyn BlobStore,
    blob: NewBlob,
    mut stream: S,
) -> StorageResult<BlobDescriptor>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin + Send,
    E: Into<StorageError>,
{
    let mut writer = store.begin_upload(blob).await?;

    while let Some(item) = stream.next().await {
        let result = match item {
            Ok(data) => writer.write(data).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            abort_quietly(writer).await;
            return Err(e);
        }
    }

    writer.commit().await
}

async fn abort_quietly(writer: Box<dyn BlobWriter>) {
    let name = writer.name().to_string();
    if let Err(e) = writer.abort().await {
        tracing::warn!(name = %name, error = %e, "Failed to abort upload");
    }
}
