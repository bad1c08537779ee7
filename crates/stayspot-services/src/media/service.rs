use super::validation::{sanitize_filename, validate_image};
use super::{ImageUpload, UploadPolicy};
use crate::references::MediaReferenceStore;
use futures::{future, stream, StreamExt};
use stayspot_core::{AppError, OwnerBinding, OwnerKind, OwnerRef, SetLimits, ValidationError};
use stayspot_storage::{upload_bytes, BlobStore, NewBlob, StorageError};
use std::sync::Arc;

/// Media service: stores owners' images and keeps their references consistent.
///
/// Replacements always follow the same order: the new blob is committed, then the
/// owner's reference is swapped, then whatever the swap displaced is deleted. A failed
/// delete only leaves an orphaned blob behind; it never fails the replacement.
#[derive(Clone)]
pub struct MediaService {
    store: Arc<dyn BlobStore>,
    references: Arc<dyn MediaReferenceStore>,
    policy: UploadPolicy,
}

impl MediaService {
    pub fn new(
        store: Arc<dyn BlobStore>,
        references: Arc<dyn MediaReferenceStore>,
        policy: UploadPolicy,
    ) -> Self {
        Self {
            store,
            references,
            policy,
        }
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    /// Configured set limits for an owner kind.
    pub fn set_limits(&self, kind: OwnerKind) -> Option<SetLimits> {
        self.policy.set_limits(kind)
    }

    /// Replace the single image of a user, returning the new blob name.
    #[tracing::instrument(skip(self, upload), fields(owner = %binding.owner))]
    pub async fn replace_single(
        &self,
        binding: &OwnerBinding,
        upload: ImageUpload,
    ) -> Result<String, AppError> {
        require_single(&binding.owner)?;
        self.authorize(binding).await?;
        let content_type = validate_image(&upload, &self.policy)?;

        let name = self.upload_one(&upload, content_type).await?;

        let previous = match self
            .references
            .swap_single(&binding.owner, Some(name.clone()))
            .await
        {
            Ok(previous) => previous,
            Err(e) => {
                self.release(&binding.owner, vec![name]).await;
                return Err(e);
            }
        };

        tracing::info!(
            owner = %binding.owner,
            name = %name,
            size_bytes = upload.bytes.len(),
            "Owner image replaced"
        );

        if let Some(previous) = previous {
            self.release(&binding.owner, vec![previous]).await;
        }

        Ok(name)
    }

    /// Replace the whole image set of a listing or blog post.
    ///
    /// The returned names are in input order. An empty `uploads` clears the set. `limits`
    /// can only narrow the configured limit for the owner kind, never widen it.
    #[tracing::instrument(skip(self, uploads), fields(owner = %binding.owner, count = uploads.len()))]
    pub async fn replace_set(
        &self,
        binding: &OwnerBinding,
        uploads: Vec<ImageUpload>,
        limits: SetLimits,
    ) -> Result<Vec<String>, AppError> {
        require_set(&binding.owner)?;
        let max = self
            .policy
            .set_limits(binding.owner.kind)
            .map_or(limits.max_count, |configured| configured.max_count.min(limits.max_count));
        if uploads.len() > max {
            return Err(ValidationError::TooMany {
                count: uploads.len(),
                max,
            }
            .into());
        }
        self.authorize(binding).await?;

        let content_types = uploads
            .iter()
            .map(|upload| validate_image(upload, &self.policy))
            .collect::<Result<Vec<_>, _>>()?;

        let results: Vec<Result<String, AppError>> = stream::iter(uploads.iter().zip(content_types))
            .map(|(upload, content_type)| self.upload_one(upload, content_type))
            .buffered(self.policy.upload_concurrency.max(1))
            .collect()
            .await;

        let mut names = Vec::with_capacity(results.len());
        let mut first_error = None;
        for result in results {
            match result {
                Ok(name) => names.push(name),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_error {
            tracing::warn!(
                owner = %binding.owner,
                committed = names.len(),
                error = %e,
                "Set upload failed, discarding committed items"
            );
            self.release(&binding.owner, names).await;
            return Err(e);
        }

        let previous = match self.references.swap_set(&binding.owner, names.clone()).await {
            Ok(previous) => previous,
            Err(e) => {
                self.release(&binding.owner, names).await;
                return Err(e);
            }
        };

        tracing::info!(
            owner = %binding.owner,
            count = names.len(),
            replaced = previous.len(),
            "Owner image set replaced"
        );

        self.release(&binding.owner, previous).await;

        Ok(names)
    }

    /// Name of the owner's single image, if any.
    pub async fn get_for_owner(&self, owner: &OwnerRef) -> Result<Option<String>, AppError> {
        require_single(owner)?;
        self.references.get_single(owner).await
    }

    /// Names of the owner's image set, cover first.
    pub async fn get_set_for_owner(&self, owner: &OwnerRef) -> Result<Vec<String>, AppError> {
        require_set(owner)?;
        self.references.get_set(owner).await
    }

    /// Name at `index` of the owner's image set.
    pub async fn get_set_item(&self, owner: &OwnerRef, index: usize) -> Result<String, AppError> {
        let mut names = self.get_set_for_owner(owner).await?;
        if index >= names.len() {
            return Err(AppError::NotFound(format!(
                "Image {} not found for {}",
                index, owner
            )));
        }
        Ok(names.swap_remove(index))
    }

    /// Clear the user's image and delete it. Returns the released names.
    #[tracing::instrument(skip(self), fields(owner = %binding.owner))]
    pub async fn remove_single(&self, binding: &OwnerBinding) -> Result<Vec<String>, AppError> {
        require_single(&binding.owner)?;
        self.authorize(binding).await?;

        let previous: Vec<String> = self
            .references
            .swap_single(&binding.owner, None)
            .await?
            .into_iter()
            .collect();

        self.release(&binding.owner, previous.clone()).await;
        Ok(previous)
    }

    /// Clear the owner's image set and delete its blobs. Returns the released names.
    #[tracing::instrument(skip(self), fields(owner = %binding.owner))]
    pub async fn remove_set(&self, binding: &OwnerBinding) -> Result<Vec<String>, AppError> {
        require_set(&binding.owner)?;
        self.authorize(binding).await?;

        let previous = self.references.swap_set(&binding.owner, Vec::new()).await?;
        self.release(&binding.owner, previous.clone()).await;
        Ok(previous)
    }

    async fn authorize(&self, binding: &OwnerBinding) -> Result<(), AppError> {
        if binding.caller.trim().is_empty() {
            return Err(AppError::Unauthorized(
                "Authentication required".to_string(),
            ));
        }

        let principal = self.references.principal_of(&binding.owner).await?;
        if principal != binding.caller {
            tracing::debug!(
                owner = %binding.owner,
                caller = %binding.caller,
                "Caller does not own media owner"
            );
            return Err(AppError::Unauthorized(format!(
                "Not allowed to modify media of {}",
                binding.owner
            )));
        }

        Ok(())
    }

    async fn upload_one(&self, upload: &ImageUpload, content_type: String) -> Result<String, AppError> {
        let mut blob = NewBlob::new(content_type).with_expected_size(upload.bytes.len() as u64);
        if let Some(filename) = upload.original_filename.as_deref().and_then(sanitize_filename) {
            blob = blob.with_original_filename(filename);
        }

        let descriptor = upload_bytes(self.store.as_ref(), blob, upload.bytes.clone()).await?;
        Ok(descriptor.name)
    }

    /// Best-effort delete of blobs no longer referenced by `owner`.
    async fn release(&self, owner: &OwnerRef, names: Vec<String>) {
        if names.is_empty() {
            return;
        }

        let outcomes = future::join_all(names.into_iter().map(|name| async move {
            match self.store.delete(&name).await {
                Ok(()) | Err(StorageError::NotFound(_)) => Ok(name),
                Err(e) => {
                    tracing::warn!(owner = %owner, name = %name, error = %e, "Failed to delete blob");
                    Err(name)
                }
            }
        }))
        .await;

        let (released, failed): (Vec<_>, Vec<_>) = outcomes.into_iter().partition(Result::is_ok);
        let released: Vec<String> = released.into_iter().filter_map(Result::ok).collect();
        let failed: Vec<String> = failed.into_iter().filter_map(Result::err).collect();

        if failed.is_empty() {
            tracing::debug!(owner = %owner, released = ?released, "Released superseded blobs");
        } else {
            let error = AppError::PartialFailure { released, failed };
            tracing::warn!(owner = %owner, error = %error, "Superseded blobs left orphaned");
        }
    }
}

fn require_single(owner: &OwnerRef) -> Result<(), AppError> {
    if owner.kind.holds_set() {
        return Err(ValidationError::WrongOwnerKind(format!(
            "{} holds an image set, not a single image",
            owner.kind
        ))
        .into());
    }
    Ok(())
}

fn require_set(owner: &OwnerRef) -> Result<(), AppError> {
    if !owner.kind.holds_set() {
        return Err(ValidationError::WrongOwnerKind(format!(
            "{} holds a single image, not an image set",
            owner.kind
        ))
        .into());
    }
    Ok(())
}
