//! Owner reference records.
//!
//! Owning records (users, listings, blog posts) are persisted outside this subsystem. The
//! media service only needs to read an owner's principal and to read or swap the blob
//! names it holds.

mod memory;

pub use memory::InMemoryReferenceStore;

use async_trait::async_trait;
use stayspot_core::{AppError, OwnerRef};

/// Store holding the blob names each owner references.
///
/// Every method fails with [`AppError::NotFound`] when the owner does not exist. Swaps
/// replace the stored value in one step and hand back what they displaced, so concurrent
/// replaces never lose track of a blob.
#[async_trait]
pub trait MediaReferenceStore: Send + Sync {
    /// Principal allowed to mutate the owner's media.
    async fn principal_of(&self, owner: &OwnerRef) -> Result<String, AppError>;

    async fn get_single(&self, owner: &OwnerRef) -> Result<Option<String>, AppError>;

    /// Set (or clear) the single reference, returning the previous one.
    async fn swap_single(
        &self,
        owner: &OwnerRef,
        name: Option<String>,
    ) -> Result<Option<String>, AppError>;

    async fn get_set(&self, owner: &OwnerRef) -> Result<Vec<String>, AppError>;

    /// Replace the whole set, returning the previous one.
    async fn swap_set(&self, owner: &OwnerRef, names: Vec<String>)
        -> Result<Vec<String>, AppError>;
}
