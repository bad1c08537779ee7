use super::MediaReferenceStore;
use async_trait::async_trait;
use stayspot_core::{AppError, OwnerRef};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default, Clone)]
struct OwnerRecord {
    principal: String,
    single: Option<String>,
    set: Vec<String>,
}

/// Reference store kept in process memory.
///
/// Owners must be registered before use. Used by the standalone server and by tests.
#[derive(Debug, Default)]
pub struct InMemoryReferenceStore {
    records: RwLock<HashMap<OwnerRef, OwnerRecord>>,
}

impl InMemoryReferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an owner whose media may be changed by `principal`.
    ///
    /// Re-registering keeps existing references and only updates the principal.
    pub async fn register(&self, owner: OwnerRef, principal: impl Into<String>) {
        let principal = principal.into();
        let mut records = self.records.write().await;
        records.entry(owner).or_default().principal = principal;
    }

    pub async fn contains(&self, owner: &OwnerRef) -> bool {
        self.records.read().await.contains_key(owner)
    }
}

fn unknown_owner(owner: &OwnerRef) -> AppError {
    AppError::NotFound(format!("Owner not found: {}", owner))
}

#[async_trait]
impl MediaReferenceStore for InMemoryReferenceStore {
    async fn principal_of(&self, owner: &OwnerRef) -> Result<String, AppError> {
        self.records
            .read()
            .await
            .get(owner)
            .map(|record| record.principal.clone())
            .ok_or_else(|| unknown_owner(owner))
    }

    async fn get_single(&self, owner: &OwnerRef) -> Result<Option<String>, AppError> {
        self.records
            .read()
            .await
            .get(owner)
            .map(|record| record.single.clone())
            .ok_or_else(|| unknown_owner(owner))
    }

    async fn swap_single(
        &self,
        owner: &OwnerRef,
        name: Option<String>,
    ) -> Result<Option<String>, AppError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(owner).ok_or_else(|| unknown_owner(owner))?;
        Ok(std::mem::replace(&mut record.single, name))
    }

    async fn get_set(&self, owner: &OwnerRef) -> Result<Vec<String>, AppError> {
        self.records
            .read()
            .await
            .get(owner)
            .map(|record| record.set.clone())
            .ok_or_else(|| unknown_owner(owner))
    }

    async fn swap_set(
        &self,
        owner: &OwnerRef,
        names: Vec<String>,
    ) -> Result<Vec<String>, AppError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(owner).ok_or_else(|| unknown_owner(owner))?;
        Ok(std::mem::replace(&mut record.set, names))
    }
}
