use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::errors::StoreError;
use crate::ids::{IdGenerator, UuidGenerator};
use crate::record::ServiceRecord;
use crate::store::{ServiceStore, StoreKind};
use crate::table::ServiceTable;

/// In-process store; contents live as long as the value.
pub struct MemoryServiceStore {
    inner: RwLock<ServiceTable>,
    ids: Arc<dyn IdGenerator>,
}

impl Default for MemoryServiceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryServiceStore {
    pub fn new() -> Self {
        Self { inner: RwLock::new(ServiceTable::new()), ids: Arc::new(UuidGenerator) }
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }
}

#[async_trait]
impl ServiceStore for MemoryServiceStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Memory
    }

    async fn add(&self, owner_id: &str, payload: Value) -> Result<String, StoreError> {
        let mut table = self.inner.write().await;
        let service_id = table.add(owner_id, payload, self.ids.as_ref())?;
        info!(backend = "memory", %service_id, owner_id, "service added");
        Ok(service_id)
    }

    async fn get(&self, service_id: &str) -> Result<ServiceRecord, StoreError> {
        let table = self.inner.read().await;
        debug!(backend = "memory", service_id, "get service");
        table.get(service_id).ok_or_else(|| StoreError::not_found(service_id))
    }

    async fn list(&self, owner_id: Option<&str>) -> Result<Vec<ServiceRecord>, StoreError> {
        Ok(self.inner.read().await.records(owner_id))
    }

    async fn update(&self, owner_id: &str, service_id: &str, partial: Value) -> Result<String, StoreError> {
        let mut table = self.inner.write().await;
        table.update(owner_id, service_id, partial)?;
        info!(backend = "memory", service_id, owner_id, "service updated");
        Ok(service_id.to_string())
    }

    async fn delete(&self, owner_id: &str, service_id: &str) -> Result<bool, StoreError> {
        let mut table = self.inner.write().await;
        table.remove(owner_id, service_id)?;
        info!(backend = "memory", service_id, owner_id, "service deleted");
        Ok(true)
    }
}
