use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::codec::columnar::ParquetCodec;
use crate::codec::json::JsonCodec;
use crate::codec::SnapshotCodec;
use crate::errors::StoreError;
use crate::ids::{IdGenerator, UuidGenerator};
use crate::record::ServiceRecord;
use crate::storage::snapshot_file::SnapshotFile;
use crate::store::{ServiceStore, StoreKind};
use crate::table::ServiceTable;

/// Codec that backs a [`SnapshotServiceStore`].
pub trait SnapshotBackend: SnapshotCodec {
    const KIND: StoreKind;
}

impl SnapshotBackend for JsonCodec {
    const KIND: StoreKind = StoreKind::Json;
}

impl SnapshotBackend for ParquetCodec {
    const KIND: StoreKind = StoreKind::Parquet;
}

/// JSON document file: `{ "<service_id>": {"owner_id": ..., "payload": ...} }`.
pub type JsonServiceStore = SnapshotServiceStore<JsonCodec>;

/// Parquet snapshot with `service_id`, `owner_id`, `payload` columns.
pub type ParquetServiceStore = SnapshotServiceStore<ParquetCodec>;

/// Store whose medium is one snapshot file that cannot be mutated in place.
///
/// Every call reads the whole file. Every mutation materializes the table,
/// applies one operation and atomically replaces the file with the full
/// table. Nothing is cached between calls. Concurrent writers are last-writer-wins.
pub struct SnapshotServiceStore<C> {
    file: SnapshotFile,
    ids: Arc<dyn IdGenerator>,
    _codec: PhantomData<fn() -> C>,
}

impl<C: SnapshotBackend> SnapshotServiceStore<C> {
    /// The file does not need to exist; an absent file is an empty store.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { file: SnapshotFile::new(path), ids: Arc::new(UuidGenerator), _codec: PhantomData }
    }

    /// Like [`Self::new`], and first clear staged files an interrupted writer left beside the snapshot.
    pub async fn open<P: Into<PathBuf>>(path: P) -> Result<Self, StoreError> {
        let store = Self::new(path);
        store.file.sweep_stale_temps().await?;
        Ok(store)
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Materialize the current snapshot.
    ///
    /// Absent and zero-length files are empty tables; anything unreadable or
    /// undecodable is `BackendUnavailable`.
    pub async fn load(&self) -> Result<ServiceTable, StoreError> {
        let path = self.file.path().display();
        match self.file.read().await? {
            None => {
                debug!(backend = %C::KIND, %path, "no snapshot yet; starting from an empty table");
                Ok(ServiceTable::new())
            }
            Some(bytes) if bytes.is_empty() => {
                warn!(backend = %C::KIND, %path, "zero-length snapshot treated as empty table");
                Ok(ServiceTable::new())
            }
            Some(bytes) => {
                let table = tokio::task::spawn_blocking(move || C::decode(&bytes))
                    .await
                    .map_err(|e| StoreError::unavailable("decode task", e))??;
                debug!(backend = %C::KIND, %path, rows = table.len(), "snapshot loaded");
                Ok(table)
            }
        }
    }

    async fn encode(table: ServiceTable) -> Result<Vec<u8>, StoreError> {
        let bytes = tokio::task::spawn_blocking(move || C::encode(&table))
            .await
            .map_err(|e| StoreError::unavailable("encode task", e))??;
        Ok(bytes)
    }

    /// Read-all, apply `op`, write-all. The file is untouched when `op` fails.
    async fn mutate<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut ServiceTable) -> Result<T, StoreError>,
    {
        let mut table = self.load().await?;
        let out = op(&mut table)?;
        let bytes = Self::encode(table).await?;
        self.file.replace(&bytes).await?;
        Ok(out)
    }
}

#[async_trait]
impl<C: SnapshotBackend> ServiceStore for SnapshotServiceStore<C> {
    fn kind(&self) -> StoreKind {
        C::KIND
    }

    async fn add(&self, owner_id: &str, payload: Value) -> Result<String, StoreError> {
        let ids = Arc::clone(&self.ids);
        let service_id = self
            .mutate(|table| table.add(owner_id, payload, ids.as_ref()))
            .await?;
        info!(backend = %C::KIND, %service_id, owner_id, "service added");
        Ok(service_id)
    }

    async fn get(&self, service_id: &str) -> Result<ServiceRecord, StoreError> {
        self.load()
            .await?
            .get(service_id)
            .ok_or_else(|| StoreError::not_found(service_id))
    }

    async fn list(&self, owner_id: Option<&str>) -> Result<Vec<ServiceRecord>, StoreError> {
        Ok(self.load().await?.records(owner_id))
    }

    async fn update(&self, owner_id: &str, service_id: &str, partial: Value) -> Result<String, StoreError> {
        self.mutate(|table| table.update(owner_id, service_id, partial)).await?;
        info!(backend = %C::KIND, service_id, owner_id, "service updated");
        Ok(service_id.to_string())
    }

    async fn delete(&self, owner_id: &str, service_id: &str) -> Result<bool, StoreError> {
        self.mutate(|table| table.remove(owner_id, service_id)).await?;
        info!(backend = %C::KIND, service_id, owner_id, "service deleted");
        Ok(true)
    }
}
