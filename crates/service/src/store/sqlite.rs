use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use models::errors::ModelError;
use sea_orm::DatabaseConnection;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::errors::StoreError;
use crate::ids::{IdGenerator, UuidGenerator, MAX_ID_ATTEMPTS};
use crate::record::{authorize, merge_payload, validate_owner, ServiceRecord};
use crate::store::{ServiceStore, StoreKind};

/// Embedded-database store: one `services` table in a SQLite file.
///
/// Each operation opens its own connection and closes it before returning.
/// `update`/`delete` select the row, check ownership and then mutate in a
/// separate statement; a concurrent writer can slip in between the two (the
/// row vanishing is reported as `NotFound`).
pub struct SqliteServiceStore {
    path: PathBuf,
    ids: Arc<dyn IdGenerator>,
}

impl SqliteServiceStore {
    /// Create the database file and schema when missing.
    pub async fn open<P: Into<PathBuf>>(path: P) -> Result<Self, StoreError> {
        let path = path.into();
        let db = models::db::connect_and_migrate(&path).await.map_err(|e| {
            let duckdb = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("duckdb"));
            let context = if duckdb {
                format!("open {} (.duckdb paths are opened as SQLite databases)", path.display())
            } else {
                format!("open {}", path.display())
            };
            StoreError::unavailable(context, e)
        })?;
        close(db).await;
        info!(backend = "sqlite", path = %path.display(), "schema ready");
        Ok(Self { path, ids: Arc::new(UuidGenerator) })
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn connect(&self) -> Result<DatabaseConnection, StoreError> {
        models::db::connect(&self.path)
            .await
            .map_err(|e| StoreError::unavailable(format!("connect {}", self.path.display()), e))
    }

    /// Existence then ownership, in that order.
    async fn owned_row(db: &DatabaseConnection, owner_id: &str, service_id: &str) -> Result<ServiceRecord, StoreError> {
        let row = models::service::find(db, service_id)
            .await?
            .ok_or_else(|| StoreError::not_found(service_id))?;
        authorize(service_id, &row.owner_id, owner_id)?;
        Ok(row.into())
    }

    async fn insert_fresh(&self, db: &DatabaseConnection, owner_id: &str, payload: &Value) -> Result<String, StoreError> {
        let mut last_id = String::new();
        for attempt in 1..=MAX_ID_ATTEMPTS {
            let candidate = self.ids.next_id();
            match models::service::insert(db, &candidate, owner_id, payload.clone()).await {
                Ok(()) => return Ok(candidate),
                Err(ModelError::Duplicate(_)) => {
                    warn!(backend = "sqlite", service_id = %candidate, attempt, "generated service id already taken; regenerating");
                    last_id = candidate;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(StoreError::Conflict { attempts: MAX_ID_ATTEMPTS, last_id })
    }

    async fn update_on(db: &DatabaseConnection, owner_id: &str, service_id: &str, partial: Value) -> Result<(), StoreError> {
        let mut record = Self::owned_row(db, owner_id, service_id).await?;
        merge_payload(&mut record.payload, partial)?;
        models::service::update_payload(db, service_id, record.payload).await?;
        Ok(())
    }

    async fn delete_on(db: &DatabaseConnection, owner_id: &str, service_id: &str) -> Result<(), StoreError> {
        Self::owned_row(db, owner_id, service_id).await?;
        models::service::delete(db, service_id).await?;
        Ok(())
    }
}

async fn close(db: DatabaseConnection) {
    if let Err(e) = db.close().await {
        debug!(backend = "sqlite", error = %e, "closing connection failed");
    }
}

#[async_trait]
impl ServiceStore for SqliteServiceStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Sqlite
    }

    async fn add(&self, owner_id: &str, payload: Value) -> Result<String, StoreError> {
        validate_owner(owner_id)?;
        let db = self.connect().await?;
        let out = self.insert_fresh(&db, owner_id, &payload).await;
        close(db).await;
        let service_id = out?;
        info!(backend = "sqlite", %service_id, owner_id, "service added");
        Ok(service_id)
    }

    async fn get(&self, service_id: &str) -> Result<ServiceRecord, StoreError> {
        let db = self.connect().await?;
        let out = models::service::find(&db, service_id).await;
        close(db).await;
        debug!(backend = "sqlite", service_id, "get service");
        out?.map(ServiceRecord::from)
            .ok_or_else(|| StoreError::not_found(service_id))
    }

    async fn list(&self, owner_id: Option<&str>) -> Result<Vec<ServiceRecord>, StoreError> {
        let db = self.connect().await?;
        let out = models::service::list(&db, owner_id).await;
        close(db).await;
        debug!(backend = "sqlite", owner_id = ?owner_id, "list services");
        Ok(out?.into_iter().map(ServiceRecord::from).collect())
    }

    async fn update(&self, owner_id: &str, service_id: &str, partial: Value) -> Result<String, StoreError> {
        let db = self.connect().await?;
        let out = Self::update_on(&db, owner_id, service_id, partial).await;
        close(db).await;
        out?;
        info!(backend = "sqlite", service_id, owner_id, "service updated");
        Ok(service_id.to_string())
    }

    async fn delete(&self, owner_id: &str, service_id: &str) -> Result<bool, StoreError> {
        let db = self.connect().await?;
        let out = Self::delete_on(&db, owner_id, service_id).await;
        close(db).await;
        out?;
        info!(backend = "sqlite", service_id, owner_id, "service deleted");
        Ok(true)
    }
}
