//! Service store contract and backend selection.
//!
//! Every backend implements [`ServiceStore`] with identical semantics:
//! - ids are generated by the store, regenerated on collision
//! - `update`/`delete` check existence first (`NotFound`), then ownership (`Forbidden`)
//! - `update` is a shallow merge that never touches `service_id`/`owner_id`
//! - `list` is ordered by `service_id`
//!
//! Known limitation: none of the backends serialize concurrent writers. The
//! snapshot backends are last-writer-wins; the SQLite backend checks ownership
//! and mutates in separate statements.

pub mod memory;
pub mod snapshot;
pub mod sqlite;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::errors::StoreError;
use crate::record::ServiceRecord;

pub use memory::MemoryServiceStore;
pub use snapshot::{JsonServiceStore, ParquetServiceStore, SnapshotServiceStore};
pub use sqlite::SqliteServiceStore;

/// CRUD contract for user-owned service documents.
#[async_trait]
pub trait ServiceStore: Send + Sync {
    fn kind(&self) -> StoreKind;

    /// Persist a new record and return its generated id.
    async fn add(&self, owner_id: &str, payload: Value) -> Result<String, StoreError>;

    async fn get(&self, service_id: &str) -> Result<ServiceRecord, StoreError>;

    async fn list(&self, owner_id: Option<&str>) -> Result<Vec<ServiceRecord>, StoreError>;

    /// Shallow-merge `partial` into the payload of a record owned by `owner_id`.
    async fn update(&self, owner_id: &str, service_id: &str, partial: Value) -> Result<String, StoreError>;

    async fn delete(&self, owner_id: &str, service_id: &str) -> Result<bool, StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    Json,
    Sqlite,
    Parquet,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StoreKind::Memory => "memory",
            StoreKind::Json => "json",
            StoreKind::Sqlite => "sqlite",
            StoreKind::Parquet => "parquet",
        };
        f.write_str(name)
    }
}

/// Resolved store URL: which backend, and where it lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLocation {
    pub kind: StoreKind,
    /// Backing file; `None` for the in-process store.
    pub path: Option<PathBuf>,
}

impl StoreLocation {
    /// Resolve a store URL.
    ///
    /// - `memory://` selects the in-process store
    /// - `file://` is stripped; `sqlite://` forces the SQLite backend
    /// - `.json` selects the JSON document store
    /// - `.db`, `.sqlite`, `.sqlite3`, `.duckdb` select SQLite. A `.duckdb` path is
    ///   opened with the SQLite engine, so it must hold (or become) a SQLite
    ///   database; an existing DuckDB file is reported as unavailable.
    /// - `.parquet` selects the Parquet snapshot store
    pub fn parse(url: &str) -> Result<Self, StoreError> {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(StoreError::UnsupportedStoreUrl("empty store url".to_string()));
        }
        if trimmed.starts_with("memory://") {
            return Ok(Self { kind: StoreKind::Memory, path: None });
        }
        if let Some(rest) = trimmed.strip_prefix("sqlite://") {
            let rest = rest.split('?').next().unwrap_or_default();
            if rest.is_empty() {
                return Err(StoreError::UnsupportedStoreUrl(url.to_string()));
            }
            return Ok(Self { kind: StoreKind::Sqlite, path: Some(PathBuf::from(rest)) });
        }

        let raw = trimmed.strip_prefix("file://").unwrap_or(trimmed);
        let path = Path::new(raw);
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        let kind = match ext.as_str() {
            "json" => StoreKind::Json,
            "db" | "sqlite" | "sqlite3" | "duckdb" => StoreKind::Sqlite,
            "parquet" => StoreKind::Parquet,
            _ => return Err(StoreError::UnsupportedStoreUrl(url.to_string())),
        };
        Ok(Self { kind, path: Some(path.to_path_buf()) })
    }
}

/// Open the backend selected by `url`. Called once at startup.
pub async fn open_store(url: &str) -> Result<Arc<dyn ServiceStore>, StoreError> {
    open_location(&StoreLocation::parse(url)?).await
}

/// Open the backend of an already resolved location.
pub async fn open_location(location: &StoreLocation) -> Result<Arc<dyn ServiceStore>, StoreError> {
    let store: Arc<dyn ServiceStore> = match (location.kind, location.path.clone()) {
        (StoreKind::Memory, _) => Arc::new(MemoryServiceStore::new()),
        (StoreKind::Json, Some(path)) => Arc::new(JsonServiceStore::open(path).await?),
        (StoreKind::Parquet, Some(path)) => Arc::new(ParquetServiceStore::open(path).await?),
        (StoreKind::Sqlite, Some(path)) => Arc::new(SqliteServiceStore::open(path).await?),
        (kind, None) => {
            return Err(StoreError::UnsupportedStoreUrl(format!("{kind} store needs a file path")));
        }
    };
    info!(backend = %store.kind(), path = ?location.path, "service store opened");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(url: &str) -> Option<StoreKind> {
        StoreLocation::parse(url).ok().map(|l| l.kind)
    }

    #[test]
    fn selection_by_extension_and_scheme() {
        assert_eq!(kind_of("data/services.json"), Some(StoreKind::Json));
        assert_eq!(kind_of("file:///var/lib/services.JSON"), Some(StoreKind::Json));
        assert_eq!(kind_of("services.db"), Some(StoreKind::Sqlite));
        assert_eq!(kind_of("services.duckdb"), Some(StoreKind::Sqlite));
        assert_eq!(kind_of("sqlite:///tmp/anything"), Some(StoreKind::Sqlite));
        assert_eq!(kind_of("/tmp/services.parquet"), Some(StoreKind::Parquet));
        assert_eq!(kind_of("memory://"), Some(StoreKind::Memory));
    }

    #[test]
    fn sqlite_scheme_strips_query() {
        let loc = StoreLocation::parse("sqlite://data/services.db?mode=rwc").unwrap();
        assert_eq!(loc.path.as_deref(), Some(Path::new("data/services.db")));
    }

    #[test]
    fn unknown_urls_are_rejected() {
        for url in ["", "services.csv", "services", "sqlite://", "s3://bucket/services.json.gz"] {
            let err = StoreLocation::parse(url).unwrap_err();
            assert!(matches!(err, StoreError::UnsupportedStoreUrl(_)), "{url}");
        }
    }

    #[tokio::test]
    async fn open_store_picks_backend() -> anyhow::Result<()> {
        let dir = crate::test_support::TempDir::new("open_store").await?;
        for (file, kind) in [
            ("services.json", StoreKind::Json),
            ("services.parquet", StoreKind::Parquet),
            ("services.db", StoreKind::Sqlite),
        ] {
            let url = dir.path().join(file);
            let store = open_store(&url.to_string_lossy()).await?;
            assert_eq!(store.kind(), kind);
        }
        assert_eq!(open_store("memory://").await?.kind(), StoreKind::Memory);
        Ok(())
    }

    #[tokio::test]
    async fn open_location_uses_resolved_path() -> anyhow::Result<()> {
        let dir = crate::test_support::TempDir::new("open_location").await?;
        let location = StoreLocation { kind: StoreKind::Json, path: Some(dir.path().join("svc.json")) };
        let store = open_location(&location).await?;
        store.add("alice", serde_json::json!({})).await?;
        assert!(tokio::fs::metadata(dir.path().join("svc.json")).await?.is_file());

        let pathless = StoreLocation { kind: StoreKind::Parquet, path: None };
        assert!(matches!(open_location(&pathless).await.err(), Some(StoreError::UnsupportedStoreUrl(_))));
        Ok(())
    }

    #[tokio::test]
    async fn duckdb_file_is_unavailable_with_hint() -> anyhow::Result<()> {
        let dir = crate::test_support::TempDir::new("duckdb_file").await?;
        let path = dir.path().join("services.duckdb");
        tokio::fs::write(&path, b"DUCK\0\0\0\0 not a sqlite database at all, just filler bytes").await?;

        let err = open_store(&path.to_string_lossy()).await.err();
        match err {
            Some(StoreError::BackendUnavailable(msg)) => assert!(msg.contains("SQLite"), "{msg}"),
            other => panic!("unexpected: {other:?}"),
        }
        Ok(())
    }
}
