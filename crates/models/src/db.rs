use std::path::Path;
use std::time::Duration;

use migration::MigratorTrait;
use sea_orm::sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sea_orm::sqlx::ConnectOptions as _;
use sea_orm::{DatabaseConnection, SqlxSqliteConnector};
use tracing::debug;

use crate::errors::ModelError;

/// Open a single-connection handle scoped to one store operation.
///
/// The path is handed to the driver as a filename, never spliced into a URL,
/// so `?`, `#` and `%` in directory names are taken literally.
pub async fn connect(path: &Path) -> Result<DatabaseConnection, ModelError> {
    let opts = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .disable_statement_logging();
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(opts)
        .await
        .map_err(|e| ModelError::Db(e.to_string()))?;
    debug!(path = %path.display(), "sqlite connection opened");
    Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
}

/// Connect and bring the schema up to date. Safe to call on an existing file.
pub async fn connect_and_migrate(path: &Path) -> Result<DatabaseConnection, ModelError> {
    let db = connect(path).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}
