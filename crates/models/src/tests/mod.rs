/// CRUD operations on the `services` table
pub mod crud_tests;

use std::path::PathBuf;

/// Fresh database file path under the system temp dir.
pub(crate) fn temp_db_path() -> PathBuf {
    std::env::temp_dir().join(format!("models_{}.db", uuid::Uuid::new_v4()))
}
