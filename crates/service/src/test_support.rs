#![cfg(test)]
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use uuid::Uuid;

/// Per-test directory under the system temp dir, removed on drop.
pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub async fn new(prefix: &str) -> anyhow::Result<Self> {
        let path = std::env::temp_dir().join(format!("{prefix}_{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&path).await?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sorted file names inside `sub` (relative to the temp dir).
    pub async fn file_names(&self, sub: &str) -> anyhow::Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(self.path.join(sub)).await?;
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

/// A typical openEO service document.
pub fn sample_service(title: &str) -> Value {
    json!({
        "title": title,
        "type": "XYZ",
        "enabled": true,
        "process": {
            "process_graph": {
                "load": {
                    "process_id": "load_collection",
                    "arguments": {"id": "sentinel-2-l2a"},
                    "result": true
                }
            }
        }
    })
}
