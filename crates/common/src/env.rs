//! Environment/runtime helpers
//!
//! Startup check that the directory a file-backed store writes into exists.

use std::path::Path;

use tracing::{debug, warn};

/// Ensure the parent directory of a file-backed store exists.
///
/// A bare file name (no parent component) resolves against the working
/// directory and needs nothing.
pub async fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    if tokio::fs::metadata(parent).await.is_ok() {
        return Ok(());
    }
    warn!(dir = %parent.display(), "store directory missing; creating it");
    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", parent.display()))?;
    debug!(dir = %parent.display(), "store directory created");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_missing_parent() -> anyhow::Result<()> {
        let root = std::env::temp_dir().join(format!("common_env_{}", uuid::Uuid::new_v4()));
        let file = root.join("nested").join("services.json");

        ensure_parent_dir(&file).await?;
        assert!(tokio::fs::metadata(root.join("nested")).await?.is_dir());

        // idempotent
        ensure_parent_dir(&file).await?;
        ensure_parent_dir(Path::new("services.json")).await?;

        let _ = tokio::fs::remove_dir_all(&root).await;
        Ok(())
    }
}
