use std::io::ErrorKind;
use std::path::{Path, PathBuf};
#[cfg(test)]
use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(test)]
use std::sync::Arc;

use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::StoreError;

/// A file holding one complete snapshot, replaced atomically on every write.
///
/// Readers see either the previous or the next complete file, never a partial
/// one. Two concurrent writers are not serialized: the last rename wins.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
    /// Drop the next staged file before its commit, so the rename fails.
    #[cfg(test)]
    drop_staged: Arc<AtomicBool>,
}

/// New content written and synced beside the target, not yet visible.
#[derive(Debug)]
pub struct StagedSnapshot {
    temp_path: PathBuf,
    target: PathBuf,
}

impl SnapshotFile {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            #[cfg(test)]
            drop_staged: Arc::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whole-file read; `None` when the file does not exist yet.
    pub async fn read(&self) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "snapshot file absent");
                Ok(None)
            }
            Err(e) => Err(StoreError::unavailable(format!("read {}", self.path.display()), e)),
        }
    }

    /// Staged files are named `.{file_name}.{uuid}.tmp` beside the target.
    fn temp_prefix(&self) -> String {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "snapshot".to_string());
        format!(".{name}.")
    }

    fn temp_path(&self) -> PathBuf {
        self.path
            .with_file_name(format!("{}{}.tmp", self.temp_prefix(), Uuid::new_v4().simple()))
    }

    /// Remove staged files left behind by a writer that died before its rename.
    ///
    /// Run once when a store is opened; returns how many files were removed.
    pub async fn sweep_stale_temps(&self) -> Result<usize, StoreError> {
        let dir = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => parent.to_path_buf(),
            None => PathBuf::from("."),
        };
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(StoreError::unavailable(format!("list {}", dir.display()), e)),
        };

        let prefix = self.temp_prefix();
        let mut removed = 0;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => return Err(StoreError::unavailable(format!("list {}", dir.display()), e)),
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            if !(name.starts_with(&prefix) && name.ends_with(".tmp")) {
                continue;
            }
            match fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) => warn!(file = %entry.path().display(), error = %e, "could not remove stale staged snapshot"),
            }
        }
        if removed > 0 {
            warn!(path = %self.path.display(), removed, "removed staged snapshots left by an interrupted write");
        }
        Ok(removed)
    }

    /// Write `bytes` to a synced temporary file in the target's directory.
    pub async fn stage(&self, bytes: &[u8]) -> Result<StagedSnapshot, StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::unavailable(format!("create {}", parent.display()), e))?;
        }

        let temp_path = self.temp_path();
        if let Err(e) = write_synced(&temp_path, bytes).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(StoreError::unavailable(format!("write {}", temp_path.display()), e));
        }
        Ok(StagedSnapshot { temp_path, target: self.path.clone() })
    }

    /// Stage and commit in one step.
    pub async fn replace(&self, bytes: &[u8]) -> Result<(), StoreError> {
        let staged = self.stage(bytes).await?;
        #[cfg(test)]
        if self.drop_staged.swap(false, Ordering::SeqCst) {
            let _ = fs::remove_file(staged.temp_path()).await;
        }
        staged.commit().await
    }

    #[cfg(test)]
    pub(crate) fn lose_next_stage(&self) {
        self.drop_staged.store(true, Ordering::SeqCst);
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    Ok(())
}

impl StagedSnapshot {
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Rename the staged file over the target. On failure the target keeps its
    /// previous content and the staged file is removed.
    pub async fn commit(self) -> Result<(), StoreError> {
        if let Err(e) = fs::rename(&self.temp_path, &self.target).await {
            warn!(target = %self.target.display(), error = %e, "snapshot rename failed; previous snapshot kept");
            let _ = fs::remove_file(&self.temp_path).await;
            return Err(StoreError::unavailable(format!("replace {}", self.target.display()), e));
        }
        Ok(())
    }

    /// Drop the staged content without touching the target.
    pub async fn discard(self) {
        let _ = fs::remove_file(&self.temp_path).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TempDir;

    #[tokio::test]
    async fn absent_file_reads_as_none() -> anyhow::Result<()> {
        let dir = TempDir::new("snapshot_absent").await?;
        let file = SnapshotFile::new(dir.path().join("services.json"));
        assert!(file.read().await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn replace_writes_and_cleans_temp() -> anyhow::Result<()> {
        let dir = TempDir::new("snapshot_replace").await?;
        let file = SnapshotFile::new(dir.path().join("nested").join("services.json"));
        file.replace(b"one").await?;
        file.replace(b"two").await?;
        assert_eq!(file.read().await?.as_deref(), Some(&b"two"[..]));
        assert_eq!(dir.file_names("nested").await?, ["services.json"]);
        Ok(())
    }

    #[tokio::test]
    async fn uncommitted_stage_leaves_target_intact() -> anyhow::Result<()> {
        let dir = TempDir::new("snapshot_stage").await?;
        let file = SnapshotFile::new(dir.path().join("services.json"));
        file.replace(b"old").await?;

        let staged = file.stage(b"new").await?;
        assert_eq!(fs::read(staged.temp_path()).await?, b"new");
        assert_eq!(file.read().await?.as_deref(), Some(&b"old"[..]));

        staged.discard().await;
        assert_eq!(file.read().await?.as_deref(), Some(&b"old"[..]));
        assert_eq!(dir.file_names("").await?, ["services.json"]);
        Ok(())
    }

    #[tokio::test]
    async fn failed_rename_keeps_previous_content() -> anyhow::Result<()> {
        let dir = TempDir::new("snapshot_rename_fail").await?;
        let file = SnapshotFile::new(dir.path().join("services.json"));
        file.replace(b"old").await?;

        // 暂存文件在 rename 前消失，提交必然失败
        let staged = file.stage(b"new").await?;
        fs::remove_file(staged.temp_path()).await?;
        let err = staged.commit().await.unwrap_err();
        assert!(matches!(err, StoreError::BackendUnavailable(_)));

        assert_eq!(file.read().await?.as_deref(), Some(&b"old"[..]));
        assert_eq!(dir.file_names("").await?, ["services.json"]);
        Ok(())
    }

    #[tokio::test]
    async fn replace_reports_failed_commit() -> anyhow::Result<()> {
        let dir = TempDir::new("snapshot_replace_fail").await?;
        let file = SnapshotFile::new(dir.path().join("services.json"));
        file.replace(b"old").await?;

        file.lose_next_stage();
        assert!(matches!(file.replace(b"new").await, Err(StoreError::BackendUnavailable(_))));
        assert_eq!(file.read().await?.as_deref(), Some(&b"old"[..]));

        // only the next write is affected
        file.replace(b"newer").await?;
        assert_eq!(file.read().await?.as_deref(), Some(&b"newer"[..]));
        Ok(())
    }

    #[tokio::test]
    async fn sweep_removes_only_own_staged_files() -> anyhow::Result<()> {
        let dir = TempDir::new("snapshot_sweep").await?;
        let file = SnapshotFile::new(dir.path().join("services.json"));
        file.replace(b"old").await?;
        drop(file.stage(b"a").await?);
        drop(file.stage(b"b").await?);
        fs::write(dir.path().join(".other.json.1234.tmp"), b"x").await?;

        assert_eq!(file.sweep_stale_temps().await?, 2);
        assert_eq!(dir.file_names("").await?, [".other.json.1234.tmp", "services.json"]);
        assert_eq!(file.read().await?.as_deref(), Some(&b"old"[..]));

        // missing directory is nothing to sweep
        let absent = SnapshotFile::new(dir.path().join("missing").join("services.json"));
        assert_eq!(absent.sweep_stale_temps().await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn unreadable_path_is_unavailable() -> anyhow::Result<()> {
        let dir = TempDir::new("snapshot_dir").await?;
        let file = SnapshotFile::new(dir.path());
        assert!(matches!(file.read().await, Err(StoreError::BackendUnavailable(_))));
        Ok(())
    }
}
