//! File-backed resume store
//!
//! Layout: `<state_dir>/<run_id>.json`. Writes go to `<run_id>.json.tmp`
//! first and are renamed over the final path, so readers never see a
//! partial snapshot.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use super::state::{ResumeState, RunStatus};
use super::{validate_run_id, ResumeStore};
use crate::error::{MarkflowError, Result};
use crate::util::constants::{SNAPSHOT_EXTENSION, SNAPSHOT_TEMP_SUFFIX};

#[derive(Debug, Clone)]
pub struct FileResumeStore {
    dir: PathBuf,
    cancel: Option<CancellationToken>,
}

impl FileResumeStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cancel: None,
        }
    }

    /// Stop writes once `token` is cancelled (checked before the rename)
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn snapshot_path(&self, run_id: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", run_id, SNAPSHOT_EXTENSION))
    }

    fn temp_path(&self, run_id: &str) -> PathBuf {
        self.dir.join(format!(
            "{}.{}{}",
            run_id, SNAPSHOT_EXTENSION, SNAPSHOT_TEMP_SUFFIX
        ))
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|t| t.is_cancelled())
    }

    async fn read_path(path: &Path) -> Result<Option<ResumeState>> {
        let text = match fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| MarkflowError::CorruptSnapshot {
                path: path.display().to_string(),
                details: e.to_string(),
            })
    }

    /// Run id for a finished snapshot file name, `None` for temp or foreign files
    fn run_id_of(file_name: &str) -> Option<&str> {
        let stem = file_name.strip_suffix(SNAPSHOT_EXTENSION)?.strip_suffix('.')?;
        validate_run_id(stem).ok().map(|_| stem)
    }

    fn is_temp_file(file_name: &str) -> bool {
        file_name
            .strip_suffix(SNAPSHOT_TEMP_SUFFIX)
            .is_some_and(|rest| Self::run_id_of(rest).is_some())
    }

    async fn write_atomic(&self, run_id: &str, bytes: &[u8]) -> Result<()> {
        let final_path = self.snapshot_path(run_id);
        let temp_path = self.temp_path(run_id);

        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        if self.is_cancelled() {
            let _ = fs::remove_file(&temp_path).await;
            return Err(MarkflowError::Cancelled);
        }

        if let Err(e) = fs::rename(&temp_path, &final_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl ResumeStore for FileResumeStore {
    async fn read(&self, run_id: &str) -> Result<Option<ResumeState>> {
        validate_run_id(run_id)?;
        Self::read_path(&self.snapshot_path(run_id)).await
    }

    async fn write(&self, state: &ResumeState) -> Result<()> {
        let run_id = state.run_id();
        validate_run_id(run_id)?;
        if self.is_cancelled() {
            return Err(MarkflowError::Cancelled);
        }

        fs::create_dir_all(&self.dir).await?;
        let bytes = serde_json::to_vec_pretty(state)?;
        self.write_atomic(run_id, &bytes).await?;

        tracing::debug!(
            run_id = %run_id,
            path = %self.snapshot_path(run_id).display(),
            bytes = bytes.len(),
            "Snapshot written"
        );
        Ok(())
    }

    async fn delete(&self, run_id: &str) -> Result<bool> {
        validate_run_id(run_id)?;
        match fs::remove_file(self.snapshot_path(run_id)).await {
            Ok(()) => {
                tracing::debug!(run_id = %run_id, "Snapshot deleted");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_available(&self) -> Result<Vec<String>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut available = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(run_id) = file_name.to_str().and_then(Self::run_id_of) else {
                continue;
            };

            match Self::read_path(&entry.path()).await {
                Ok(Some(state)) if state.status() == RunStatus::InProgress => {
                    available.push(run_id.to_string());
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(
                        path = %entry.path().display(),
                        error = %e,
                        "Skipping unreadable snapshot"
                    );
                }
            }
        }

        available.sort();
        Ok(available)
    }

    async fn cleanup_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            let is_snapshot = Self::run_id_of(name).is_some();
            if !is_snapshot && !Self::is_temp_file(name) {
                continue;
            }

            let path = entry.path();
            let modified = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => DateTime::<Utc>::from(modified),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping snapshot without mtime");
                    continue;
                }
            };
            if modified >= cutoff {
                continue;
            }

            match fs::remove_file(&path).await {
                Ok(()) if is_snapshot => removed += 1,
                Ok(()) => tracing::debug!(path = %path.display(), "Removed stale temp file"),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove snapshot")
                }
            }
        }

        Ok(removed)
    }
}
