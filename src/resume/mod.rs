//! Resume State Manager
//!
//! Checkpoints conversation and variable state per run id so an interrupted
//! run can continue. Two backends share one contract:
//! - [`FileResumeStore`]: one JSON file per run id, atomic temp-file + rename
//! - [`MemoryResumeStore`]: DashMap, for tests and ephemeral runs
//!
//! At most one writer per run id is assumed. Concurrent checkpoints for the
//! same run are not arbitrated: the last rename wins.

pub mod compat;
mod file;
mod memory;
mod state;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use compat::{prepare_resume, Compatibility};
pub use file::FileResumeStore;
pub use memory::MemoryResumeStore;
pub use state::{
    ConversationMessage, ExecutionContext, ResumeState, Role, RunStatus, SnapshotMeta,
    StepRecord, StoredContext, StoredMessage, VarValue,
};

use crate::error::{MarkflowError, Result};
use crate::util::constants::MAX_RUN_ID_LEN;

/// Storage contract for run snapshots.
///
/// Backends implement the five storage primitives; the checkpoint operations
/// are provided on top of them and behave the same for every backend.
#[async_trait]
pub trait ResumeStore: Send + Sync {
    /// Raw snapshot for `run_id`, `None` when absent
    async fn read(&self, run_id: &str) -> Result<Option<ResumeState>>;

    /// Replace the snapshot for `state.workflow.id` wholesale
    async fn write(&self, state: &ResumeState) -> Result<()>;

    /// Remove a snapshot. Returns whether one existed.
    async fn delete(&self, run_id: &str) -> Result<bool>;

    /// Run ids of snapshots with status `in_progress`, sorted
    async fn list_available(&self) -> Result<Vec<String>>;

    /// Delete snapshots last modified before `cutoff`, returning the count
    async fn cleanup_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;

    /// Checkpoint runtime state. Keeps `started_at` of an existing snapshot.
    async fn save_state(
        &self,
        ctx: &ExecutionContext,
        conversation: &[ConversationMessage],
    ) -> Result<()> {
        validate_run_id(&ctx.run_id)?;
        let previous = match self.read(&ctx.run_id).await {
            Ok(previous) => previous,
            Err(MarkflowError::CorruptSnapshot { path, details }) => {
                tracing::warn!(run_id = %ctx.run_id, %path, %details, "Overwriting unreadable snapshot");
                None
            }
            Err(e) => return Err(e),
        };
        let state = ResumeState::capture(ctx, conversation, previous.as_ref());
        self.write(&state).await?;
        tracing::debug!(
            run_id = %ctx.run_id,
            messages = conversation.len(),
            variables = ctx.variables.len(),
            "Checkpoint saved"
        );
        Ok(())
    }

    /// Restore runtime state, `None` when the run was never checkpointed
    async fn load_state(
        &self,
        run_id: &str,
    ) -> Result<Option<(ExecutionContext, Vec<ConversationMessage>)>> {
        validate_run_id(run_id)?;
        Ok(self.read(run_id).await?.map(|state| state.restore()))
    }

    /// Record a finished step. A missing snapshot is logged and ignored.
    async fn track_step_completion(&self, run_id: &str, step: StepRecord) -> Result<()> {
        validate_run_id(run_id)?;
        let Some(mut state) = self.read(run_id).await? else {
            tracing::warn!(run_id = %run_id, step = %step.step_name, "No snapshot to record step completion");
            return Ok(());
        };
        state.record_step_completion(step);
        self.write(&state).await
    }

    /// Record a failed step. A missing snapshot is logged and ignored.
    async fn track_step_failure(&self, run_id: &str, step_name: &str, error: &str) -> Result<()> {
        validate_run_id(run_id)?;
        let Some(mut state) = self.read(run_id).await? else {
            tracing::warn!(run_id = %run_id, step = %step_name, "No snapshot to record step failure");
            return Ok(());
        };
        state.record_step_failure(step_name, error);
        self.write(&state).await
    }

    /// Set the run status. Returns false when no snapshot exists.
    async fn mark_status(&self, run_id: &str, status: RunStatus) -> Result<bool> {
        validate_run_id(run_id)?;
        let Some(mut state) = self.read(run_id).await? else {
            return Ok(false);
        };
        state.set_status(status);
        self.write(&state).await?;
        tracing::info!(run_id = %run_id, %status, "Run status updated");
        Ok(true)
    }

    /// Check the stored content hash against `current_text`
    async fn validate_compatibility(&self, run_id: &str, current_text: &str) -> Result<bool> {
        validate_run_id(run_id)?;
        let snapshot = self.read(run_id).await?;
        Ok(compat::check(snapshot.as_ref(), current_text).is_compatible())
    }

    /// Delete snapshots older than `max_age`
    async fn cleanup(&self, max_age: Duration) -> Result<usize> {
        let age = chrono::Duration::from_std(max_age).map_err(|e| MarkflowError::ConfigError {
            reason: format!("retention {:?} is out of range: {}", max_age, e),
        })?;
        let cutoff = Utc::now()
            .checked_sub_signed(age)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let removed = self.cleanup_before(cutoff).await?;
        tracing::info!(removed, cutoff = %cutoff, "Snapshot cleanup finished");
        Ok(removed)
    }
}

/// Run ids become file names: ASCII alphanumerics, `-` and `_` only.
pub fn validate_run_id(run_id: &str) -> Result<()> {
    let invalid = |reason: &str| MarkflowError::InvalidRunId {
        run_id: run_id.to_string(),
        reason: reason.to_string(),
    };

    if run_id.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if run_id.len() > MAX_RUN_ID_LEN {
        return Err(invalid(&format!("longer than {} characters", MAX_RUN_ID_LEN)));
    }
    if let Some(c) = run_id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(invalid(&format!("character {:?} is not allowed", c)));
    }
    Ok(())
}

/// New run id: `YYYYMMDDTHHMMSS-xxxx`
pub fn generate_run_id() -> String {
    format!(
        "{}-{:04x}",
        Utc::now().format("%Y%m%dT%H%M%S"),
        rand::random::<u16>()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_run_id() {
        assert!(validate_run_id("20250101T120000-ab12").is_ok());
        assert!(validate_run_id("my_run-1").is_ok());
        for bad in ["", "../etc/passwd", "a/b", "a.json", "run id"] {
            let err = validate_run_id(bad).unwrap_err();
            assert_eq!(err.code(), "MKF-023", "{bad:?} must be rejected");
        }
        assert!(validate_run_id(&"x".repeat(MAX_RUN_ID_LEN + 1)).is_err());
    }

    #[test]
    fn test_generate_run_id_shape() {
        let id = generate_run_id();
        assert!(validate_run_id(&id).is_ok());
        let (stamp, suffix) = id.split_once('-').unwrap();
        assert_eq!(stamp.len(), 15);
        assert_eq!(&stamp[8..9], "T");
        assert_eq!(suffix.len(), 4);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
