//! Compatibility between a snapshot and the current document
//!
//! A snapshot may only be resumed against the document text it was created
//! from. Snapshots without a stored hash are accepted.

use super::state::{ConversationMessage, ExecutionContext, ResumeState};
use super::{validate_run_id, ResumeStore};
use crate::error::{MarkflowError, Result};
use crate::util::content_hash;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compatibility {
    /// No snapshot exists
    FirstRun,
    /// Snapshot predates hashing
    NoStoredHash,
    Match,
    Mismatch { stored: String, current: String },
}

impl Compatibility {
    pub fn is_compatible(&self) -> bool {
        !matches!(self, Self::Mismatch { .. })
    }
}

pub fn check(snapshot: Option<&ResumeState>, current_text: &str) -> Compatibility {
    let Some(snapshot) = snapshot else {
        return Compatibility::FirstRun;
    };
    let Some(stored) = snapshot.workflow.content_hash.as_deref() else {
        return Compatibility::NoStoredHash;
    };

    let current = content_hash(current_text);
    if stored == current {
        Compatibility::Match
    } else {
        Compatibility::Mismatch {
            stored: stored.to_string(),
            current,
        }
    }
}

/// Load a snapshot for resuming, gated on compatibility.
///
/// Missing snapshot ⇒ `SnapshotNotFound`; hash mismatch ⇒
/// `IncompatibleSnapshot` unless `force`.
pub async fn prepare_resume<S>(
    store: &S,
    run_id: &str,
    current_text: &str,
    force: bool,
) -> Result<(ExecutionContext, Vec<ConversationMessage>)>
where
    S: ResumeStore + ?Sized,
{
    validate_run_id(run_id)?;
    let Some(snapshot) = store.read(run_id).await? else {
        return Err(MarkflowError::SnapshotNotFound {
            run_id: run_id.to_string(),
        });
    };

    match check(Some(&snapshot), current_text) {
        Compatibility::Mismatch { stored, current } if !force => {
            return Err(MarkflowError::IncompatibleSnapshot {
                run_id: run_id.to_string(),
                stored,
                current,
            });
        }
        Compatibility::Mismatch { stored, current } => {
            tracing::warn!(run_id = %run_id, %stored, %current, "Forcing resume against a changed document");
        }
        Compatibility::NoStoredHash => {
            tracing::info!(run_id = %run_id, "Snapshot has no content hash, resuming without check");
        }
        Compatibility::Match | Compatibility::FirstRun => {}
    }

    if snapshot.status().is_terminal() {
        tracing::warn!(run_id = %run_id, status = %snapshot.status(), "Resuming a run that already ended");
    }

    Ok(snapshot.restore())
}
