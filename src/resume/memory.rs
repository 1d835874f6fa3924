//! In-memory resume store with DashMap
//!
//! Same contract as the file store. Snapshots live as long as the store;
//! cleanup uses `last_checkpoint` as the modification time.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

use super::state::{ResumeState, RunStatus};
use super::{validate_run_id, ResumeStore};
use crate::error::{MarkflowError, Result};

/// Thread-safe snapshot map, cheap to clone (shared storage)
#[derive(Debug, Clone, Default)]
pub struct MemoryResumeStore {
    snapshots: Arc<DashMap<String, ResumeState>>,
    cancel: Option<CancellationToken>,
}

impl MemoryResumeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn contains(&self, run_id: &str) -> bool {
        self.snapshots.contains_key(run_id)
    }
}

#[async_trait]
impl ResumeStore for MemoryResumeStore {
    async fn read(&self, run_id: &str) -> Result<Option<ResumeState>> {
        validate_run_id(run_id)?;
        Ok(self.snapshots.get(run_id).map(|entry| entry.value().clone()))
    }

    async fn write(&self, state: &ResumeState) -> Result<()> {
        validate_run_id(state.run_id())?;
        if self.cancel.as_ref().is_some_and(|t| t.is_cancelled()) {
            return Err(MarkflowError::Cancelled);
        }
        self.snapshots
            .insert(state.run_id().to_string(), state.clone());
        Ok(())
    }

    async fn delete(&self, run_id: &str) -> Result<bool> {
        validate_run_id(run_id)?;
        Ok(self.snapshots.remove(run_id).is_some())
    }

    async fn list_available(&self) -> Result<Vec<String>> {
        let mut available: Vec<String> = self
            .snapshots
            .iter()
            .filter(|entry| entry.value().status() == RunStatus::InProgress)
            .map(|entry| entry.key().clone())
            .collect();
        available.sort();
        Ok(available)
    }

    async fn cleanup_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let stale: Vec<String> = self
            .snapshots
            .iter()
            .filter(|entry| entry.value().workflow.last_checkpoint < cutoff)
            .map(|entry| entry.key().clone())
            .collect();

        Ok(stale
            .iter()
            .filter(|run_id| self.snapshots.remove(run_id.as_str()).is_some())
            .count())
    }
}
