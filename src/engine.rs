//! Workflow engine: parse → validate → orchestrate, with checkpoints
//!
//! Fresh run:
//! 1. validate locally, then through the orchestrator
//! 2. write the initial checkpoint
//! 3. execute, racing the cancellation token
//! 4. record the terminal status (and drop the snapshot when the workflow
//!    disables resume)
//!
//! Resume runs the compatibility gate before step 3.

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::ast::Workflow;
use crate::error::{MarkflowError, Result};
use crate::orchestrator::{ExecutionResult, Orchestrator};
use crate::resume::{
    generate_run_id, prepare_resume, ExecutionContext, ResumeStore, RunStatus,
};
use crate::validate::{ValidationResult, Validator};

/// Result of a run driven by the engine
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: String,
    pub result: ExecutionResult,
    /// Local validation (warnings only, errors abort before execution)
    pub validation: ValidationResult,
}

pub struct WorkflowEngine<O, S: ?Sized> {
    orchestrator: O,
    store: Arc<S>,
    validator: Validator,
    cancel: CancellationToken,
}

impl<O, S> WorkflowEngine<O, S>
where
    O: Orchestrator,
    S: ResumeStore + ?Sized,
{
    pub fn new(orchestrator: O, store: Arc<S>) -> Self {
        Self {
            orchestrator,
            store,
            validator: Validator::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that stops in-flight runs
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Start a new run of `workflow`
    pub async fn run(&self, workflow: &Workflow) -> Result<RunOutcome> {
        self.run_with_id(workflow, generate_run_id()).await
    }

    pub async fn run_with_id(&self, workflow: &Workflow, run_id: String) -> Result<RunOutcome> {
        self.ensure_not_cancelled()?;
        let validation = self.check(workflow)?;

        let ctx = ExecutionContext::for_workflow(run_id.clone(), workflow);
        let remote = self.orchestrator.validate_workflow(workflow, &ctx).await;
        if !remote.is_valid() {
            return Err(validation_failed(&remote));
        }

        self.store.save_state(&ctx, &[]).await?;
        tracing::info!(run_id = %run_id, workflow = %workflow.display_name(), "Run started");

        let result = tokio::select! {
            _ = self.cancel.cancelled() => Err(MarkflowError::Cancelled),
            result = self.orchestrator.execute_workflow(workflow, &ctx) => result,
        };
        self.finish(&run_id, workflow, result, validation).await
    }

    /// Resume `run_id` against the workflow file at `path`
    pub async fn resume_file(&self, run_id: &str, path: &Path, force: bool) -> Result<RunOutcome> {
        self.ensure_not_cancelled()?;
        crate::ast::check_file_type(path)?;
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MarkflowError::WorkflowNotFound {
                    path: path.display().to_string(),
                }
            } else {
                e.into()
            }
        })?;
        let workflow = Workflow::parse_str_with_path(&text, path)?;
        self.resume(run_id, &workflow, &text, force).await
    }

    /// Resume `run_id` against already-read document text
    pub async fn resume(
        &self,
        run_id: &str,
        workflow: &Workflow,
        text: &str,
        force: bool,
    ) -> Result<RunOutcome> {
        self.ensure_not_cancelled()?;
        let validation = self.check(workflow)?;

        let (ctx, conversation) = prepare_resume(self.store.as_ref(), run_id, text, force).await?;
        tracing::info!(
            run_id = %run_id,
            step = ?ctx.current_step,
            messages = conversation.len(),
            "Resuming run"
        );
        if ctx.workflow_hash.as_deref() != Some(workflow.content_hash()) {
            // forced resume: later checkpoints are made against the new document
            let mut ctx = ctx;
            ctx.workflow_hash = Some(workflow.content_hash().to_string());
            self.store.save_state(&ctx, &conversation).await?;
        }

        let result = tokio::select! {
            _ = self.cancel.cancelled() => Err(MarkflowError::Cancelled),
            result = self.orchestrator.resume_workflow(run_id, workflow) => result,
        };
        self.finish(run_id, workflow, result, validation).await
    }

    fn ensure_not_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(MarkflowError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn check(&self, workflow: &Workflow) -> Result<ValidationResult> {
        let validation = self.validator.validate(workflow);
        if validation.is_valid() {
            Ok(validation)
        } else {
            Err(validation_failed(&validation))
        }
    }

    async fn finish(
        &self,
        run_id: &str,
        workflow: &Workflow,
        result: Result<ExecutionResult>,
        validation: ValidationResult,
    ) -> Result<RunOutcome> {
        let status = match &result {
            Ok(r) if r.success => RunStatus::Completed,
            Ok(_) => RunStatus::Failed,
            Err(MarkflowError::Cancelled) => RunStatus::Cancelled,
            Err(_) => RunStatus::Failed,
        };

        // the store's own token may already be cancelled; the status is best effort then
        if let Err(e) = self.store.mark_status(run_id, status).await {
            tracing::warn!(run_id = %run_id, error = %e, "Failed to record run status");
        }

        if status == RunStatus::Completed && !workflow.extensions().resume_policy().enabled {
            self.store.delete(run_id).await?;
            tracing::debug!(run_id = %run_id, "Resume disabled, snapshot removed");
        }

        tracing::info!(run_id = %run_id, %status, "Run finished");
        Ok(RunOutcome {
            run_id: run_id.to_string(),
            result: result?,
            validation,
        })
    }
}

fn validation_failed(result: &ValidationResult) -> MarkflowError {
    MarkflowError::ValidationFailed {
        count: result.errors.len(),
        summary: result.error_summary(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::MockOrchestrator;
    use crate::resume::MemoryResumeStore;

    #[tokio::test]
    async fn test_invalid_workflow_never_reaches_store() {
        let store = Arc::new(MemoryResumeStore::new());
        let engine = WorkflowEngine::new(MockOrchestrator::default(), store.clone());
        let wf = Workflow::parse_str("---\nconfig:\n  temperature: 9\n---\nbody").unwrap();

        let err = engine.run(&wf).await.unwrap_err();
        assert_eq!(err.code(), "MKF-006");
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_pre_cancelled_engine() {
        let store = Arc::new(MemoryResumeStore::new());
        let engine = WorkflowEngine::new(MockOrchestrator::default(), store);
        engine.cancellation_token().cancel();
        let wf = Workflow::parse_str("---\nname: a\n---\nbody").unwrap();
        assert!(matches!(engine.run(&wf).await, Err(MarkflowError::Cancelled)));
    }
}
