//! Orchestrator boundary
//!
//! Model calls, tool invocation and streaming live behind this trait. The
//! engine hands it a validated [`Workflow`]; on resume it hands a run id and
//! the orchestrator pulls state from the [`ResumeStore`](crate::resume::ResumeStore).

use std::time::Duration;

use async_trait::async_trait;

use crate::ast::Workflow;
use crate::error::Result;
use crate::resume::ExecutionContext;
use crate::validate::{ValidationResult, Validator};

/// Outcome of one orchestrated run
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub success: bool,
    pub output: Option<String>,
    pub error: Option<String>,
    pub duration: Duration,
}

impl ExecutionResult {
    pub fn success(output: impl Into<String>, duration: Duration) -> Self {
        Self {
            success: true,
            output: Some(output.into()),
            error: None,
            duration,
        }
    }

    pub fn failed(error: impl Into<String>, duration: Duration) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
            duration,
        }
    }
}

/// Executes workflows on behalf of the engine
///
/// # Example
/// ```rust,ignore
/// let result = orchestrator.execute_workflow(&workflow, &ctx).await?;
/// ```
#[async_trait]
pub trait Orchestrator: Send + Sync {
    async fn execute_workflow(
        &self,
        workflow: &Workflow,
        ctx: &ExecutionContext,
    ) -> Result<ExecutionResult>;

    /// Orchestrator-side validation (model availability, tool wiring, ...)
    async fn validate_workflow(&self, workflow: &Workflow, ctx: &ExecutionContext) -> ValidationResult;

    async fn resume_workflow(&self, run_id: &str, workflow: &Workflow) -> Result<ExecutionResult>;
}

/// Mock orchestrator for testing
///
/// Succeeds with `"Mock response"` unless built with [`MockOrchestrator::failing`].
#[derive(Debug, Clone, Default)]
pub struct MockOrchestrator {
    fail_with: Option<String>,
    delay: Duration,
}

impl MockOrchestrator {
    pub fn failing(error: impl Into<String>) -> Self {
        Self {
            fail_with: Some(error.into()),
            ..Default::default()
        }
    }

    /// Wait before answering (cancellation tests)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    async fn respond(&self) -> ExecutionResult {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.fail_with {
            Some(error) => ExecutionResult::failed(error.clone(), self.delay),
            None => ExecutionResult::success("Mock response", self.delay),
        }
    }
}

#[async_trait]
impl Orchestrator for MockOrchestrator {
    async fn execute_workflow(
        &self,
        _workflow: &Workflow,
        _ctx: &ExecutionContext,
    ) -> Result<ExecutionResult> {
        Ok(self.respond().await)
    }

    async fn validate_workflow(&self, workflow: &Workflow, _ctx: &ExecutionContext) -> ValidationResult {
        Validator::new().validate(workflow)
    }

    async fn resume_workflow(&self, _run_id: &str, _workflow: &Workflow) -> Result<ExecutionResult> {
        Ok(self.respond().await)
    }
}
