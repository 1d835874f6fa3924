//! Workflow validator
//!
//! Pure pass over a parsed [`Workflow`]: never mutates it, never fails.
//! Errors block execution, warnings are informational.

mod result;
pub mod rules;

use std::collections::BTreeSet;
use std::path::Path;

pub use result::{IssueCode, Severity, ValidationIssue, ValidationResult};

use crate::ast::Workflow;
use crate::error::Result;
use crate::registry;

/// Runs every rule group over a workflow
#[derive(Debug, Clone, Default)]
pub struct Validator {
    /// Tool names accepted in addition to the built-in registry (normalized)
    extra_tools: BTreeSet<String>,
    /// Let `a.b` resolve through a declared `a`
    nested_parameters: bool,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept additional tool names (e.g. from `validation.extra_tools`)
    pub fn with_extra_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extra_tools.extend(
            tools
                .into_iter()
                .map(|t| registry::normalize_tool_name(t.as_ref())),
        );
        self
    }

    /// Treat a dotted reference as declared when its root segment is
    pub fn with_nested_parameters(mut self, enabled: bool) -> Self {
        self.nested_parameters = enabled;
        self
    }

    pub fn validate(&self, workflow: &Workflow) -> ValidationResult {
        let mut result = ValidationResult::new(
            workflow
                .source_path()
                .map(|p| p.display().to_string()),
        );

        result.extend(rules::validate_header(workflow));
        result.extend(rules::validate_body(workflow));
        result.extend(rules::validate_extensions(workflow));
        result.extend(rules::validate_parameters(workflow, self.nested_parameters));
        result.extend(rules::validate_tools(workflow, &self.extra_tools));

        tracing::debug!(
            workflow = %workflow.display_name(),
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            "Validated workflow"
        );
        result
    }

    /// Parse and validate a workflow file
    pub async fn validate_file(&self, path: &Path) -> Result<(Workflow, ValidationResult)> {
        let workflow = Workflow::parse_file(path).await?;
        let result = self.validate(&workflow);
        Ok((workflow, result))
    }
}

/// Validate with the built-in tool registry only
pub fn validate(workflow: &Workflow) -> ValidationResult {
    Validator::new().validate(workflow)
}
