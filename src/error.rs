// The #[error] attribute from thiserror uses struct fields via string interpolation,
// but Rust's unused_assignments lint doesn't recognize this.
#![allow(unused_assignments)]

//! Markflow Error Types with Error Codes
//!
//! Error code ranges:
//! - MKF-000-009: Document parse errors (fatal, no `Workflow` exists)
//! - MKF-020-029: Resume/snapshot errors
//! - MKF-030-039: Orchestrator errors
//! - MKF-040-049: Configuration errors
//! - MKF-090-099: IO/serialization/cancellation
//!
//! Validation outcomes are NOT errors: they are reported through
//! [`ValidationResult`](crate::validate::ValidationResult).

use miette::Diagnostic;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MarkflowError>;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// Format an optional line/column pair as ` at line L, column C`
fn format_location(line: &Option<usize>, column: &Option<usize>) -> String {
    match (line, column) {
        (Some(l), Some(c)) => format!(" at line {}, column {}", l, c),
        (Some(l), None) => format!(" at line {}", l),
        _ => String::new(),
    }
}

#[derive(Error, Debug, Diagnostic)]
pub enum MarkflowError {
    // ═══════════════════════════════════════════
    // DOCUMENT PARSE ERRORS (000-009)
    // ═══════════════════════════════════════════
    #[error("[MKF-001] Failed to parse workflow header{}: {details}", format_location(.line, .column))]
    #[diagnostic(
        code(markflow::parse_error),
        help("Check front matter YAML syntax: indentation and quoting")
    )]
    ParseError {
        details: String,
        line: Option<usize>,
        column: Option<usize>,
    },

    #[error("[MKF-002] Workflow document is empty")]
    #[diagnostic(code(markflow::empty_document))]
    EmptyDocument,

    #[error("[MKF-003] Workflow file not found: {path}")]
    #[diagnostic(code(markflow::workflow_not_found), help("Check the file path exists"))]
    WorkflowNotFound { path: String },

    #[error("[MKF-004] Unsupported workflow file type: {path}")]
    #[diagnostic(code(markflow::invalid_file_type))]
    InvalidFileType { path: String },

    #[error("[MKF-005] Header field '{field}' cannot be read as {target}: {details}")]
    #[diagnostic(code(markflow::header_type))]
    HeaderType {
        field: String,
        target: &'static str,
        details: String,
    },

    #[error("[MKF-006] Workflow validation failed with {count} error(s): {summary}")]
    #[diagnostic(code(markflow::validation_failed))]
    ValidationFailed { count: usize, summary: String },

    // ═══════════════════════════════════════════
    // RESUME ERRORS (020-029)
    // ═══════════════════════════════════════════
    #[error("[MKF-020] No saved state for run '{run_id}'")]
    #[diagnostic(code(markflow::snapshot_not_found))]
    SnapshotNotFound { run_id: String },

    #[error("[MKF-021] Saved state for run '{run_id}' was created against a different document ({stored} != {current})")]
    #[diagnostic(
        code(markflow::incompatible_snapshot),
        help("The workflow file changed since the checkpoint; force the resume or start a new run")
    )]
    IncompatibleSnapshot {
        run_id: String,
        stored: String,
        current: String,
    },

    #[error("[MKF-022] Snapshot '{path}' is unreadable: {details}")]
    #[diagnostic(code(markflow::corrupt_snapshot))]
    CorruptSnapshot { path: String, details: String },

    #[error("[MKF-023] Invalid run id '{run_id}': {reason}")]
    #[diagnostic(code(markflow::invalid_run_id))]
    InvalidRunId { run_id: String, reason: String },

    // ═══════════════════════════════════════════
    // ORCHESTRATOR ERRORS (030-039)
    // ═══════════════════════════════════════════
    #[error("[MKF-030] Orchestrator error: {reason}")]
    #[diagnostic(code(markflow::orchestrator))]
    Orchestrator { reason: String },

    // ═══════════════════════════════════════════
    // CONFIG ERRORS (040-049)
    // ═══════════════════════════════════════════
    #[error("[MKF-040] Config error: {reason}")]
    #[diagnostic(code(markflow::config))]
    ConfigError { reason: String },

    // ═══════════════════════════════════════════
    // IO / SERIALIZATION (090-099)
    // ═══════════════════════════════════════════
    #[error("[MKF-090] IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("[MKF-091] JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("[MKF-092] Operation cancelled")]
    Cancelled,
}

impl MarkflowError {
    /// Get the error code (e.g., "MKF-001")
    pub fn code(&self) -> &'static str {
        match self {
            Self::ParseError { .. } => "MKF-001",
            Self::EmptyDocument => "MKF-002",
            Self::WorkflowNotFound { .. } => "MKF-003",
            Self::InvalidFileType { .. } => "MKF-004",
            Self::HeaderType { .. } => "MKF-005",
            Self::ValidationFailed { .. } => "MKF-006",
            Self::SnapshotNotFound { .. } => "MKF-020",
            Self::IncompatibleSnapshot { .. } => "MKF-021",
            Self::CorruptSnapshot { .. } => "MKF-022",
            Self::InvalidRunId { .. } => "MKF-023",
            Self::Orchestrator { .. } => "MKF-030",
            Self::ConfigError { .. } => "MKF-040",
            Self::IoError(_) => "MKF-090",
            Self::JsonError(_) => "MKF-091",
            Self::Cancelled => "MKF-092",
        }
    }

    /// Parse failures are fatal: no `Workflow` can exist after them.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ParseError { .. }
                | Self::EmptyDocument
                | Self::WorkflowNotFound { .. }
                | Self::InvalidFileType { .. }
                | Self::HeaderType { .. }
        )
    }

    /// Line reported by the underlying YAML error, if any
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::ParseError { line, .. } => *line,
            _ => None,
        }
    }

    /// Column reported by the underlying YAML error, if any
    pub fn column(&self) -> Option<usize> {
        match self {
            Self::ParseError { column, .. } => *column,
            _ => None,
        }
    }
}

impl FixSuggestion for MarkflowError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            MarkflowError::ParseError { .. } => {
                Some("Check front matter YAML syntax: indentation and quoting")
            }
            MarkflowError::EmptyDocument => Some("Add instructions to the workflow body"),
            MarkflowError::WorkflowNotFound { .. } => Some("Check the file path exists"),
            MarkflowError::InvalidFileType { .. } => {
                Some("Workflow files must use the .prompt.md or .md extension")
            }
            MarkflowError::HeaderType { .. } => {
                Some("Check the field's shape: lists use '- item', maps use 'key: value'")
            }
            MarkflowError::ValidationFailed { .. } => {
                Some("Run 'markflow validate <file>' for the full list of issues")
            }
            MarkflowError::SnapshotNotFound { .. } => {
                Some("Run 'markflow resume list' to see resumable runs")
            }
            MarkflowError::IncompatibleSnapshot { .. } => {
                Some("Restore the original workflow file or force the resume")
            }
            MarkflowError::CorruptSnapshot { .. } => {
                Some("Delete the snapshot file and start a new run")
            }
            MarkflowError::InvalidRunId { .. } => {
                Some("Run ids may only contain letters, digits, '-' and '_'")
            }
            MarkflowError::Orchestrator { .. } => None,
            MarkflowError::ConfigError { .. } => {
                Some("Check ~/.config/markflow/config.toml syntax")
            }
            MarkflowError::IoError(_) => Some("Check file path and permissions"),
            MarkflowError::JsonError(_) => None,
            MarkflowError::Cancelled => None,
        }
    }
}
