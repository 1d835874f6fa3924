//! Validation outcome types
//!
//! Validation never fails: every finding is a [`ValidationIssue`] routed to
//! `errors` or `warnings` by the severity of its [`IssueCode`].

use std::fmt;

use serde::Serialize;

/// Severity of validation issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Stable machine-readable issue codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    MissingName,
    TemperatureOutOfRange,
    MaxOutputTokensInvalid,
    TopPOutOfRange,
    EmptyBody,
    McpMissingServer,
    SubWorkflowMissingPath,
    InputSchemaMissing,
    UndeclaredParameter,
    UnknownTool,
    UnknownExtension,
    UnknownDependency,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingName => "missing_name",
            Self::TemperatureOutOfRange => "temperature_out_of_range",
            Self::MaxOutputTokensInvalid => "max_output_tokens_invalid",
            Self::TopPOutOfRange => "top_p_out_of_range",
            Self::EmptyBody => "empty_body",
            Self::McpMissingServer => "mcp_missing_server",
            Self::SubWorkflowMissingPath => "sub_workflow_missing_path",
            Self::InputSchemaMissing => "input_schema_missing",
            Self::UndeclaredParameter => "undeclared_parameter",
            Self::UnknownTool => "unknown_tool",
            Self::UnknownExtension => "unknown_extension",
            Self::UnknownDependency => "unknown_dependency",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::InputSchemaMissing
            | Self::UndeclaredParameter
            | Self::UnknownTool
            | Self::UnknownExtension
            | Self::UnknownDependency => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Get suggestion for fixing this issue
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::MissingName => Some("Add `name: \"...\"` to the header"),
            Self::TemperatureOutOfRange => Some("Use a temperature between 0.0 and 2.0"),
            Self::MaxOutputTokensInvalid => Some("Use a positive maxOutputTokens value"),
            Self::TopPOutOfRange => Some("Use a topP between 0.0 and 1.0"),
            Self::EmptyBody => Some("Add instructions after the closing `---`"),
            Self::McpMissingServer => Some("Set `server:` on every markflow.mcp entry"),
            Self::SubWorkflowMissingPath => {
                Some("Set `path:` on every markflow.sub-workflows entry")
            }
            Self::InputSchemaMissing | Self::UndeclaredParameter => {
                Some("Declare the parameter under `input.schema`")
            }
            Self::UnknownTool => Some("Check the tool name or add it to validation.extra_tools"),
            Self::UnknownExtension | Self::UnknownDependency => None,
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single validation finding with optional position
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub message: String,
    pub code: IssueCode,
    pub line: Option<usize>,
    pub column: Option<usize>,
    /// Header field path, e.g. `config.temperature`
    pub field: Option<String>,
}

impl ValidationIssue {
    pub fn new(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
            line: None,
            column: None,
            field: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_line(mut self, line: Option<usize>) -> Self {
        self.line = line;
        self
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        match (self.line, self.column) {
            (Some(l), Some(c)) => write!(f, " (line {}, column {})", l, c),
            (Some(l), None) => write!(f, " (line {})", l),
            _ => Ok(()),
        }
    }
}

/// Result of validating a workflow
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationResult {
    pub file_path: Option<String>,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn new(file_path: Option<String>) -> Self {
        Self {
            file_path,
            ..Default::default()
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Route an issue by the severity of its code
    pub fn add(&mut self, issue: ValidationIssue) {
        match issue.severity() {
            Severity::Error => self.errors.push(issue),
            Severity::Warning => self.warnings.push(issue),
        }
    }

    pub fn extend(&mut self, issues: impl IntoIterator<Item = ValidationIssue>) {
        for issue in issues {
            self.add(issue);
        }
    }

    /// Check whether any error or warning carries `code`
    pub fn has_code(&self, code: IssueCode) -> bool {
        self.errors
            .iter()
            .chain(self.warnings.iter())
            .any(|issue| issue.code == code)
    }

    /// One-line summary of the errors, used in `ValidationFailed`
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_code_severity() {
        assert_eq!(IssueCode::MissingName.severity(), Severity::Error);
        assert_eq!(IssueCode::UnknownTool.severity(), Severity::Warning);
        assert_eq!(IssueCode::TopPOutOfRange.as_str(), "top_p_out_of_range");
    }

    #[test]
    fn test_add_routes_by_severity() {
        let mut result = ValidationResult::new(Some("a.prompt.md".into()));
        result.add(ValidationIssue::new(IssueCode::UnknownTool, "unknown tool 'x'"));
        assert!(result.is_valid());
        assert!(result.has_warnings());

        result.add(ValidationIssue::new(IssueCode::EmptyBody, "body is empty"));
        assert!(!result.is_valid());
        assert_eq!(result.errors.len(), 1);
        assert!(result.has_code(IssueCode::EmptyBody));
        assert_eq!(result.error_summary(), "body is empty");
    }

    #[test]
    fn test_issue_display() {
        let issue = ValidationIssue::new(IssueCode::UndeclaredParameter, "'x' is not declared")
            .with_line(Some(7));
        assert_eq!(issue.to_string(), "[undeclared_parameter] 'x' is not declared (line 7)");
    }

    #[test]
    fn test_issue_serializes_code_as_snake_case() {
        let issue = ValidationIssue::new(IssueCode::McpMissingServer, "m").with_field("markflow.mcp[0]");
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["code"], "mcp_missing_server");
        assert_eq!(json["field"], "markflow.mcp[0]");
    }
}
