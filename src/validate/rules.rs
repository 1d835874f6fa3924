//! Validation rules
//!
//! Each rule group looks at one part of the workflow:
//! - header: name and model config ranges
//! - body: non-empty instructions
//! - extensions: MCP servers, sub-workflow declarations, unknown keys
//! - references: parameters against the input schema, tools against the registry

use std::collections::BTreeSet;

use crate::ast::Workflow;
use crate::registry::{self, EXT_MCP, EXT_SUB_WORKFLOWS};
use crate::util::constants::{TEMPERATURE_MAX, TEMPERATURE_MIN, TOP_P_MAX, TOP_P_MIN};

use super::result::{IssueCode, ValidationIssue};

/// Header present ⇒ name required; config values in range
pub fn validate_header(workflow: &Workflow) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    let has_name = workflow
        .name()
        .is_some_and(|name| !name.trim().is_empty());
    if workflow.has_header() && !has_name {
        issues.push(
            ValidationIssue::new(IssueCode::MissingName, "Workflow header must declare a name")
                .with_field("name"),
        );
    }

    let config = workflow.config();
    if let Some(t) = config.temperature {
        if !(TEMPERATURE_MIN..=TEMPERATURE_MAX).contains(&t) {
            issues.push(
                ValidationIssue::new(
                    IssueCode::TemperatureOutOfRange,
                    format!(
                        "Temperature {} is outside [{:.1}, {:.1}]",
                        t, TEMPERATURE_MIN, TEMPERATURE_MAX
                    ),
                )
                .with_field("config.temperature"),
            );
        }
    }

    if let Some(tokens) = config.max_output_tokens {
        if tokens <= 0 {
            issues.push(
                ValidationIssue::new(
                    IssueCode::MaxOutputTokensInvalid,
                    format!("MaxOutputTokens must be greater than 0, got {}", tokens),
                )
                .with_field("config.maxOutputTokens"),
            );
        }
    }

    if let Some(p) = config.top_p {
        if !(TOP_P_MIN..=TOP_P_MAX).contains(&p) {
            issues.push(
                ValidationIssue::new(
                    IssueCode::TopPOutOfRange,
                    format!("TopP {} is outside [{:.1}, {:.1}]", p, TOP_P_MIN, TOP_P_MAX),
                )
                .with_field("config.topP"),
            );
        }
    }

    issues
}

pub fn validate_body(workflow: &Workflow) -> Vec<ValidationIssue> {
    if workflow.content().has_text() {
        return Vec::new();
    }
    vec![ValidationIssue::new(
        IssueCode::EmptyBody,
        "Workflow body is empty: add instructions after the header",
    )
    .with_line(Some(workflow.content().body_line))]
}

pub fn validate_extensions(workflow: &Workflow) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let extensions = workflow.extensions();

    for (i, server) in extensions.mcp.iter().enumerate() {
        if server.server.trim().is_empty() {
            issues.push(
                ValidationIssue::new(
                    IssueCode::McpMissingServer,
                    format!("MCP entry #{} has no server identifier", i + 1),
                )
                .with_field(format!("{}[{}].server", EXT_MCP, i)),
            );
        }
    }

    let declared: BTreeSet<&str> = extensions
        .sub_workflows
        .iter()
        .filter_map(|s| s.name.as_deref())
        .collect();

    for (i, decl) in extensions.sub_workflows.iter().enumerate() {
        let label = decl
            .name
            .clone()
            .unwrap_or_else(|| format!("#{}", i + 1));

        if decl.path.trim().is_empty() {
            issues.push(
                ValidationIssue::new(
                    IssueCode::SubWorkflowMissingPath,
                    format!("Sub-workflow {} has no path", label),
                )
                .with_field(format!("{}[{}].path", EXT_SUB_WORKFLOWS, i)),
            );
        }

        for dep in &decl.depends_on {
            if !declared.contains(dep.as_str()) {
                issues.push(
                    ValidationIssue::new(
                        IssueCode::UnknownDependency,
                        format!("Sub-workflow {} depends on undeclared '{}'", label, dep),
                    )
                    .with_field(format!("{}[{}].depends-on", EXT_SUB_WORKFLOWS, i)),
                );
            }
        }
    }

    for key in workflow.extension_fields().keys() {
        if !registry::is_known_extension(key) {
            issues.push(
                ValidationIssue::new(
                    IssueCode::UnknownExtension,
                    format!("Unrecognized extension key '{}' is kept but not interpreted", key),
                )
                .with_field(key.clone()),
            );
        }
    }

    issues
}

/// Parameter references against `input.schema`.
///
/// A reference is declared only when its exact name is a schema key. With
/// `nested_roots`, `a.b` also counts as declared when its root segment `a` is.
pub fn validate_parameters(workflow: &Workflow, nested_roots: bool) -> Vec<ValidationIssue> {
    let refs: BTreeSet<&str> = workflow
        .content()
        .parameter_references
        .iter()
        .map(String::as_str)
        .collect();
    if refs.is_empty() {
        return Vec::new();
    }

    let Some(schema) = workflow.input().schema.as_ref() else {
        return vec![ValidationIssue::new(
            IssueCode::InputSchemaMissing,
            format!(
                "Body references {} parameter(s) but no input schema is defined",
                refs.len()
            ),
        )
        .with_field("input.schema")];
    };

    refs.into_iter()
        .filter(|ident| {
            if schema.contains_key(*ident) {
                return false;
            }
            let root = ident.split('.').next().unwrap_or(*ident);
            !(nested_roots && schema.contains_key(root))
        })
        .map(|ident| {
            ValidationIssue::new(
                IssueCode::UndeclaredParameter,
                format!("Parameter '{}' is not declared in input schema", ident),
            )
            .with_line(workflow.content().parameter_line(ident))
        })
        .collect()
}

/// Declared and detected tools against the registry plus `extra_tools`
pub fn validate_tools(workflow: &Workflow, extra_tools: &BTreeSet<String>) -> Vec<ValidationIssue> {
    let mut seen = BTreeSet::new();
    let mut issues = Vec::new();

    let detected: BTreeSet<&String> = workflow.content().tool_references.iter().collect();
    for (i, tool) in workflow.tools().iter().chain(detected).enumerate() {
        let normalized = registry::normalize_tool_name(tool);
        if !seen.insert(normalized.clone()) {
            continue;
        }
        if registry::is_builtin_tool(&normalized) || extra_tools.contains(&normalized) {
            continue;
        }
        let mut issue = ValidationIssue::new(
            IssueCode::UnknownTool,
            format!("Tool '{}' is not a known tool", tool),
        );
        if i < workflow.tools().len() {
            issue = issue.with_field(format!("tools[{}]", i));
        }
        issues.push(issue);
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Workflow {
        Workflow::parse_str(text).unwrap()
    }

    #[test]
    fn test_temperature_range() {
        let hot = parse("---\nname: a\nconfig:\n  temperature: 5.0\n---\nbody");
        let issues = validate_header(&hot);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("Temperature"));

        let ok = parse("---\nname: a\nconfig:\n  temperature: 0.7\n---\nbody");
        assert!(validate_header(&ok).is_empty());
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        let wf = parse("---\nname: a\nconfig:\n  temperature: 2.0\n  topP: 0.0\n---\nbody");
        assert!(validate_header(&wf).is_empty());
    }

    #[test]
    fn test_max_tokens_and_top_p() {
        let wf = parse("---\nname: a\nconfig:\n  maxOutputTokens: 0\n  topP: 1.5\n---\nbody");
        let codes: Vec<_> = validate_header(&wf).iter().map(|i| i.code).collect();
        assert_eq!(
            codes,
            vec![IssueCode::MaxOutputTokensInvalid, IssueCode::TopPOutOfRange]
        );
    }

    #[test]
    fn test_missing_name_only_with_header() {
        let headed = parse("---\nmodel: x\n---\nbody");
        assert_eq!(validate_header(&headed)[0].code, IssueCode::MissingName);

        let blank = parse("---\nname: \"  \"\n---\nbody");
        assert_eq!(validate_header(&blank)[0].code, IssueCode::MissingName);

        let bare = parse("body only");
        assert!(validate_header(&bare).is_empty());
    }

    const DOTTED: &str =
        "---\nname: a\ninput:\n  schema:\n    config: {type: object}\n---\n{{config.environment}} {{other}}";

    #[test]
    fn test_dotted_reference_needs_exact_key() {
        let wf = parse(DOTTED);
        let issues = validate_parameters(&wf, false);
        let messages: Vec<_> = issues.iter().map(|i| i.message.as_str()).collect();
        assert_eq!(issues.len(), 2, "{messages:?}");
        assert!(messages[0].contains("'config.environment'"));
        assert!(messages[1].contains("'other'"));
        assert!(issues.iter().all(|i| i.code == IssueCode::UndeclaredParameter));
    }

    #[test]
    fn test_dotted_reference_exact_key_declared() {
        let wf = parse(
            "---\nname: a\ninput:\n  schema:\n    config.environment: {type: string}\n---\n{{config.environment}}",
        );
        assert!(validate_parameters(&wf, false).is_empty());
    }

    #[test]
    fn test_dotted_reference_root_segment_when_enabled() {
        let wf = parse(DOTTED);
        let issues = validate_parameters(&wf, true);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("'other'"));
        assert_eq!(issues[0].line, Some(7));
    }

    #[test]
    fn test_tools_deduplicated_and_extra_tools_accepted() {
        let wf = parse("---\nname: a\ntools: [web-search, Web_Search, build-test, custom]\n---\nUse build_test.");
        let extra: BTreeSet<String> = ["custom".to_string()].into_iter().collect();
        let issues = validate_tools(&wf, &extra);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field.as_deref(), Some("tools[0]"));
    }

    #[test]
    fn test_unknown_dependency() {
        let wf = parse(
            "---\nname: a\nmarkflow.sub-workflows:\n  - name: b\n    path: ./b.md\n    depends-on: [c]\n---\nbody",
        );
        let issues = validate_extensions(&wf);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, IssueCode::UnknownDependency);
    }
}
