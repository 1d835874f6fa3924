//! Body processing: parameter, sub-workflow and tool references
//!
//! ```markdown
//! Analyze {{project_path}} for {{config.environment}}.
//!
//! > Execute: ./analyze.prompt.md
//! > Parameters:
//! > - depth: "2"
//! ```
//!
//! Sub-workflow blocks are read by a small line state machine. Fenced code
//! blocks are skipped for sub-workflow detection and for the outline.

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::registry;

/// `{{ ... }}` token, inner text captured verbatim
static PARAM_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^{}]*)\}\}").unwrap());

static PARAM_IDENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").unwrap());

static EXECUTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*>\s*Execute:\s*(.*?)\s*$").unwrap());

static PARAMETERS_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*>\s*Parameters:").unwrap());

static PARAMETER_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*>\s*-\s*([^:]+?)\s*:\s*(.*?)\s*$").unwrap());

static BLANK_QUOTE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*>\s*$").unwrap());

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+?)\s*#*\s*$").unwrap());

/// `> Execute: <path>` block found in the body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubWorkflowReference {
    pub path: String,
    pub parameters: BTreeMap<String, String>,
    /// 1-based document line of the `> Execute:` line
    pub line_number: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
    pub line: usize,
}

/// Structural outline of the body, used for structural checks only
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentOutline {
    pub headings: Vec<Heading>,
    pub code_blocks: usize,
}

/// Processed workflow body
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Content {
    pub body: String,
    /// Document line the body starts on
    pub body_line: usize,
    pub outline: DocumentOutline,
    pub parameter_references: HashSet<String>,
    /// Document order
    pub sub_workflow_references: Vec<SubWorkflowReference>,
    /// Built-in tools mentioned in prose, hyphen-case
    pub tool_references: HashSet<String>,
}

impl Content {
    /// Run every extraction pass over `body`.
    ///
    /// `body_line` is the document line the body starts on; recorded line
    /// numbers are document lines.
    pub fn process(body: &str, body_line: usize) -> Self {
        let body_line = body_line.max(1);
        let scan = scan_lines(body, body_line);
        Self {
            body: body.to_string(),
            body_line,
            outline: scan.outline,
            parameter_references: extract_parameter_references(body),
            sub_workflow_references: scan.references,
            tool_references: registry::detect_tool_mentions(body)
                .map(str::to_string)
                .collect(),
        }
    }

    /// Body has any non-whitespace text
    pub fn has_text(&self) -> bool {
        !self.body.trim().is_empty()
    }

    /// Document line of the first `{{ident}}` occurrence
    pub fn parameter_line(&self, ident: &str) -> Option<usize> {
        self.body
            .lines()
            .position(|line| extract_parameter_references(line).contains(ident))
            .map(|idx| self.body_line + idx)
    }
}

/// Collect every well-formed `{{ident}}`; malformed tokens are skipped.
pub fn extract_parameter_references(text: &str) -> HashSet<String> {
    PARAM_TOKEN_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|ident| PARAM_IDENT_RE.is_match(ident))
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Scanning,
    /// After `> Execute:`, waiting for `> Parameters:`
    AwaitingParameters,
    InParameters,
}

struct LineScan {
    outline: DocumentOutline,
    references: Vec<SubWorkflowReference>,
}

fn is_fence(line: &str) -> bool {
    let t = line.trim_start();
    t.starts_with("```") || t.starts_with("~~~")
}

fn strip_quotes(value: &str) -> &str {
    let v = value.trim();
    for quote in ['"', '\''] {
        if v.len() >= 2 && v.starts_with(quote) && v.ends_with(quote) {
            return &v[1..v.len() - 1];
        }
    }
    v
}

fn scan_lines(body: &str, body_line: usize) -> LineScan {
    let lines: Vec<&str> = body.lines().collect();
    let mut outline = DocumentOutline::default();
    let mut references: Vec<SubWorkflowReference> = Vec::new();
    let mut state = ScanState::Scanning;
    let mut in_fence = false;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        if in_fence {
            if is_fence(line) {
                in_fence = false;
            }
            i += 1;
            continue;
        }
        if is_fence(line) {
            in_fence = true;
            outline.code_blocks += 1;
            state = ScanState::Scanning;
            i += 1;
            continue;
        }

        match state {
            ScanState::Scanning => {
                if let Some(caps) = EXECUTE_RE.captures(line) {
                    let path = caps.get(1).map_or("", |m| m.as_str());
                    if !path.is_empty() {
                        references.push(SubWorkflowReference {
                            path: path.to_string(),
                            parameters: BTreeMap::new(),
                            line_number: body_line + i,
                        });
                        state = ScanState::AwaitingParameters;
                    }
                } else if let Some(caps) = HEADING_RE.captures(line) {
                    outline.headings.push(Heading {
                        level: caps[1].len() as u8,
                        text: caps[2].to_string(),
                        line: body_line + i,
                    });
                }
                i += 1;
            }
            ScanState::AwaitingParameters => {
                if BLANK_QUOTE_RE.is_match(line) {
                    i += 1;
                } else if PARAMETERS_HEADER_RE.is_match(line) {
                    state = ScanState::InParameters;
                    i += 1;
                } else {
                    // reprocess this line
                    state = ScanState::Scanning;
                }
            }
            ScanState::InParameters => {
                match (PARAMETER_LINE_RE.captures(line), references.last_mut()) {
                    (Some(caps), Some(reference)) => {
                        reference
                            .parameters
                            .insert(caps[1].to_string(), strip_quotes(&caps[2]).to_string());
                        i += 1;
                    }
                    _ => state = ScanState::Scanning,
                }
            }
        }
    }

    LineScan {
        outline,
        references,
    }
}
