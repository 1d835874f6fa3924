//! Built-in tool and extension-key registry
//!
//! Single source of truth shared by the body processor (tool mention
//! detection) and the validator (unknown tool / unknown extension warnings).

use std::sync::LazyLock;

use regex::Regex;

use crate::util::constants::EXTENSION_PREFIX;

/// Tool identifiers the engine ships with, in canonical hyphen-case.
pub const BUILTIN_TOOLS: &[&str] = &["project-analysis", "build-test", "file-system"];

pub const EXT_MCP: &str = "markflow.mcp";
pub const EXT_SUB_WORKFLOWS: &str = "markflow.sub-workflows";
pub const EXT_RESUME: &str = "markflow.resume";
pub const EXT_ERROR_HANDLING: &str = "markflow.error-handling";

/// Extension keys with a typed sub-model.
pub const KNOWN_EXTENSION_KEYS: &[&str] =
    &[EXT_MCP, EXT_SUB_WORKFLOWS, EXT_RESUME, EXT_ERROR_HANDLING];

/// One detection pattern per built-in tool.
///
/// `project-analysis` matches `Project_Analysis`, `project-analysis`, ...
static TOOL_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    BUILTIN_TOOLS
        .iter()
        .map(|name| {
            let body = name
                .split('-')
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join("[-_]");
            let re = Regex::new(&format!(r"(?i)\b{}\b", body)).unwrap();
            (*name, re)
        })
        .collect()
});

/// Normalize a tool name to lowercase hyphen-case.
pub fn normalize_tool_name(name: &str) -> String {
    name.trim().to_ascii_lowercase().replace('_', "-")
}

/// Check whether a (possibly non-normalized) tool name is built in.
pub fn is_builtin_tool(name: &str) -> bool {
    let normalized = normalize_tool_name(name);
    BUILTIN_TOOLS.contains(&normalized.as_str())
}

/// Find every built-in tool mentioned in prose, normalized to hyphen-case.
pub fn detect_tool_mentions(text: &str) -> impl Iterator<Item = &'static str> + '_ {
    TOOL_PATTERNS
        .iter()
        .filter(move |(_, re)| re.is_match(text))
        .map(|(name, _)| *name)
}

/// Check whether a header key belongs to the reserved extension namespace.
pub fn is_extension_key(key: &str) -> bool {
    key.starts_with(EXTENSION_PREFIX)
}

/// Check whether an extension key has a typed sub-model.
pub fn is_known_extension(key: &str) -> bool {
    KNOWN_EXTENSION_KEYS.contains(&key)
}
