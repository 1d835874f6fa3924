//! Structured header deserialization
//!
//! The header is read three times:
//! 1. generic pass: every key → `serde_yaml::Value` (forward compatible)
//! 2. typed pass: known top-level keys → typed sub-models
//! 3. extension pass: `markflow.*` keys → `extension_fields`, and the
//!    recognized ones → typed [`Extensions`]

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_yaml::Value as YamlValue;

use crate::error::{MarkflowError, Result};
use crate::registry::{self, EXT_ERROR_HANDLING, EXT_MCP, EXT_RESUME, EXT_SUB_WORKFLOWS};

use super::extensions::{ErrorHandlingPolicy, Extensions, McpServer, ResumePolicy, SubWorkflowDecl};
use super::schema::{InputSpec, Metadata, ModelConfig, OutputSpec};

/// Handles string OR array for `tools:`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

/// Every piece of information carried by a header
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderFields {
    /// Generic map of every header key, including unknown and extension keys
    pub fields: BTreeMap<String, YamlValue>,
    pub name: Option<String>,
    pub model: Option<String>,
    pub tools: Vec<String>,
    pub config: ModelConfig,
    pub input: InputSpec,
    pub output: Option<OutputSpec>,
    pub metadata: Metadata,
    /// Every `markflow.*` key by full name
    pub extension_fields: BTreeMap<String, YamlValue>,
    pub extensions: Extensions,
}

impl HeaderFields {
    /// Deserialize header text.
    ///
    /// `header_line` is the document line of the first header line, used to
    /// report YAML errors at document positions.
    pub fn parse(header: &str, header_line: usize) -> Result<Self> {
        let fields = parse_generic(header, header_line)?;

        let mut parsed = HeaderFields {
            name: typed(&fields, "name", "string")?,
            model: typed(&fields, "model", "string")?,
            tools: typed::<OneOrMany>(&fields, "tools", "list of tool names")?
                .map(OneOrMany::into_vec)
                .unwrap_or_default(),
            config: typed(&fields, "config", "model config")?.unwrap_or_default(),
            input: typed(&fields, "input", "input spec")?.unwrap_or_default(),
            output: typed(&fields, "output", "output spec")?,
            metadata: typed(&fields, "metadata", "metadata map")?.unwrap_or_default(),
            ..Default::default()
        };

        parsed.extension_fields = fields
            .iter()
            .filter(|(key, _)| registry::is_extension_key(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        parsed.extensions = Extensions {
            mcp: typed::<Vec<McpServer>>(&fields, EXT_MCP, "list of MCP servers")?
                .unwrap_or_default(),
            sub_workflows: typed::<Vec<SubWorkflowDecl>>(
                &fields,
                EXT_SUB_WORKFLOWS,
                "list of sub-workflows",
            )?
            .unwrap_or_default(),
            resume: typed::<ResumePolicy>(&fields, EXT_RESUME, "resume policy")?,
            error_handling: typed::<ErrorHandlingPolicy>(
                &fields,
                EXT_ERROR_HANDLING,
                "error-handling policy",
            )?,
        };

        parsed.fields = fields;
        tracing::debug!(
            keys = parsed.fields.len(),
            extensions = parsed.extension_fields.len(),
            "Parsed workflow header"
        );
        Ok(parsed)
    }

    /// Extension keys under the reserved prefix that have no typed sub-model
    pub fn unknown_extension_keys(&self) -> impl Iterator<Item = &str> {
        self.extension_fields
            .keys()
            .map(String::as_str)
            .filter(|key| !registry::is_known_extension(key))
    }
}

/// Generic pass: header text → string-keyed map
fn parse_generic(header: &str, header_line: usize) -> Result<BTreeMap<String, YamlValue>> {
    if header.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    let value: YamlValue = serde_yaml::from_str(header).map_err(|e| {
        let location = e.location();
        MarkflowError::ParseError {
            details: e.to_string(),
            line: location
                .as_ref()
                .map(|loc| header_line.max(1) + loc.line().saturating_sub(1)),
            column: location.as_ref().map(|loc| loc.column()),
        }
    })?;

    let mapping = match value {
        YamlValue::Null => return Ok(BTreeMap::new()),
        YamlValue::Mapping(mapping) => mapping,
        other => {
            return Err(MarkflowError::ParseError {
                details: format!("header must be a key/value mapping, got {}", kind(&other)),
                line: Some(header_line),
                column: None,
            })
        }
    };

    let mut fields = BTreeMap::new();
    for (key, value) in mapping {
        let key = match key {
            YamlValue::String(s) => s,
            YamlValue::Number(n) => n.to_string(),
            YamlValue::Bool(b) => b.to_string(),
            other => {
                return Err(MarkflowError::ParseError {
                    details: format!("header keys must be scalars, got {}", kind(&other)),
                    line: Some(header_line),
                    column: None,
                })
            }
        };
        fields.insert(key, value);
    }
    Ok(fields)
}

/// Typed pass for one key. Absent and `null` both mean "not set".
fn typed<T: DeserializeOwned>(
    fields: &BTreeMap<String, YamlValue>,
    key: &str,
    target: &'static str,
) -> Result<Option<T>> {
    match fields.get(key) {
        None | Some(YamlValue::Null) => Ok(None),
        Some(value) => serde_yaml::from_value(value.clone())
            .map(Some)
            .map_err(|e| MarkflowError::HeaderType {
                field: key.to_string(),
                target,
                details: e.to_string(),
            }),
    }
}

fn kind(value: &YamlValue) -> &'static str {
    match value {
        YamlValue::Null => "null",
        YamlValue::Bool(_) => "a boolean",
        YamlValue::Number(_) => "a number",
        YamlValue::String(_) => "a string",
        YamlValue::Sequence(_) => "a list",
        YamlValue::Mapping(_) => "a mapping",
        YamlValue::Tagged(_) => "a tagged value",
    }
}
