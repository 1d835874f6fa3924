//! Workflow - the parsed document
//!
//! A `Workflow` is built by one parse call and never changes afterwards.
//! Re-parsing the same text produces an equal workflow with the same hash.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_yaml::Value as YamlValue;

use crate::error::{MarkflowError, Result};
use crate::util::constants::WORKFLOW_FILE_SUFFIXES;
use crate::util::content_hash;

use super::content::Content;
use super::extensions::Extensions;
use super::frontmatter::split_front_matter;
use super::header::HeaderFields;
use super::schema::{InputSpec, Metadata, ModelConfig, OutputSpec};

/// Fields are private: a parsed workflow is read through accessors only.
///
/// ```compile_fail
/// let mut wf = markflow::Workflow::parse_str("---\nname: a\n---\nbody").unwrap();
/// wf.name = Some("changed".to_string());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Workflow {
    name: Option<String>,
    model: Option<String>,
    /// Declared tools, in header order
    tools: Vec<String>,
    config: ModelConfig,
    input: InputSpec,
    output: Option<OutputSpec>,
    metadata: Metadata,
    extensions: Extensions,
    /// Every `markflow.*` header key, including unrecognized ones
    extension_fields: BTreeMap<String, YamlValue>,
    /// Every header key
    header_fields: BTreeMap<String, YamlValue>,
    /// Raw header text (None without header)
    header_text: Option<String>,
    has_header: bool,
    source_path: Option<PathBuf>,
    content: Content,
    content_hash: String,
}

impl Workflow {
    /// Parse a workflow document held in memory.
    pub fn parse_str(text: &str) -> Result<Self> {
        Self::parse_with_source(text, None)
    }

    /// Parse text that was read from `path`. The path is recorded, not read.
    pub fn parse_str_with_path(text: &str, path: impl Into<PathBuf>) -> Result<Self> {
        Self::parse_with_source(text, Some(path.into()))
    }

    /// Read and parse a workflow file.
    pub async fn parse_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        check_file_type(path)?;

        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MarkflowError::WorkflowNotFound {
                    path: path.display().to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        Self::parse_str_with_path(&text, path)
    }

    fn parse_with_source(text: &str, source_path: Option<PathBuf>) -> Result<Self> {
        if text.trim().is_empty() {
            return Err(MarkflowError::EmptyDocument);
        }

        let split = split_front_matter(text);
        let header = match split.header {
            Some(header) => HeaderFields::parse(header, split.header_line)?,
            None => HeaderFields::default(),
        };
        let content = Content::process(split.body, split.body_line);

        tracing::debug!(
            name = ?header.name,
            has_header = split.has_header(),
            parameters = content.parameter_references.len(),
            sub_workflows = content.sub_workflow_references.len(),
            "Parsed workflow document"
        );

        Ok(Self {
            name: header.name,
            model: header.model,
            tools: header.tools,
            config: header.config,
            input: header.input,
            output: header.output,
            metadata: header.metadata,
            extensions: header.extensions,
            extension_fields: header.extension_fields,
            header_fields: header.fields,
            header_text: split.header.map(str::to_string),
            has_header: split.has_header(),
            source_path,
            content,
            content_hash: content_hash(text),
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Declared tools, in header order
    pub fn tools(&self) -> &[String] {
        &self.tools
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn input(&self) -> &InputSpec {
        &self.input
    }

    pub fn output(&self) -> Option<&OutputSpec> {
        self.output.as_ref()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Every `markflow.*` header key, including unrecognized ones
    pub fn extension_fields(&self) -> &BTreeMap<String, YamlValue> {
        &self.extension_fields
    }

    /// Every header key from the generic pass
    pub fn header_fields(&self) -> &BTreeMap<String, YamlValue> {
        &self.header_fields
    }

    /// Raw header text (None without header)
    pub fn header_text(&self) -> Option<&str> {
        self.header_text.as_deref()
    }

    pub fn has_header(&self) -> bool {
        self.has_header
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    /// Digest of the full document text, computed once at parse time
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// Name for display: declared name, else the file stem
    pub fn display_name(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.to_string();
        }
        self.source_path
            .as_deref()
            .and_then(Path::file_name)
            .and_then(|f| f.to_str())
            .map(|f| {
                WORKFLOW_FILE_SUFFIXES
                    .iter()
                    .find_map(|suffix| f.strip_suffix(suffix))
                    .unwrap_or(f)
                    .to_string()
            })
            .unwrap_or_else(|| "<unnamed>".to_string())
    }
}

/// Reject paths that do not carry a workflow suffix
pub fn check_file_type(path: &Path) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|f| f.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if WORKFLOW_FILE_SUFFIXES
        .iter()
        .any(|suffix| file_name.len() > suffix.len() && file_name.ends_with(suffix))
    {
        Ok(())
    } else {
        Err(MarkflowError::InvalidFileType {
            path: path.display().to_string(),
        })
    }
}
