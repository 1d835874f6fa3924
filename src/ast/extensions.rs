//! Extension sub-models for `markflow.*` header keys
//!
//! ```yaml
//! markflow.mcp:
//!   - server: filesystem-mcp
//!     version: "1.0.0"
//!     config:
//!       root: ./src
//! markflow.sub-workflows:
//!   - name: analyze
//!     path: ./analyze.prompt.md
//!     parameters:
//!       depth: "2"
//! markflow.resume:
//!   retention-days: 3
//! markflow.error-handling:
//!   retry-attempts: 2
//!   backoff-strategy: exponential
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_yaml::Value as YamlValue;

use crate::util::constants::DEFAULT_RETENTION_DAYS;

/// Typed view over the recognized extension keys
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extensions {
    pub mcp: Vec<McpServer>,
    pub sub_workflows: Vec<SubWorkflowDecl>,
    pub resume: Option<ResumePolicy>,
    pub error_handling: Option<ErrorHandlingPolicy>,
}

impl Extensions {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Resume policy in effect (declared or default)
    pub fn resume_policy(&self) -> ResumePolicy {
        self.resume.clone().unwrap_or_default()
    }

    /// Find a declared sub-workflow by name
    pub fn sub_workflow(&self, name: &str) -> Option<&SubWorkflowDecl> {
        self.sub_workflows
            .iter()
            .find(|s| s.name.as_deref() == Some(name))
    }
}

/// MCP server the workflow needs (`markflow.mcp`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct McpServer {
    /// Server identifier (required, checked by the validator)
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub version: Option<String>,
    /// Command to spawn a local server
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Server-specific settings, passed through untouched
    #[serde(default)]
    pub config: BTreeMap<String, YamlValue>,
}

/// Declared sub-workflow (`markflow.sub-workflows`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SubWorkflowDecl {
    #[serde(default)]
    pub name: Option<String>,
    /// Document path, relative to the declaring workflow (required)
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, YamlValue>,
    /// Names of sub-workflows that must finish first. Declared only, never scheduled here.
    #[serde(default)]
    pub depends_on: Vec<String>,
}

/// When checkpoints are written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckpointFrequency {
    #[default]
    AfterEachStep,
    AfterEachTool,
    Manual,
}

/// Resume behaviour (`markflow.resume`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResumePolicy {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub checkpoint_frequency: CheckpointFrequency,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for ResumePolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            checkpoint_frequency: CheckpointFrequency::default(),
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_retention_days() -> u32 {
    DEFAULT_RETENTION_DAYS
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackoffStrategy {
    #[default]
    Fixed,
    Linear,
    Exponential,
}

/// Failure handling (`markflow.error-handling`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ErrorHandlingPolicy {
    #[serde(default)]
    pub retry_attempts: u32,
    #[serde(default)]
    pub backoff_strategy: BackoffStrategy,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    #[serde(default)]
    pub continue_on_error: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mcp_server_parse() {
        let yaml = r#"
- server: filesystem-mcp
  version: "1.0.0"
  command: npx
  args: [-y, fs-server]
  config:
    root: ./src
"#;
        let servers: Vec<McpServer> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].server, "filesystem-mcp");
        assert_eq!(servers[0].args, vec!["-y", "fs-server"]);
        assert!(servers[0].config.contains_key("root"));
    }

    #[test]
    fn test_mcp_server_missing_id_defaults_empty() {
        let servers: Vec<McpServer> = serde_yaml::from_str("- version: '2'").unwrap();
        assert!(servers[0].server.is_empty());
    }

    #[test]
    fn test_sub_workflow_decl_kebab_case() {
        let yaml = "name: report\npath: ./report.prompt.md\ndepends-on: [analyze]";
        let decl: SubWorkflowDecl = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(decl.depends_on, vec!["analyze".to_string()]);
    }

    #[test]
    fn test_resume_policy_defaults() {
        let policy: ResumePolicy = serde_yaml::from_str("{}").unwrap();
        assert_eq!(policy, ResumePolicy::default());
        assert!(policy.enabled);
        assert_eq!(policy.retention_days, DEFAULT_RETENTION_DAYS);
    }

    #[test]
    fn test_resume_policy_explicit() {
        let yaml = "enabled: false\ncheckpoint-frequency: after-each-tool\nretention-days: 1";
        let policy: ResumePolicy = serde_yaml::from_str(yaml).unwrap();
        assert!(!policy.enabled);
        assert_eq!(policy.checkpoint_frequency, CheckpointFrequency::AfterEachTool);
        assert_eq!(policy.retention_days, 1);
    }

    #[test]
    fn test_error_handling_policy() {
        let yaml = "retry-attempts: 3\nbackoff-strategy: exponential\ntimeout-seconds: 30";
        let policy: ErrorHandlingPolicy = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(policy.retry_attempts, 3);
        assert_eq!(policy.backoff_strategy, BackoffStrategy::Exponential);
        assert_eq!(policy.timeout_seconds, Some(30));
        assert!(!policy.continue_on_error);
    }

    #[test]
    fn test_unknown_backoff_is_rejected() {
        let result: Result<ErrorHandlingPolicy, _> =
            serde_yaml::from_str("backoff-strategy: random");
        assert!(result.is_err());
    }
}
