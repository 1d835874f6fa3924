//! Snapshot and runtime state types
//!
//! Two shapes of the same information:
//! - stored: [`ResumeState`] and friends, the JSON written per run id
//! - runtime: [`ExecutionContext`] and [`ConversationMessage`], what the
//!   orchestrator works with
//!
//! Conversion between them is lossless for the roles and for scalar
//! variables (JSON numbers and booleans come back as native types).

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::ast::Workflow;
use crate::util::constants::SNAPSHOT_FORMAT_VERSION;

// ═══════════════════════════════════════════════════════════════
// Stored snapshot
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMeta {
    /// Run id
    pub id: String,
    pub file_path: String,
    #[serde(default)]
    pub content_hash: Option<String>,
    pub started_at: DateTime<Utc>,
    pub last_checkpoint: DateTime<Utc>,
    pub status: RunStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// One executed step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub step_name: String,
    #[serde(default)]
    pub step_type: String,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    pub success: bool,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl StepRecord {
    /// Successful step that started at `start_time` and ends now
    pub fn completed(
        step_name: impl Into<String>,
        step_type: impl Into<String>,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            step_name: step_name.into(),
            step_type: step_type.into(),
            start_time,
            end_time: Some(Utc::now()),
            success: true,
            error_message: None,
        }
    }

    pub fn failed(step_name: impl Into<String>, error: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            step_name: step_name.into(),
            step_type: "step".to_string(),
            start_time: now,
            end_time: Some(now),
            success: false,
            error_message: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredContext {
    #[serde(default)]
    pub current_step: Option<String>,
    #[serde(default)]
    pub variables: BTreeMap<String, JsonValue>,
    #[serde(default)]
    pub execution_history: Vec<StepRecord>,
}

/// Full snapshot for one run id, replaced wholesale on every checkpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeState {
    #[serde(default = "default_format_version")]
    pub format_version: u32,
    pub workflow: SnapshotMeta,
    #[serde(default)]
    pub conversation_messages: Vec<StoredMessage>,
    #[serde(default)]
    pub execution_context: StoredContext,
}

fn default_format_version() -> u32 {
    SNAPSHOT_FORMAT_VERSION
}

impl ResumeState {
    /// Build a snapshot from runtime state.
    ///
    /// `started_at` comes from `previous` when the run was checkpointed before.
    pub fn capture(
        ctx: &ExecutionContext,
        conversation: &[ConversationMessage],
        previous: Option<&ResumeState>,
    ) -> Self {
        let started_at = previous
            .map(|p| p.workflow.started_at)
            .unwrap_or(ctx.started_at);

        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            workflow: SnapshotMeta {
                id: ctx.run_id.clone(),
                file_path: ctx.workflow_path.display().to_string(),
                content_hash: ctx.workflow_hash.clone(),
                started_at,
                last_checkpoint: Utc::now(),
                status: RunStatus::InProgress,
            },
            conversation_messages: conversation.iter().map(ConversationMessage::to_stored).collect(),
            execution_context: StoredContext {
                current_step: ctx.current_step.clone(),
                variables: ctx
                    .variables
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
                execution_history: ctx.history.clone(),
            },
        }
    }

    /// Rebuild runtime state from the snapshot
    pub fn restore(&self) -> (ExecutionContext, Vec<ConversationMessage>) {
        let ctx = ExecutionContext {
            run_id: self.workflow.id.clone(),
            workflow_path: PathBuf::from(&self.workflow.file_path),
            workflow_hash: self.workflow.content_hash.clone(),
            started_at: self.workflow.started_at,
            current_step: self.execution_context.current_step.clone(),
            variables: self
                .execution_context
                .variables
                .iter()
                .map(|(k, v)| (k.clone(), VarValue::from_json(v.clone())))
                .collect(),
            history: self.execution_context.execution_history.clone(),
        };
        let conversation = self
            .conversation_messages
            .iter()
            .map(ConversationMessage::from_stored)
            .collect();
        (ctx, conversation)
    }

    pub fn run_id(&self) -> &str {
        &self.workflow.id
    }

    pub fn status(&self) -> RunStatus {
        self.workflow.status
    }

    /// Append a transcript line and a history entry for a finished step
    pub fn record_step_completion(&mut self, step: StepRecord) {
        self.push_transcript(format!(
            "Step '{}' ({}) completed",
            step.step_name, step.step_type
        ));
        self.execution_context.current_step = Some(step.step_name.clone());
        self.execution_context.execution_history.push(step);
        self.workflow.last_checkpoint = Utc::now();
    }

    pub fn record_step_failure(&mut self, step_name: &str, error: &str) {
        self.push_transcript(format!("Step '{}' failed: {}", step_name, error));
        self.execution_context.current_step = Some(step_name.to_string());
        self.execution_context
            .execution_history
            .push(StepRecord::failed(step_name, error));
        self.workflow.last_checkpoint = Utc::now();
    }

    pub fn set_status(&mut self, status: RunStatus) {
        self.workflow.status = status;
        self.workflow.last_checkpoint = Utc::now();
    }

    fn push_transcript(&mut self, line: String) {
        self.conversation_messages.push(StoredMessage {
            role: Role::System.as_str().to_string(),
            content: line,
            timestamp: Utc::now(),
        });
    }
}

// ═══════════════════════════════════════════════════════════════
// Runtime state
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
            Self::Tool => "tool",
        }
    }

    /// Map a stored role string back; unknown roles become `Assistant`
    pub fn from_stored(role: &str) -> Self {
        match role.trim().to_ascii_lowercase().as_str() {
            "user" => Self::User,
            "system" => Self::System,
            "tool" => Self::Tool,
            _ => Self::Assistant,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self::new(Role::Tool, content)
    }

    fn to_stored(&self) -> StoredMessage {
        StoredMessage {
            role: self.role.as_str().to_string(),
            content: self.content.clone(),
            timestamp: self.timestamp,
        }
    }

    fn from_stored(stored: &StoredMessage) -> Self {
        Self {
            role: Role::from_stored(&stored.role),
            content: stored.content.clone(),
            timestamp: stored.timestamp,
        }
    }
}

/// Variable value held by the execution context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VarValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    /// Arrays, objects and null
    Structured(JsonValue),
}

impl VarValue {
    /// Coerce a generic JSON value into the narrowest native variant
    pub fn from_json(value: JsonValue) -> Self {
        match value {
            JsonValue::Bool(b) => Self::Bool(b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => n
                    .as_f64()
                    .map(Self::Float)
                    .unwrap_or(Self::Structured(JsonValue::Number(n))),
            },
            JsonValue::String(s) => Self::Text(s),
            other => Self::Structured(other),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Integer(i) => JsonValue::from(*i),
            Self::Float(f) => JsonValue::from(*f),
            Self::Text(s) => JsonValue::String(s.clone()),
            Self::Structured(v) => v.clone(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for VarValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for VarValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for VarValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for VarValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for VarValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<JsonValue> for VarValue {
    fn from(v: JsonValue) -> Self {
        Self::from_json(v)
    }
}

/// Runtime state of one run
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionContext {
    pub run_id: String,
    pub workflow_path: PathBuf,
    pub workflow_hash: Option<String>,
    pub started_at: DateTime<Utc>,
    pub current_step: Option<String>,
    pub variables: BTreeMap<String, VarValue>,
    pub history: Vec<StepRecord>,
}

impl ExecutionContext {
    pub fn new(
        run_id: impl Into<String>,
        workflow_path: impl AsRef<Path>,
        workflow_hash: Option<String>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            workflow_path: workflow_path.as_ref().to_path_buf(),
            workflow_hash,
            started_at: Utc::now(),
            current_step: None,
            variables: BTreeMap::new(),
            history: Vec::new(),
        }
    }

    /// Context for a fresh run of `workflow`, seeded with its input defaults
    pub fn for_workflow(run_id: impl Into<String>, workflow: &Workflow) -> Self {
        let path = workflow.source_path().map(Path::to_path_buf).unwrap_or_default();
        let mut ctx = Self::new(run_id, path, Some(workflow.content_hash().to_string()));

        let mut names: Vec<&String> = workflow.input().default.keys().collect();
        if let Some(schema) = workflow.input().schema.as_ref() {
            names.extend(schema.keys());
        }
        for name in names {
            if ctx.variables.contains_key(name) {
                continue;
            }
            let default = workflow
                .input()
                .default_for(name)
                .and_then(|v| serde_json::to_value(v).ok());
            if let Some(value) = default {
                ctx.variables.insert(name.clone(), VarValue::from_json(value));
            }
        }
        ctx
    }

    pub fn set_var(&mut self, name: impl Into<String>, value: impl Into<VarValue>) {
        self.variables.insert(name.into(), value.into());
    }

    pub fn var(&self, name: &str) -> Option<&VarValue> {
        self.variables.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample_context() -> ExecutionContext {
        let mut ctx = ExecutionContext::new("run-1", "flows/a.prompt.md", Some("xxh3:00".into()));
        ctx.set_var("count", 3i64);
        ctx.set_var("ratio", 0.5);
        ctx.set_var("enabled", true);
        ctx.set_var("name", "demo");
        ctx.set_var("items", json!(["a", "b"]));
        ctx
    }

    #[test]
    fn test_role_mapping() {
        assert_eq!(Role::from_stored("user"), Role::User);
        assert_eq!(Role::from_stored("SYSTEM"), Role::System);
        assert_eq!(Role::from_stored("tool"), Role::Tool);
        assert_eq!(Role::from_stored("narrator"), Role::Assistant);
    }

    #[test]
    fn test_var_value_coercion() {
        assert_eq!(VarValue::from_json(json!(3)), VarValue::Integer(3));
        assert_eq!(VarValue::from_json(json!(2.5)), VarValue::Float(2.5));
        assert_eq!(VarValue::from_json(json!(true)), VarValue::Bool(true));
        assert_eq!(VarValue::from_json(json!("x")), VarValue::Text("x".into()));
        assert_eq!(VarValue::from_json(json!(null)), VarValue::Structured(json!(null)));
        assert_eq!(VarValue::from_json(json!({"a": 1})), VarValue::Structured(json!({"a": 1})));
    }

    #[test]
    fn test_capture_and_restore() {
        let ctx = sample_context();
        let conversation = vec![
            ConversationMessage::user("hi"),
            ConversationMessage::assistant("hello"),
            ConversationMessage::tool("{\"ok\":true}"),
        ];
        let state = ResumeState::capture(&ctx, &conversation, None);
        assert_eq!(state.status(), RunStatus::InProgress);
        assert_eq!(state.workflow.started_at, ctx.started_at);

        let (restored, messages) = state.restore();
        assert_eq!(restored.variables, ctx.variables);
        assert_eq!(messages, conversation);
        assert_eq!(restored.workflow_hash.as_deref(), Some("xxh3:00"));
    }

    #[test]
    fn test_capture_preserves_started_at() {
        let ctx = sample_context();
        let first = ResumeState::capture(&ctx, &[], None);
        let mut later_ctx = ctx.clone();
        later_ctx.started_at = Utc::now() + chrono::Duration::hours(1);
        let second = ResumeState::capture(&later_ctx, &[], Some(&first));
        assert_eq!(second.workflow.started_at, first.workflow.started_at);
    }

    #[test]
    fn test_snapshot_json_is_camel_case() {
        let state = ResumeState::capture(&sample_context(), &[ConversationMessage::user("x")], None);
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["formatVersion"], 1);
        assert_eq!(json["workflow"]["status"], "in_progress");
        assert_eq!(json["workflow"]["contentHash"], "xxh3:00");
        assert!(json["workflow"]["filePath"].is_string());
        assert_eq!(json["conversationMessages"][0]["role"], "user");
        assert_eq!(json["executionContext"]["variables"]["count"], 3);
    }

    #[test]
    fn test_record_steps() {
        let mut state = ResumeState::capture(&sample_context(), &[], None);
        state.record_step_completion(StepRecord::completed("analyze", "tool", Utc::now()));
        state.record_step_failure("build", "exit code 1");

        let history = &state.execution_context.execution_history;
        assert_eq!(history.len(), 2);
        assert!(history[0].success);
        assert_eq!(history[1].error_message.as_deref(), Some("exit code 1"));
        assert_eq!(state.execution_context.current_step.as_deref(), Some("build"));
        assert_eq!(state.conversation_messages.len(), 2);
        assert!(state.conversation_messages.iter().all(|m| m.role == "system"));
    }

    #[test]
    fn test_for_workflow_seeds_defaults() {
        let wf = Workflow::parse_str(
            "---\nname: a\ninput:\n  default:\n    depth: 2\n  schema:\n    env:\n      default: dev\n    other: {}\n---\n{{depth}} {{env}}",
        )
        .unwrap();
        let ctx = ExecutionContext::for_workflow("r", &wf);
        assert_eq!(ctx.var("depth"), Some(&VarValue::Integer(2)));
        assert_eq!(ctx.var("env"), Some(&VarValue::Text("dev".into())));
        assert!(ctx.var("other").is_none());
        assert_eq!(ctx.workflow_hash.as_deref(), Some(wf.content_hash()));
    }
}
