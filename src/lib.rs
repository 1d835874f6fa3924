//! Markflow - Markdown workflow documents with resumable execution
//!
//! ## Module Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        DOMAIN MODEL                          │
//! │  ast/       Markdown + front matter → Workflow               │
//! │  registry   Known tools and extension keys                   │
//! │  validate/  Errors and warnings over a Workflow              │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      APPLICATION LAYER                       │
//! │  engine     parse → validate → orchestrate, checkpoints      │
//! │  orchestrator  Boundary to model/tool execution              │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    INFRASTRUCTURE LAYER                      │
//! │  resume/    Snapshots (file, memory), compatibility gate     │
//! │  util/      Constants, content hashing                       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`ast`] | Header split, header passes, body references → `Workflow` |
//! | [`registry`] | Single source of built-in tools and `markflow.*` keys |
//! | [`validate`] | `ValidationResult` with stable issue codes |
//! | [`resume`] | `ResumeStore` trait, file and memory backends |
//! | [`orchestrator`] | `Orchestrator` trait, `ExecutionResult` |
//! | [`engine`] | `WorkflowEngine` glue with cancellation |
//! | [`config`] | `~/.config/markflow/config.toml` + env overrides |
//! | [`error`] | Error types with codes and fix suggestions |

// ═══════════════════════════════════════════════════════════════
// DOMAIN MODEL - Markdown → Rust types
// ═══════════════════════════════════════════════════════════════
pub mod ast;
pub mod registry;
pub mod validate;

// ═══════════════════════════════════════════════════════════════
// APPLICATION LAYER - Execution glue
// ═══════════════════════════════════════════════════════════════
pub mod engine;
pub mod orchestrator;

// ═══════════════════════════════════════════════════════════════
// INFRASTRUCTURE LAYER - Snapshots, utilities
// ═══════════════════════════════════════════════════════════════
pub mod resume;
pub mod util;

// ═══════════════════════════════════════════════════════════════
// CROSS-CUTTING - Error handling, configuration
// ═══════════════════════════════════════════════════════════════
pub mod config;
pub mod error;

// ═══════════════════════════════════════════════════════════════
// PUBLIC API RE-EXPORTS
// ═══════════════════════════════════════════════════════════════

pub use ast::{Content, Workflow};
pub use config::MarkflowConfig;
pub use engine::{RunOutcome, WorkflowEngine};
pub use error::{FixSuggestion, MarkflowError, Result};
pub use orchestrator::{ExecutionResult, Orchestrator};
pub use resume::{
    ConversationMessage, ExecutionContext, FileResumeStore, MemoryResumeStore, ResumeState,
    ResumeStore, Role, RunStatus, VarValue,
};
pub use validate::{IssueCode, ValidationIssue, ValidationResult, Validator};
