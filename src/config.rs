//! Markflow Configuration Module
//!
//! Config is stored in `~/.config/markflow/config.toml`.
//!
//! ```toml
//! [resume]
//! backend = "file"
//! state_dir = ".markflow/state"
//! retention_days = 7
//!
//! [validation]
//! extra_tools = ["web-search"]
//! nested_parameters = false
//! ```
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. Environment variables (`MARKFLOW_STATE_DIR`, `MARKFLOW_RESUME_BACKEND`)
//! 2. Config file (`~/.config/markflow/config.toml`)
//! 3. Defaults

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MarkflowError, Result};
use crate::resume::{FileResumeStore, MemoryResumeStore, ResumeStore};
use crate::util::constants::{DEFAULT_RETENTION_DAYS, DEFAULT_STATE_DIR};
use crate::validate::Validator;

pub const ENV_STATE_DIR: &str = "MARKFLOW_STATE_DIR";
pub const ENV_RESUME_BACKEND: &str = "MARKFLOW_RESUME_BACKEND";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MarkflowConfig {
    #[serde(default)]
    pub resume: ResumeConfig,

    #[serde(default)]
    pub validation: ValidationConfig,
}

/// Snapshot storage backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResumeBackend {
    #[default]
    File,
    Memory,
}

impl FromStr for ResumeBackend {
    type Err = MarkflowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            other => Err(MarkflowError::ConfigError {
                reason: format!("Unknown resume backend '{}'. Available: file, memory", other),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResumeConfig {
    #[serde(default)]
    pub backend: ResumeBackend,

    /// Snapshot directory for the file backend
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for ResumeConfig {
    fn default() -> Self {
        Self {
            backend: ResumeBackend::default(),
            state_dir: default_state_dir(),
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(DEFAULT_STATE_DIR)
}

fn default_retention_days() -> u32 {
    DEFAULT_RETENTION_DAYS
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ValidationConfig {
    /// Tool names accepted on top of the built-in registry
    #[serde(default)]
    pub extra_tools: Vec<String>,
    /// Accept `{{a.b}}` when only `a` is declared in `input.schema`
    #[serde(default)]
    pub nested_parameters: bool,
}

impl MarkflowConfig {
    /// Returns `~/.config/markflow/` on Unix, `%APPDATA%/markflow/` on Windows
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("markflow")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from the default path.
    ///
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`. Malformed files are an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| MarkflowError::ConfigError {
            reason: format!("Failed to read config file: {}", e),
        })?;

        toml::from_str(&content).map_err(|e| MarkflowError::ConfigError {
            reason: format!("Failed to parse config file: {}", e),
        })
    }

    /// Merge with environment variables
    ///
    /// Empty variables are ignored; an unknown backend name is an error.
    pub fn with_env(mut self) -> Result<Self> {
        if let Ok(dir) = std::env::var(ENV_STATE_DIR) {
            if !dir.is_empty() {
                self.resume.state_dir = PathBuf::from(dir);
            }
        }

        if let Ok(backend) = std::env::var(ENV_RESUME_BACKEND) {
            if !backend.is_empty() {
                self.resume.backend = backend.parse()?;
            }
        }

        Ok(self)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(u64::from(self.resume.retention_days) * 24 * 60 * 60)
    }

    /// Store selected by `resume.backend`
    pub fn build_store(&self) -> Arc<dyn ResumeStore> {
        match self.resume.backend {
            ResumeBackend::File => Arc::new(FileResumeStore::new(&self.resume.state_dir)),
            ResumeBackend::Memory => Arc::new(MemoryResumeStore::new()),
        }
    }

    /// Validator honoring the `[validation]` table
    pub fn build_validator(&self) -> Validator {
        Validator::new()
            .with_extra_tools(&self.validation.extra_tools)
            .with_nested_parameters(self.validation.nested_parameters)
    }
}
