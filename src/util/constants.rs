//! Centralized constants for Markflow
//!
//! Every default and limit in one place for easy tuning.

// ═══════════════════════════════════════════════════════════════
// Document format
// ═══════════════════════════════════════════════════════════════

/// Reserved namespace for header keys owned by this engine (`markflow.mcp`, ...)
pub const EXTENSION_PREFIX: &str = "markflow.";

/// Header delimiter line
pub const FRONT_MATTER_DELIMITER: &str = "---";

/// Accepted workflow file suffixes (checked in order)
pub const WORKFLOW_FILE_SUFFIXES: &[&str] = &[".prompt.md", ".md"];

// ═══════════════════════════════════════════════════════════════
// Model config ranges
// ═══════════════════════════════════════════════════════════════

pub const TEMPERATURE_MIN: f64 = 0.0;
pub const TEMPERATURE_MAX: f64 = 2.0;
pub const TOP_P_MIN: f64 = 0.0;
pub const TOP_P_MAX: f64 = 1.0;

// ═══════════════════════════════════════════════════════════════
// Resume snapshots
// ═══════════════════════════════════════════════════════════════

/// Version written into every snapshot
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Snapshot file extension (one file per run id)
pub const SNAPSHOT_EXTENSION: &str = "json";

/// Suffix appended to the snapshot file name while it is being written
pub const SNAPSHOT_TEMP_SUFFIX: &str = ".tmp";

/// Default directory for snapshots, relative to the working directory
pub const DEFAULT_STATE_DIR: &str = ".markflow/state";

/// Default snapshot retention
pub const DEFAULT_RETENTION_DAYS: u32 = 7;

/// Longest accepted run id
pub const MAX_RUN_ID_LEN: usize = 128;
