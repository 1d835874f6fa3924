//! Utilities Module - shared infrastructure
//!
//! - `constants`: Centralized limits, defaults and file naming
//! - `hash`: Content hashing for workflow documents

pub mod constants;
mod hash;

pub use hash::content_hash;
