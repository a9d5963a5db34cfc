//! Revid Common Utilities
//!
//! Shared infrastructure for all revid crates:
//! - Error types and result aliases
//! - Tracing/logging initialization
//! - Configuration loading
//! - Job identifier generation

pub mod config;
pub mod error;
pub mod id;
pub mod logging;

pub use config::*;
pub use error::*;
pub use id::*;
