//! redlens CLI library.
//!
//! This module exposes internal types for testing purposes.
//! The main entry point is the `redlens` binary.

pub mod catalog;
pub mod cli;
pub mod error;
pub mod logging;
pub mod output;
pub mod report;

// Re-export commonly used types
pub use cli::Args;
pub use error::ConfigError;
pub use report::{ReflectionReport, ViewReport};
