//! Error types for the generation pipeline.
//!
//! None of these are fatal once the watch loop is running. Every failure in
//! the regeneration path degrades to "skip this unit, try again on the next
//! change" and is reported through a log line.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Errors raised while regenerating a unit or the central index.
#[derive(Error, Debug)]
pub enum GenError {
    #[error("Extraction failed for {dir}: {reason}")]
    Extraction { dir: PathBuf, reason: String },

    #[error("{operation} timed out after {}s", .limit.as_secs())]
    Timeout {
        operation: String,
        limit: Duration,
    },

    #[error("Unit {dir} does not declare a service name")]
    MissingServiceName { dir: PathBuf },

    #[error("Dependency install failed: {reason}")]
    DependencyInstall { reason: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid pattern: {source}")]
    Pattern {
        #[source]
        source: regex::Error,
    },
}

impl GenError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        GenError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Shorthand for an extraction failure.
    pub fn extraction(dir: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        GenError::Extraction {
            dir: dir.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }
}

pub type GenResult<T> = Result<T, GenError>;
