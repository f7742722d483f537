//! Error types for project files
//!
//! - [`ProjectError`]: opening, decoding, validating and writing a project
//! - [`EditError`]: a project edit cannot find what it operates on

use pbx_graph::{DecodeError, StoreError, ValidationReport};
use std::path::PathBuf;

/// Errors while loading or saving a project file
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    /// IO error reading or writing a file
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File contents are not a document in the expected format
    #[error("data in project.pbxproj is not in the expected format: {0}")]
    InvalidData(String),

    /// Path does not name a `.xcodeproj` package
    #[error("path is not a .xcodeproj package: {0}")]
    NotXcodeproj(PathBuf),

    /// Package has no `project.pbxproj`
    #[error("project.pbxproj file missing in {0}")]
    MissingPbxproj(PathBuf),

    /// Records cannot be decoded
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Record store misuse or unresolvable handle
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Dangling references or orphaned records
    #[error("{0}")]
    InternalInconsistency(ValidationReport),

    /// Graph was loaded in an invalid state and cannot be written
    #[error("refusing to encode an inconsistent project ({0} violations)")]
    UnsafeToEncode(usize),

    /// Configuration file cannot be read
    #[error("invalid configuration in {path}: {message}")]
    Config { path: PathBuf, message: String },
}

impl ProjectError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create configuration error for path
    pub fn config_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Validation report, for inconsistency errors
    #[must_use]
    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            Self::InternalInconsistency(report) => Some(report),
            _ => None,
        }
    }
}

/// Errors from project edits
#[derive(Debug, thiserror::Error)]
pub enum EditError {
    /// No target with the given name
    #[error("target not found: {0}")]
    TargetNotFound(String),

    /// Project's main group does not resolve
    #[error("main group is not found")]
    MainGroupMissing,

    /// Target's configuration list does not resolve
    #[error("build configurations of target '{0}' not found")]
    ConfigurationListMissing(String),

    /// Record store error
    #[error(transparent)]
    Store(#[from] StoreError),
}
