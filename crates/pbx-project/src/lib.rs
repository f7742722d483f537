//! Xcode project files
//!
//! Loads `project.pbxproj` documents into the typed graph of
//! [`pbx_graph`], checks them, edits them and writes them back.
//!
//! # Example
//!
//! ```rust
//! use pbx_project::{LoadOptions, XcProjectFile};
//!
//! let text = pbx_test_utils::sample_project_text();
//! let mut file = XcProjectFile::parse(&text, LoadOptions::new()).unwrap();
//!
//! let app = file.target_named("App").unwrap();
//! file.set_build_setting(&app, "SWIFT_VERSION", "5.0").unwrap();
//!
//! let written = file.to_json_string().unwrap();
//! assert!(written.contains("SWIFT_VERSION"));
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod document;
pub mod edit;
pub mod error;
pub mod project_file;

// Re-exports
pub use config::{LoadOptions, ProjectConfig, ReferenceCheck};
pub use document::Document;
pub use edit::FrameworkLink;
pub use error::{EditError, ProjectError};
pub use project_file::{project_name, ProjectState, XcProjectFile, PBXPROJ_FILE_NAME};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
