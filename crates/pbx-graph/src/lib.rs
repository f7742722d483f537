//! Typed object graph for Xcode project files
//!
//! A project file is a flat dictionary of records keyed by identifier, with
//! records pointing at one another by identifier. This crate turns that
//! dictionary into a typed graph and back.
//!
//! # Overview
//!
//! - **ObjectStore**: arena of records with per-identifier reference counts
//! - **Handle**: typed, non-owning reference to a stored record
//! - **Object**: closed set of record types decoded from raw field bags
//! - **resolve_paths**: derived filesystem path of every group and file
//! - **ReferenceValidator**: dead reference and orphan detection
//!
//! # Example
//!
//! ```rust
//! use pbx_graph::{ElementPath, Group, Handle, ObjectId, ObjectStore, ReferenceValidator, SourceTreeFolder};
//! use serde_json::json;
//!
//! let objects = json!({
//!     "G": {"isa": "PBXGroup", "children": ["F"], "sourceTree": "<group>"},
//!     "F": {"isa": "PBXFileReference", "path": "main.c", "sourceTree": "<group>"},
//! });
//! let mut store = ObjectStore::decode(objects.as_object().unwrap()).unwrap();
//!
//! let root: Handle<Group> = store.retain(&ObjectId::from("G"));
//! assert!(ReferenceValidator::new().validate(&store).is_empty());
//!
//! store.refresh_paths(&root);
//! assert_eq!(
//!     store.path_of(&ObjectId::from("F")),
//!     Some(&ElementPath::relative(SourceTreeFolder::SourceRoot, "main.c"))
//! );
//! ```

#![warn(missing_docs)]

mod error;
pub mod fields;
mod file_type;
mod handle;
mod id;
mod mutate;
pub mod object;
pub mod paths;
mod source_tree;
mod store;
mod validation;

// Re-exports
pub use error::{DecodeError, StoreError};
pub use fields::Fields;
pub use file_type::FileType;
pub use handle::Handle;
pub use id::{IdentifierError, ObjectId, PbxIdentifier};
pub use object::{
    BuildConfiguration, BuildFile, BuildPhase, BuildPhaseType, BuildStyle, ConfigurationList,
    ContainerItemProxy, Edge, FileElement, FileElementKind, FileReference, Group, Isa, Object, PhaseKind, Project,
    ProjectReference, Record, RecordKind, SettingValue, ShellScript, Target, TargetDependency,
    TargetKind, UnknownIsa,
};
pub use paths::resolve_paths;
pub use source_tree::{ElementPath, SourceTree, SourceTreeError, SourceTreeFolder};
pub use store::{ObjectStore, FRESH_ID_ATTEMPTS};
pub use validation::{ReferenceError, ReferenceValidator, ValidationReport};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for graph operations
    pub use crate::{
        BuildPhaseType, ElementPath, FileElement, FileReference, Group, Handle, Object, ObjectId,
        ObjectStore, Project, RecordKind, ReferenceValidator, SourceTree, Target,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
