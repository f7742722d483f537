//! Document root
//!
//! [`XcProjectFile`] owns one decoded project: the top-level document, the
//! record store built from its `objects`, and counted handles to the root
//! project record and to every group present at load. Loading runs the reference check selected in
//! [`LoadOptions`]; a project that failed the check in report mode stays
//! inspectable but refuses to encode.

use crate::config::{LoadOptions, ProjectConfig, ReferenceCheck};
use crate::document::Document;
use crate::error::ProjectError;
use pbx_graph::{
    DecodeError, ElementPath, Group, Handle, Isa, ObjectId, ObjectStore, Project, ReferenceValidator,
    StoreError, Target, ValidationReport,
};
use std::path::{Path, PathBuf};

/// Name of the document inside a `.xcodeproj` package
pub const PBXPROJ_FILE_NAME: &str = "project.pbxproj";

/// Validation state of a loaded project
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectState {
    /// Consistent, or not checked
    Loaded,
    /// Reference violations were found
    Invalid(ValidationReport),
}

/// A decoded project file
#[derive(Debug)]
pub struct XcProjectFile {
    document: Document,
    store: ObjectStore,
    project: Handle<Project>,
    groups: Vec<Handle<Group>>,
    state: ProjectState,
    location: Option<PathBuf>,
    config: ProjectConfig,
}

impl XcProjectFile {
    /// Decode a parsed document
    ///
    /// # Errors
    /// - `Decode` if a record fails to decode, `rootObject` is missing, or the
    ///   root is not a project
    /// - `InternalInconsistency` in strict mode when violations are found
    pub fn from_document(document: Document, options: LoadOptions) -> Result<Self, ProjectError> {
        Self::load(document, ProjectConfig::new().with_load(options), None)
    }

    /// Parse and decode JSON text
    ///
    /// # Errors
    /// As [`from_document`](Self::from_document), plus `InvalidData`.
    pub fn parse(text: &str, options: LoadOptions) -> Result<Self, ProjectError> {
        Self::from_document(Document::parse(text)?, options)
    }

    /// Open `<xcodeproj>/project.pbxproj`
    ///
    /// # Errors
    /// `NotXcodeproj`, `MissingPbxproj`, `Io`, and the load errors of
    /// [`from_document`](Self::from_document).
    pub fn open(xcodeproj: &Path, options: LoadOptions) -> Result<Self, ProjectError> {
        Self::open_with_config(xcodeproj, ProjectConfig::new().with_load(options))
    }

    /// Open with a project configuration
    ///
    /// # Errors
    /// As [`open`](Self::open).
    pub fn open_with_config(xcodeproj: &Path, config: ProjectConfig) -> Result<Self, ProjectError> {
        project_name(xcodeproj)?;
        let pbxproj = xcodeproj.join(PBXPROJ_FILE_NAME);
        if !pbxproj.is_file() {
            return Err(ProjectError::MissingPbxproj(xcodeproj.to_path_buf()));
        }
        let bytes = std::fs::read(&pbxproj).map_err(|e| ProjectError::io_error(&pbxproj, e))?;
        let document = Document::from_slice(&bytes)?;
        Self::load(document, config, Some(xcodeproj.to_path_buf()))
    }

    fn load(
        document: Document,
        config: ProjectConfig,
        location: Option<PathBuf>,
    ) -> Result<Self, ProjectError> {
        let mut store = ObjectStore::decode(document.objects()?)?;
        let root = document.root_object()?;
        match store.resolve(&root) {
            None => return Err(DecodeError::ObjectMissing { id: root }.into()),
            Some(record) if record.isa() != Isa::Project => {
                return Err(DecodeError::RootNotProject {
                    id: root,
                    isa: record.isa().to_string(),
                }
                .into());
            }
            Some(_) => {}
        }
        let project: Handle<Project> = store.retain(&root);
        let groups = store.retain_typed::<Group>();

        let main_group = store.try_get(&project)?.main_group.id().clone();
        if store.resolve(&main_group).is_none() {
            return Err(DecodeError::ObjectMissing { id: main_group }.into());
        }

        let mut file = Self {
            document,
            store,
            project,
            groups,
            state: ProjectState::Loaded,
            location,
            config,
        };
        tracing::info!(
            objects = file.store.len(),
            groups = file.groups.len(),
            %root,
            "loaded project"
        );

        let options = file.config.load;
        if options.resolve_paths {
            file.refresh_paths()?;
        }
        match options.reference_check {
            ReferenceCheck::Ignore => {}
            ReferenceCheck::Report => {
                file.validate();
            }
            ReferenceCheck::Strict => {
                let report = file.validate();
                if !report.is_empty() {
                    return Err(ProjectError::InternalInconsistency(report));
                }
            }
        }
        Ok(file)
    }

    /// Re-encode every record into a copy of the document
    ///
    /// Repeatable; top-level keys other than `objects` are unchanged.
    ///
    /// # Errors
    /// `UnsafeToEncode` if the project is in the invalid state.
    pub fn to_document(&mut self) -> Result<Document, ProjectError> {
        if let ProjectState::Invalid(report) = &self.state {
            return Err(ProjectError::UnsafeToEncode(report.len()));
        }
        let mut document = self.document.clone();
        document.set_objects(self.store.encode());
        Ok(document)
    }

    /// Encoded JSON text
    ///
    /// # Errors
    /// As [`to_document`](Self::to_document).
    pub fn to_json_string(&mut self) -> Result<String, ProjectError> {
        self.to_document()?.to_json_string()
    }

    /// Write back to the package the project was opened from
    ///
    /// # Errors
    /// `NotXcodeproj` for a project that was not opened from disk, and the
    /// errors of [`write_to`](Self::write_to).
    pub fn save(&mut self) -> Result<(), ProjectError> {
        let location = self
            .location
            .clone()
            .ok_or_else(|| ProjectError::NotXcodeproj(PathBuf::new()))?;
        self.write_to(&location)
    }

    /// Write `<xcodeproj>/project.pbxproj`, creating the package directory
    ///
    /// # Errors
    /// `NotXcodeproj`, `UnsafeToEncode` or `Io`.
    pub fn write_to(&mut self, xcodeproj: &Path) -> Result<(), ProjectError> {
        project_name(xcodeproj)?;
        let text = self.to_json_string()?;
        std::fs::create_dir_all(xcodeproj).map_err(|e| ProjectError::io_error(xcodeproj, e))?;
        let pbxproj = xcodeproj.join(PBXPROJ_FILE_NAME);
        std::fs::write(&pbxproj, text).map_err(|e| ProjectError::io_error(&pbxproj, e))?;
        tracing::info!(path = %pbxproj.display(), "wrote project");
        Ok(())
    }

    /// Handle to the root project record (uncounted)
    #[inline]
    #[must_use]
    pub fn project_handle(&self) -> Handle<Project> {
        self.project.detach()
    }

    /// Root project record
    ///
    /// # Errors
    /// `Missing`/`WrongKind` if the root record was replaced or removed.
    pub fn project(&self) -> Result<&Project, StoreError> {
        self.store.try_get(&self.project)
    }

    /// Mutable root project record
    ///
    /// # Errors
    /// As [`project`](Self::project).
    pub fn project_mut(&mut self) -> Result<&mut Project, StoreError> {
        self.store.try_get_mut(&self.project)
    }

    /// Root of the group tree (uncounted)
    ///
    /// # Errors
    /// As [`project`](Self::project).
    pub fn main_group(&self) -> Result<Handle<Group>, StoreError> {
        Ok(self.project()?.main_group.detach())
    }

    /// Every group in the store (uncounted)
    #[must_use]
    pub fn groups(&self) -> Vec<Handle<Group>> {
        self.store.handles_of::<Group>()
    }

    /// Targets of the project, in order (uncounted)
    #[must_use]
    pub fn targets(&self) -> Vec<Handle<Target>> {
        self.project()
            .map(|p| p.targets.iter().map(Handle::detach).collect())
            .unwrap_or_default()
    }

    /// Record store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    /// Mutable record store
    #[inline]
    pub fn store_mut(&mut self) -> &mut ObjectStore {
        &mut self.store
    }

    /// Current validation state
    #[inline]
    #[must_use]
    pub fn state(&self) -> &ProjectState {
        &self.state
    }

    /// True unless the last check found violations
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.state == ProjectState::Loaded
    }

    /// `.xcodeproj` directory the project was opened from
    #[inline]
    #[must_use]
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Configuration in effect
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Directory containing the `.xcodeproj`, the default source root
    #[must_use]
    pub fn project_dir(&self) -> PathBuf {
        self.location
            .as_deref()
            .and_then(Path::parent)
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
    }

    /// Recompute derived paths from the main group
    ///
    /// # Errors
    /// As [`project`](Self::project).
    pub fn refresh_paths(&mut self) -> Result<(), StoreError> {
        let main_group = self.main_group()?;
        self.store.refresh_paths(&main_group);
        Ok(())
    }

    /// Derived path of an element, from the last path refresh
    #[must_use]
    pub fn element_path(&self, id: &ObjectId) -> Option<&ElementPath> {
        self.store.path_of(id)
    }

    /// Filesystem path of an element
    ///
    /// Folders map to the directories configured in `[source_trees]`, or to
    /// [`project_dir`](Self::project_dir).
    #[must_use]
    pub fn full_path(&self, id: &ObjectId) -> Option<PathBuf> {
        let project_dir = self.project_dir();
        self.store
            .path_of(id)
            .map(|path| path.resolve(|folder| self.config.base_for(folder, &project_dir)))
    }

    /// Run the reference check and update the validation state
    pub fn validate(&mut self) -> ValidationReport {
        let report = ReferenceValidator::new().validate(&self.store);
        self.state = if report.is_empty() {
            ProjectState::Loaded
        } else {
            ProjectState::Invalid(report.clone())
        };
        report
    }
}

/// Project name of a `.xcodeproj` path: `App.xcodeproj` is `App`
///
/// # Errors
/// `NotXcodeproj` for any other extension.
pub fn project_name(xcodeproj: &Path) -> Result<String, ProjectError> {
    match (xcodeproj.file_stem(), xcodeproj.extension()) {
        (Some(stem), Some(ext)) if ext == "xcodeproj" => Ok(stem.to_string_lossy().into_owned()),
        _ => Err(ProjectError::NotXcodeproj(xcodeproj.to_path_buf())),
    }
}
