//! Build files, build phases and build configurations

use super::{Decoder, Edge, FileElement, Isa, Object};
use crate::error::DecodeError;
use crate::fields::{self, Fields};
use crate::handle::Handle;
use crate::store::ObjectStore;
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt::{self, Display, Formatter};

/// Membership of one file in one build phase
#[derive(Debug, Clone, PartialEq)]
pub struct BuildFile {
    /// Referenced file, if any
    pub file_ref: Option<Handle<FileElement>>,
    /// Opaque per-file settings, e.g. `{"ATTRIBUTES": ["CodeSignOnCopy"]}`
    pub settings: Option<Value>,
}

impl BuildFile {
    /// Build file for a file element
    #[must_use]
    pub fn new(file_ref: Handle<FileElement>) -> Self {
        Self {
            file_ref: Some(file_ref),
            settings: None,
        }
    }

    pub(super) fn decode(d: &mut Decoder<'_>) -> Result<Object, DecodeError> {
        let file_ref = d.optional_handle("fileRef")?;
        let settings = d.value("settings").cloned();
        Ok(Object::BuildFile(Self { file_ref, settings }))
    }

    pub(super) fn encode(&self, fields: &mut Fields) {
        fields::put_optional_id(fields, "fileRef", self.file_ref.as_ref());
        fields::put_optional_value(fields, "settings", self.settings.as_ref());
    }

    pub(super) fn collect_references<'a>(&'a self, edges: &mut Vec<Edge<'a>>) {
        edges.extend(self.file_ref.iter().map(|h| Edge::new("fileRef", h.id())));
    }
}

/// Shell script phase payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellScript {
    /// Display name
    pub name: Option<String>,
    /// Script body
    pub shell_script: String,
    /// Interpreter, e.g. `/bin/sh`; absent in minimal phases
    pub shell_path: Option<String>,
    /// Declared inputs
    pub input_paths: Vec<String>,
    /// Declared outputs
    pub output_paths: Vec<String>,
    /// Files listing further inputs
    pub input_file_list_paths: Vec<String>,
    /// Files listing further outputs
    pub output_file_list_paths: Vec<String>,
}

impl ShellScript {
    /// Script run by `/bin/sh` with no declared inputs or outputs
    #[must_use]
    pub fn new(name: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            shell_script: script.into(),
            shell_path: Some(String::from("/bin/sh")),
            input_paths: Vec::new(),
            output_paths: Vec::new(),
            input_file_list_paths: Vec::new(),
            output_file_list_paths: Vec::new(),
        }
    }
}

/// Variant-specific payload of a build phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseKind {
    /// Copy files into the product
    CopyFiles {
        /// Display name
        name: Option<String>,
    },
    /// Link frameworks and libraries
    Frameworks,
    /// Install headers
    Headers,
    /// Copy bundle resources
    Resources,
    /// Run a script
    ShellScript(ShellScript),
    /// Compile sources
    Sources,
}

/// Build phase variant, without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildPhaseType {
    /// `PBXCopyFilesBuildPhase`
    CopyFiles,
    /// `PBXFrameworksBuildPhase`
    Frameworks,
    /// `PBXHeadersBuildPhase`
    Headers,
    /// `PBXResourcesBuildPhase`
    Resources,
    /// `PBXShellScriptBuildPhase`
    ShellScript,
    /// `PBXSourcesBuildPhase`
    Sources,
}

impl BuildPhaseType {
    /// Discriminator of phases of this type
    #[must_use]
    pub const fn isa(self) -> Isa {
        match self {
            Self::CopyFiles => Isa::CopyFilesBuildPhase,
            Self::Frameworks => Isa::FrameworksBuildPhase,
            Self::Headers => Isa::HeadersBuildPhase,
            Self::Resources => Isa::ResourcesBuildPhase,
            Self::ShellScript => Isa::ShellScriptBuildPhase,
            Self::Sources => Isa::SourcesBuildPhase,
        }
    }

    /// Empty payload of this type; scripts start as an empty `/bin/sh` script
    #[must_use]
    pub fn default_kind(self) -> PhaseKind {
        match self {
            Self::CopyFiles => PhaseKind::CopyFiles { name: None },
            Self::Frameworks => PhaseKind::Frameworks,
            Self::Headers => PhaseKind::Headers,
            Self::Resources => PhaseKind::Resources,
            Self::ShellScript => PhaseKind::ShellScript(ShellScript {
                name: None,
                ..ShellScript::new("", "")
            }),
            Self::Sources => PhaseKind::Sources,
        }
    }
}

impl Display for BuildPhaseType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.isa().as_str())
    }
}

impl PhaseKind {
    /// Variant of this payload
    #[must_use]
    pub fn phase_type(&self) -> BuildPhaseType {
        match self {
            Self::CopyFiles { .. } => BuildPhaseType::CopyFiles,
            Self::Frameworks => BuildPhaseType::Frameworks,
            Self::Headers => BuildPhaseType::Headers,
            Self::Resources => BuildPhaseType::Resources,
            Self::ShellScript(_) => BuildPhaseType::ShellScript,
            Self::Sources => BuildPhaseType::Sources,
        }
    }
}

/// Ordered list of build files plus a variant payload
#[derive(Debug, Clone, PartialEq)]
pub struct BuildPhase {
    /// Build files, in build order
    pub files: Vec<Handle<BuildFile>>,
    /// Variant payload
    pub kind: PhaseKind,
}

impl BuildPhase {
    /// Value of `buildActionMask` written for every Resources phase
    pub const RESOURCES_BUILD_ACTION_MASK: i64 = 2_147_483_647;

    /// Empty phase
    #[must_use]
    pub fn new(kind: PhaseKind) -> Self {
        Self {
            files: Vec::new(),
            kind,
        }
    }

    /// Discriminator
    #[must_use]
    pub fn isa(&self) -> Isa {
        self.phase_type().isa()
    }

    /// Variant, without payload
    #[inline]
    #[must_use]
    pub fn phase_type(&self) -> BuildPhaseType {
        self.kind.phase_type()
    }

    /// Display name of copy-files and script phases
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            PhaseKind::CopyFiles { name } => name.as_deref(),
            PhaseKind::ShellScript(script) => script.name.as_deref(),
            _ => None,
        }
    }

    /// Append a build file unless the phase already holds it
    ///
    /// Returns the handle back when it was a duplicate, so a counted handle
    /// can be released by the caller.
    #[must_use = "a rejected counted handle must be released"]
    pub fn add_build_file(&mut self, file: Handle<BuildFile>) -> Option<Handle<BuildFile>> {
        if self.files.contains(&file) {
            return Some(file);
        }
        self.files.push(file);
        None
    }

    pub(super) fn decode(d: &mut Decoder<'_>) -> Result<Object, DecodeError> {
        let files = d.handles("files")?;
        let kind = match d.isa() {
            Isa::CopyFilesBuildPhase => PhaseKind::CopyFiles {
                name: d.optional_string("name")?,
            },
            Isa::FrameworksBuildPhase => PhaseKind::Frameworks,
            Isa::HeadersBuildPhase => PhaseKind::Headers,
            Isa::ResourcesBuildPhase => PhaseKind::Resources,
            Isa::ShellScriptBuildPhase => PhaseKind::ShellScript(ShellScript {
                name: d.optional_string("name")?,
                shell_script: d.string("shellScript")?,
                shell_path: d.optional_string("shellPath")?,
                input_paths: d.sparse_strings("inputPaths")?,
                output_paths: d.sparse_strings("outputPaths")?,
                input_file_list_paths: d.sparse_strings("inputFileListPaths")?,
                output_file_list_paths: d.sparse_strings("outputFileListPaths")?,
            }),
            _ => PhaseKind::Sources,
        };
        Ok(Object::BuildPhase(Self { files, kind }))
    }

    pub(super) fn encode(&self, fields: &mut Fields) {
        fields::put_ids(fields, "files", &self.files);
        match &self.kind {
            PhaseKind::CopyFiles { name } => {
                fields::put_optional_string(fields, "name", name.as_deref());
            }
            PhaseKind::Resources => {
                fields::put_int(fields, "buildActionMask", Self::RESOURCES_BUILD_ACTION_MASK);
                fields::put_int(fields, "runOnlyForDeploymentPostprocessing", 0);
            }
            PhaseKind::ShellScript(script) => {
                fields::put_optional_string(fields, "name", script.name.as_deref());
                fields::put_string(fields, "shellScript", &script.shell_script);
                fields::put_optional_string(fields, "shellPath", script.shell_path.as_deref());
                fields::put_sparse_strings(fields, "inputPaths", &script.input_paths);
                fields::put_sparse_strings(fields, "outputPaths", &script.output_paths);
                fields::put_sparse_strings(
                    fields,
                    "inputFileListPaths",
                    &script.input_file_list_paths,
                );
                fields::put_sparse_strings(
                    fields,
                    "outputFileListPaths",
                    &script.output_file_list_paths,
                );
            }
            PhaseKind::Frameworks | PhaseKind::Headers | PhaseKind::Sources => {}
        }
    }

    pub(super) fn collect_references<'a>(&'a self, edges: &mut Vec<Edge<'a>>) {
        edges.extend(self.files.iter().map(|h| Edge::new("files", h.id())));
    }
}

/// Build setting value: a scalar string or a list of strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    /// Single value
    String(String),
    /// Multiple values
    List(Vec<String>),
}

impl SettingValue {
    /// Add values, promoting a scalar to a list
    ///
    /// Values already present are skipped. An empty scalar is replaced.
    pub fn append<I, S>(&mut self, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list = match std::mem::replace(self, Self::List(Vec::new())) {
            Self::String(s) if s.is_empty() => Vec::new(),
            Self::String(s) => vec![s],
            Self::List(list) => list,
        };
        for value in values {
            let value = value.into();
            if !list.contains(&value) {
                list.push(value);
            }
        }
        *self = Self::List(list);
    }

    /// Scalar value, if this is one
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::List(_) => None,
        }
    }

    /// Every value, as a slice-like iterator
    pub fn values(&self) -> impl Iterator<Item = &str> {
        let (scalar, list) = match self {
            Self::String(s) => (Some(s.as_str()), &[][..]),
            Self::List(list) => (None, list.as_slice()),
        };
        scalar.into_iter().chain(list.iter().map(String::as_str))
    }

    fn to_value(&self) -> Value {
        match self {
            Self::String(s) => Value::String(s.clone()),
            Self::List(list) => Value::Array(list.iter().cloned().map(Value::String).collect()),
        }
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<String>> for SettingValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

/// Named set of build settings
#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfiguration {
    /// Configuration name, e.g. `Debug`
    pub name: String,
    /// Settings in document order
    pub build_settings: IndexMap<String, SettingValue>,
}

impl BuildConfiguration {
    /// Configuration without settings
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            build_settings: IndexMap::new(),
        }
    }

    /// Setting value by key
    #[must_use]
    pub fn setting(&self, key: &str) -> Option<&SettingValue> {
        self.build_settings.get(key)
    }

    pub(super) fn decode(d: &mut Decoder<'_>) -> Result<Object, DecodeError> {
        let name = d.string("name")?;
        let raw = d.object("buildSettings")?;
        let mut build_settings = IndexMap::with_capacity(raw.len());
        for (key, value) in raw {
            let value = match value {
                Value::String(s) => SettingValue::String(s.clone()),
                other => fields::value_as_strings(other).map(SettingValue::List).ok_or_else(|| {
                    DecodeError::WrongType {
                        isa: d.isa().as_str().to_string(),
                        id: d.id().clone(),
                        key: format!("buildSettings.{key}"),
                        expected: "string or list of strings",
                    }
                })?,
            };
            build_settings.insert(key.clone(), value);
        }
        Ok(Object::BuildConfiguration(Self {
            name,
            build_settings,
        }))
    }

    pub(super) fn encode(&self, fields: &mut Fields) {
        let settings: Fields = self
            .build_settings
            .iter()
            .map(|(key, value)| (key.clone(), value.to_value()))
            .collect();
        fields.insert("buildSettings".to_string(), Value::Object(settings));
        fields::put_string(fields, "name", &self.name);
    }
}

/// Ordered list of build configurations
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationList {
    /// Configurations, in display order
    pub build_configurations: Vec<Handle<BuildConfiguration>>,
    /// Name of the configuration used when none is specified
    pub default_configuration_name: Option<String>,
}

impl ConfigurationList {
    /// Configuration with the given name
    ///
    /// The returned handle is not counted.
    #[must_use]
    pub fn configuration_named(
        &self,
        store: &ObjectStore,
        name: &str,
    ) -> Option<Handle<BuildConfiguration>> {
        self.build_configurations
            .iter()
            .find(|h| store.get(*h).is_some_and(|c| c.name == name))
            .map(Handle::detach)
    }

    /// Configuration named by `default_configuration_name`
    #[must_use]
    pub fn default_configuration(&self, store: &ObjectStore) -> Option<Handle<BuildConfiguration>> {
        let name = self.default_configuration_name.as_deref()?;
        self.configuration_named(store, name)
    }

    pub(super) fn decode(d: &mut Decoder<'_>) -> Result<Object, DecodeError> {
        let build_configurations = d.handles("buildConfigurations")?;
        let default_configuration_name = d.optional_string("defaultConfigurationName")?;
        Ok(Object::ConfigurationList(Self {
            build_configurations,
            default_configuration_name,
        }))
    }

    pub(super) fn encode(&self, fields: &mut Fields) {
        fields::put_ids(fields, "buildConfigurations", &self.build_configurations);
        fields::put_optional_string(
            fields,
            "defaultConfigurationName",
            self.default_configuration_name.as_deref(),
        );
    }

    pub(super) fn collect_references<'a>(&'a self, edges: &mut Vec<Edge<'a>>) {
        edges.extend(
            self.build_configurations
                .iter()
                .map(|h| Edge::new("buildConfigurations", h.id())),
        );
    }
}
