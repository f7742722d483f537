//! Record type system
//!
//! Every record of a project file carries an `isa` discriminator naming one
//! of a closed set of record types. [`Isa`] is that set, and the registry
//! in this module maps each tag to the function building the typed
//! [`Object`] from its raw field bag.
//!
//! Each variant declares its outgoing references once, in
//! [`Object::references`]; both the validator and cloning walk that list.

mod build;
mod decode;
mod element;
mod project;
mod target;

pub use build::{
    BuildConfiguration, BuildFile, BuildPhase, BuildPhaseType, ConfigurationList, PhaseKind,
    SettingValue, ShellScript,
};
pub use element::{FileElement, FileElementKind, FileReference, Group};
pub use project::{Project, ProjectReference};
pub use target::{Target, TargetDependency, TargetKind};

pub(crate) use decode::Decoder;

use crate::error::DecodeError;
use crate::fields::{self, Fields};
use crate::id::ObjectId;
use crate::store::ObjectStore;
use serde_json::Value;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Discriminator of every known record type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Isa {
    /// `PBXProject`
    Project,
    /// `PBXContainerItemProxy`
    ContainerItemProxy,
    /// `PBXBuildFile`
    BuildFile,
    /// `PBXBuildStyle`, written by old Xcode versions
    BuildStyle,
    /// `PBXCopyFilesBuildPhase`
    CopyFilesBuildPhase,
    /// `PBXFrameworksBuildPhase`
    FrameworksBuildPhase,
    /// `PBXHeadersBuildPhase`
    HeadersBuildPhase,
    /// `PBXResourcesBuildPhase`
    ResourcesBuildPhase,
    /// `PBXShellScriptBuildPhase`
    ShellScriptBuildPhase,
    /// `PBXSourcesBuildPhase`
    SourcesBuildPhase,
    /// `XCBuildConfiguration`
    BuildConfiguration,
    /// `PBXAggregateTarget`
    AggregateTarget,
    /// `PBXLegacyTarget`
    LegacyTarget,
    /// `PBXNativeTarget`
    NativeTarget,
    /// `PBXTargetDependency`
    TargetDependency,
    /// `XCConfigurationList`
    ConfigurationList,
    /// `PBXFileReference`
    FileReference,
    /// `PBXReferenceProxy`
    ReferenceProxy,
    /// `PBXGroup`
    Group,
    /// `PBXVariantGroup`
    VariantGroup,
    /// `XCVersionGroup`
    VersionGroup,
}

/// Decode constructor for one record type
pub(crate) type DecodeFn = fn(&mut Decoder<'_>) -> Result<Object, DecodeError>;

impl Isa {
    /// Every known discriminator
    pub const ALL: [Self; 21] = [
        Self::Project,
        Self::ContainerItemProxy,
        Self::BuildFile,
        Self::BuildStyle,
        Self::CopyFilesBuildPhase,
        Self::FrameworksBuildPhase,
        Self::HeadersBuildPhase,
        Self::ResourcesBuildPhase,
        Self::ShellScriptBuildPhase,
        Self::SourcesBuildPhase,
        Self::BuildConfiguration,
        Self::AggregateTarget,
        Self::LegacyTarget,
        Self::NativeTarget,
        Self::TargetDependency,
        Self::ConfigurationList,
        Self::FileReference,
        Self::ReferenceProxy,
        Self::Group,
        Self::VariantGroup,
        Self::VersionGroup,
    ];

    /// Raw tag as written in project files
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Project => "PBXProject",
            Self::ContainerItemProxy => "PBXContainerItemProxy",
            Self::BuildFile => "PBXBuildFile",
            Self::BuildStyle => "PBXBuildStyle",
            Self::CopyFilesBuildPhase => "PBXCopyFilesBuildPhase",
            Self::FrameworksBuildPhase => "PBXFrameworksBuildPhase",
            Self::HeadersBuildPhase => "PBXHeadersBuildPhase",
            Self::ResourcesBuildPhase => "PBXResourcesBuildPhase",
            Self::ShellScriptBuildPhase => "PBXShellScriptBuildPhase",
            Self::SourcesBuildPhase => "PBXSourcesBuildPhase",
            Self::BuildConfiguration => "XCBuildConfiguration",
            Self::AggregateTarget => "PBXAggregateTarget",
            Self::LegacyTarget => "PBXLegacyTarget",
            Self::NativeTarget => "PBXNativeTarget",
            Self::TargetDependency => "PBXTargetDependency",
            Self::ConfigurationList => "XCConfigurationList",
            Self::FileReference => "PBXFileReference",
            Self::ReferenceProxy => "PBXReferenceProxy",
            Self::Group => "PBXGroup",
            Self::VariantGroup => "PBXVariantGroup",
            Self::VersionGroup => "XCVersionGroup",
        }
    }

    /// Registry lookup: the decode constructor for this tag
    #[must_use]
    pub(crate) fn decoder(self) -> DecodeFn {
        match self {
            Self::Project => Project::decode,
            Self::ContainerItemProxy => ContainerItemProxy::decode,
            Self::BuildFile => BuildFile::decode,
            Self::BuildStyle => BuildStyle::decode,
            Self::CopyFilesBuildPhase
            | Self::FrameworksBuildPhase
            | Self::HeadersBuildPhase
            | Self::ResourcesBuildPhase
            | Self::ShellScriptBuildPhase
            | Self::SourcesBuildPhase => BuildPhase::decode,
            Self::BuildConfiguration => BuildConfiguration::decode,
            Self::AggregateTarget | Self::LegacyTarget | Self::NativeTarget => Target::decode,
            Self::TargetDependency => TargetDependency::decode,
            Self::ConfigurationList => ConfigurationList::decode,
            Self::FileReference
            | Self::ReferenceProxy
            | Self::Group
            | Self::VariantGroup
            | Self::VersionGroup => FileElement::decode,
        }
    }
}

impl Display for Isa {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Isa {
    type Err = UnknownIsa;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|isa| isa.as_str() == s)
            .ok_or_else(|| UnknownIsa(s.to_string()))
    }
}

/// Tag outside the registry
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown isa '{0}'")]
pub struct UnknownIsa(pub String);

/// Proxy to an object in another container (no modeled fields)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContainerItemProxy;

impl ContainerItemProxy {
    fn decode(_: &mut Decoder<'_>) -> Result<Object, DecodeError> {
        Ok(Object::ContainerItemProxy(Self))
    }
}

/// Legacy build style (no modeled fields)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStyle;

impl BuildStyle {
    fn decode(_: &mut Decoder<'_>) -> Result<Object, DecodeError> {
        Ok(Object::BuildStyle(Self))
    }
}

/// Typed payload of a record
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// Root project
    Project(Project),
    /// Cross-container proxy
    ContainerItemProxy(ContainerItemProxy),
    /// Membership of a file in a build phase
    BuildFile(BuildFile),
    /// Legacy build style
    BuildStyle(BuildStyle),
    /// Any build phase
    BuildPhase(BuildPhase),
    /// Named set of build settings
    BuildConfiguration(BuildConfiguration),
    /// Any target
    Target(Target),
    /// Dependency edge between targets
    TargetDependency(TargetDependency),
    /// Ordered list of configurations
    ConfigurationList(ConfigurationList),
    /// File reference, reference proxy or any group
    FileElement(FileElement),
}

/// One outgoing reference of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge<'a> {
    /// Field holding the reference, dotted for nested fields
    pub key_path: &'static str,
    /// Referenced identifier
    pub target: &'a ObjectId,
}

impl<'a> Edge<'a> {
    #[inline]
    pub(crate) fn new(key_path: &'static str, target: &'a ObjectId) -> Self {
        Self { key_path, target }
    }
}

impl Object {
    /// Discriminator of this payload
    #[must_use]
    pub fn isa(&self) -> Isa {
        match self {
            Self::Project(_) => Isa::Project,
            Self::ContainerItemProxy(_) => Isa::ContainerItemProxy,
            Self::BuildFile(_) => Isa::BuildFile,
            Self::BuildStyle(_) => Isa::BuildStyle,
            Self::BuildPhase(phase) => phase.isa(),
            Self::BuildConfiguration(_) => Isa::BuildConfiguration,
            Self::Target(target) => target.isa(),
            Self::TargetDependency(_) => Isa::TargetDependency,
            Self::ConfigurationList(_) => Isa::ConfigurationList,
            Self::FileElement(element) => element.isa(),
        }
    }

    /// Every outgoing reference, in field order
    ///
    /// Null handles are not references and are never listed.
    #[must_use]
    pub fn references(&self) -> Vec<Edge<'_>> {
        let mut edges = Vec::new();
        match self {
            Self::Project(project) => project.collect_references(&mut edges),
            Self::ContainerItemProxy(_) | Self::BuildStyle(_) | Self::BuildConfiguration(_) => {}
            Self::BuildFile(file) => file.collect_references(&mut edges),
            Self::BuildPhase(phase) => phase.collect_references(&mut edges),
            Self::Target(target) => target.collect_references(&mut edges),
            Self::TargetDependency(dependency) => dependency.collect_references(&mut edges),
            Self::ConfigurationList(list) => list.collect_references(&mut edges),
            Self::FileElement(element) => element.collect_references(&mut edges),
        }
        edges.retain(|edge| !edge.target.is_null());
        edges
    }

    fn encode(&self, fields: &mut Fields) {
        match self {
            Self::Project(project) => project.encode(fields),
            Self::ContainerItemProxy(_) | Self::BuildStyle(_) => {}
            Self::BuildFile(file) => file.encode(fields),
            Self::BuildPhase(phase) => phase.encode(fields),
            Self::BuildConfiguration(configuration) => configuration.encode(fields),
            Self::Target(target) => target.encode(fields),
            Self::TargetDependency(dependency) => dependency.encode(fields),
            Self::ConfigurationList(list) => list.encode(fields),
            Self::FileElement(element) => element.encode(fields),
        }
    }
}

/// One stored record: identifier, raw field bag and typed payload
///
/// The raw bag is what gets written out; [`Record::apply_changes`] copies the
/// typed payload into it. Keys the payload does not model are left alone.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: ObjectId,
    fields: Fields,
    object: Object,
}

impl Record {
    /// New record with an empty raw bag
    #[must_use]
    pub fn new(id: ObjectId, object: impl Into<Object>) -> Self {
        Self::with_fields(id, Fields::new(), object)
    }

    /// New record seeded with raw fields the payload does not model
    #[must_use]
    pub fn with_fields(id: ObjectId, fields: Fields, object: impl Into<Object>) -> Self {
        let object = object.into();
        let mut raw = Fields::new();
        raw.insert("isa".to_string(), Value::String(object.isa().as_str().to_string()));
        raw.extend(fields);
        Self {
            id,
            fields: raw,
            object,
        }
    }

    /// Decode one raw bag, retaining every reference it holds
    ///
    /// # Errors
    /// `FieldMissing`/`WrongType` for the `isa` key or any modeled field,
    /// `UnknownIsa` for a tag outside the registry.
    pub fn decode(id: ObjectId, fields: Fields, store: &mut ObjectStore) -> Result<Self, DecodeError> {
        let isa = match fields.get("isa") {
            Some(Value::String(tag)) => tag.parse::<Isa>().map_err(|err| DecodeError::UnknownIsa {
                isa: err.0,
                id: id.clone(),
            })?,
            Some(_) => {
                return Err(DecodeError::WrongType {
                    isa: String::from("object"),
                    id,
                    key: String::from("isa"),
                    expected: "string",
                })
            }
            None => {
                return Err(DecodeError::FieldMissing {
                    isa: String::from("object"),
                    id,
                    key: String::from("isa"),
                })
            }
        };
        tracing::trace!(%id, %isa, "decoding record");
        let object = {
            let mut decoder = Decoder::new(&id, isa, &fields, store);
            (isa.decoder())(&mut decoder)?
        };
        Ok(Self { id, fields, object })
    }

    /// Write `isa`, then every modeled field, into the raw bag
    pub fn apply_changes(&mut self) {
        fields::put_string(&mut self.fields, "isa", self.object.isa().as_str());
        self.object.encode(&mut self.fields);
    }

    /// Identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    /// Discriminator
    #[inline]
    #[must_use]
    pub fn isa(&self) -> Isa {
        self.object.isa()
    }

    /// Typed payload
    #[inline]
    #[must_use]
    pub fn object(&self) -> &Object {
        &self.object
    }

    /// Mutable typed payload
    #[inline]
    pub fn object_mut(&mut self) -> &mut Object {
        &mut self.object
    }

    /// Raw field bag as of the last decode or [`apply_changes`](Self::apply_changes)
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Mutable raw field bag
    ///
    /// Modeled keys are overwritten by the next `apply_changes`.
    #[inline]
    pub fn fields_mut(&mut self) -> &mut Fields {
        &mut self.fields
    }

    /// Outgoing references of the payload
    #[inline]
    #[must_use]
    pub fn references(&self) -> Vec<Edge<'_>> {
        self.object.references()
    }

    pub(crate) fn with_id(mut self, id: ObjectId) -> Self {
        self.id = id;
        self
    }
}

/// Record kinds a [`Handle`](crate::Handle) can be narrowed to
///
/// Sealed: the set of kinds is closed, like the set of record types.
pub trait RecordKind: private::Sealed {
    /// Payload type a resolved handle exposes
    type View;

    /// Human readable kind name, used in errors
    const NAME: &'static str;

    /// Narrow a payload to this kind
    fn narrow(object: &Object) -> Option<&Self::View>;

    /// Narrow a mutable payload to this kind
    fn narrow_mut(object: &mut Object) -> Option<&mut Self::View>;
}

/// Sealed trait - prevents external implementations
#[doc(hidden)]
pub mod private {
    /// Sealed trait marker
    pub trait Sealed {}
}

macro_rules! record_kind {
    ($kind:ident, $name:literal) => {
        impl private::Sealed for $kind {}

        impl RecordKind for $kind {
            type View = $kind;
            const NAME: &'static str = $name;

            fn narrow(object: &Object) -> Option<&Self::View> {
                match object {
                    Object::$kind(inner) => Some(inner),
                    _ => None,
                }
            }

            fn narrow_mut(object: &mut Object) -> Option<&mut Self::View> {
                match object {
                    Object::$kind(inner) => Some(inner),
                    _ => None,
                }
            }
        }

        impl From<$kind> for Object {
            fn from(value: $kind) -> Self {
                Object::$kind(value)
            }
        }
    };
}

record_kind!(Project, "project");
record_kind!(ContainerItemProxy, "container item proxy");
record_kind!(BuildFile, "build file");
record_kind!(BuildStyle, "build style");
record_kind!(BuildPhase, "build phase");
record_kind!(BuildConfiguration, "build configuration");
record_kind!(Target, "target");
record_kind!(TargetDependency, "target dependency");
record_kind!(ConfigurationList, "configuration list");
record_kind!(FileElement, "file element");

impl private::Sealed for Object {}

impl RecordKind for Object {
    type View = Object;
    const NAME: &'static str = "object";

    fn narrow(object: &Object) -> Option<&Self::View> {
        Some(object)
    }

    fn narrow_mut(object: &mut Object) -> Option<&mut Self::View> {
        Some(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn bag(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn isa_registry_covers_every_tag() {
        for isa in Isa::ALL {
            assert_eq!(isa.as_str().parse::<Isa>(), Ok(isa));
        }
        assert_eq!(
            "PBXMystery".parse::<Isa>(),
            Err(UnknownIsa("PBXMystery".into()))
        );
    }

    #[test]
    fn decode_rejects_unknown_isa() {
        let mut store = ObjectStore::new();
        let err = Record::decode(
            ObjectId::from("X"),
            bag(json!({"isa": "PBXMystery"})),
            &mut store,
        )
        .unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnknownIsa {
                isa: "PBXMystery".into(),
                id: ObjectId::from("X"),
            }
        );
    }

    #[test]
    fn decode_rejects_missing_isa() {
        let mut store = ObjectStore::new();
        let err = Record::decode(ObjectId::from("X"), Fields::new(), &mut store).unwrap_err();
        assert!(matches!(err, DecodeError::FieldMissing { ref key, .. } if key == "isa"));
    }

    #[test]
    fn container_item_proxy_keeps_raw_fields() {
        let mut store = ObjectStore::new();
        let raw = bag(json!({
            "isa": "PBXContainerItemProxy",
            "containerPortal": "P",
            "proxyType": "1",
        }));
        let mut record = Record::decode(ObjectId::from("C"), raw.clone(), &mut store).unwrap();
        assert_eq!(record.isa(), Isa::ContainerItemProxy);
        assert!(record.references().is_empty());
        record.apply_changes();
        assert_eq!(record.fields(), &raw);
    }

    #[test]
    fn build_style_round_trips() {
        let mut store = ObjectStore::new();
        let raw = bag(json!({
            "isa": "PBXBuildStyle",
            "buildSettings": {"COPY_PHASE_STRIP": "NO"},
            "name": "Development",
        }));
        let mut record = Record::decode(ObjectId::from("S"), raw.clone(), &mut store).unwrap();
        assert_eq!(record.isa(), Isa::BuildStyle);
        assert!(BuildStyle::narrow(record.object()).is_some());
        assert!(record.references().is_empty());
        record.apply_changes();
        assert_eq!(record.fields(), &raw);
    }

    #[test]
    fn new_record_writes_isa_first() {
        let mut record = Record::new(
            ObjectId::from("F"),
            BuildFile {
                file_ref: None,
                settings: None,
            },
        );
        record.apply_changes();
        let keys: Vec<_> = record.fields().keys().cloned().collect();
        assert_eq!(keys, vec!["isa".to_string()]);
        assert_eq!(record.fields()["isa"], json!("PBXBuildFile"));
    }

    #[test]
    fn object_narrowing() {
        let object = Object::from(ContainerItemProxy);
        assert!(ContainerItemProxy::narrow(&object).is_some());
        assert!(BuildFile::narrow(&object).is_none());
        assert!(Object::narrow(&object).is_some());
    }
}
