//! File references, reference proxies and groups
//!
//! All of them locate something on disk through a `path` and a
//! [`SourceTree`], and all of them can be children of a group, so they share
//! one payload type, [`FileElement`], with the variant in [`FileElementKind`].

use super::{private, ContainerItemProxy, Decoder, Edge, Isa, Object, RecordKind};
use crate::error::DecodeError;
use crate::fields::{self, Fields};
use crate::file_type::FileType;
use crate::handle::Handle;
use crate::source_tree::SourceTree;
use crate::store::ObjectStore;

/// Variant payload of a file element
#[derive(Debug, Clone, PartialEq)]
pub enum FileElementKind {
    /// `PBXFileReference`
    FileReference {
        /// Type Xcode last detected for the file
        last_known_file_type: Option<FileType>,
    },
    /// `PBXReferenceProxy`
    ReferenceProxy {
        /// Proxy for the remote object
        remote_ref: Handle<ContainerItemProxy>,
    },
    /// `PBXGroup`
    Group {
        /// Children, in display order
        children: Vec<Handle<FileElement>>,
    },
    /// `PBXVariantGroup`: localized variants of one file
    VariantGroup {
        /// Children, in display order
        children: Vec<Handle<FileElement>>,
    },
    /// `XCVersionGroup`: versions of a data model
    VersionGroup {
        /// Versions; the list is fixed once decoded
        children: Vec<Handle<FileReference>>,
    },
}

/// Anything that can sit in the group tree
#[derive(Debug, Clone, PartialEq)]
pub struct FileElement {
    /// Display name, when it differs from the last path component
    pub name: Option<String>,
    /// Path, interpreted relative to `source_tree`
    pub path: Option<String>,
    /// Frame of reference for `path`
    pub source_tree: SourceTree,
    /// Text encoding number
    pub file_encoding: Option<i64>,
    /// Variant payload
    pub kind: FileElementKind,
}

impl FileElement {
    /// File reference with a path
    #[must_use]
    pub fn file_reference(
        path: impl Into<String>,
        source_tree: SourceTree,
        last_known_file_type: Option<FileType>,
    ) -> Self {
        Self {
            name: None,
            path: Some(path.into()),
            source_tree,
            file_encoding: None,
            kind: FileElementKind::FileReference {
                last_known_file_type,
            },
        }
    }

    /// Empty group
    #[must_use]
    pub fn group(name: Option<String>, path: Option<String>, source_tree: SourceTree) -> Self {
        Self {
            name,
            path,
            source_tree,
            file_encoding: None,
            kind: FileElementKind::Group {
                children: Vec::new(),
            },
        }
    }

    /// Discriminator
    #[must_use]
    pub fn isa(&self) -> Isa {
        match self.kind {
            FileElementKind::FileReference { .. } => Isa::FileReference,
            FileElementKind::ReferenceProxy { .. } => Isa::ReferenceProxy,
            FileElementKind::Group { .. } => Isa::Group,
            FileElementKind::VariantGroup { .. } => Isa::VariantGroup,
            FileElementKind::VersionGroup { .. } => Isa::VersionGroup,
        }
    }

    /// Name shown in the navigator: `name`, else `path`
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().or(self.path.as_deref())
    }

    /// True for `PBXFileReference`
    #[inline]
    #[must_use]
    pub fn is_file_reference(&self) -> bool {
        matches!(self.kind, FileElementKind::FileReference { .. })
    }

    /// True for `PBXGroup` and `PBXVariantGroup`
    #[inline]
    #[must_use]
    pub fn is_group(&self) -> bool {
        matches!(
            self.kind,
            FileElementKind::Group { .. } | FileElementKind::VariantGroup { .. }
        )
    }

    /// True for a plain `PBXGroup` (not a variant group)
    #[inline]
    #[must_use]
    pub fn is_simple_group(&self) -> bool {
        matches!(self.kind, FileElementKind::Group { .. })
    }

    /// Last known file type of a file reference
    #[must_use]
    pub fn last_known_file_type(&self) -> Option<&FileType> {
        match &self.kind {
            FileElementKind::FileReference {
                last_known_file_type,
            } => last_known_file_type.as_ref(),
            _ => None,
        }
    }

    /// Children of a group or variant group
    #[must_use]
    pub fn children(&self) -> Option<&[Handle<FileElement>]> {
        match &self.kind {
            FileElementKind::Group { children } | FileElementKind::VariantGroup { children } => {
                Some(children)
            }
            _ => None,
        }
    }

    /// Mutable children of a group or variant group
    pub fn children_mut(&mut self) -> Option<&mut Vec<Handle<FileElement>>> {
        match &mut self.kind {
            FileElementKind::Group { children } | FileElementKind::VariantGroup { children } => {
                Some(children)
            }
            _ => None,
        }
    }

    /// Append a child unless already present
    ///
    /// Returns the handle back when it was not added: a duplicate, or `self`
    /// is not a group. A counted handle returned here must be released.
    #[must_use = "a rejected counted handle must be released"]
    pub fn add_child(&mut self, child: Handle<FileElement>) -> Option<Handle<FileElement>> {
        match self.children_mut() {
            Some(children) if !children.contains(&child) => {
                children.push(child);
                None
            }
            _ => Some(child),
        }
    }

    /// Child groups (plain and variant), as uncounted handles
    #[must_use]
    pub fn sub_groups(&self, store: &ObjectStore) -> Vec<Handle<Group>> {
        self.children_of_kind::<Group>(store)
    }

    /// Child file references, as uncounted handles
    #[must_use]
    pub fn file_refs(&self, store: &ObjectStore) -> Vec<Handle<FileReference>> {
        self.children_of_kind::<FileReference>(store)
    }

    fn children_of_kind<K: RecordKind>(&self, store: &ObjectStore) -> Vec<Handle<K>> {
        self.children()
            .unwrap_or_default()
            .iter()
            .map(|child| child.detach().cast::<K>())
            .filter(|child| store.get(child).is_some())
            .collect()
    }

    pub(super) fn decode(d: &mut Decoder<'_>) -> Result<Object, DecodeError> {
        let name = d.optional_string("name")?;
        let path = d.optional_string("path")?;
        let source_tree = d.source_tree("sourceTree")?;
        let file_encoding = d.optional_int("fileEncoding")?;
        let kind = match d.isa() {
            Isa::ReferenceProxy => FileElementKind::ReferenceProxy {
                remote_ref: d.handle("remoteRef")?,
            },
            Isa::Group => FileElementKind::Group {
                children: d.handles("children")?,
            },
            Isa::VariantGroup => FileElementKind::VariantGroup {
                children: d.handles("children")?,
            },
            Isa::VersionGroup => FileElementKind::VersionGroup {
                children: d.handles("children")?,
            },
            _ => FileElementKind::FileReference {
                last_known_file_type: d
                    .optional_string("lastKnownFileType")?
                    .map(|raw| FileType::from(raw.as_str())),
            },
        };
        Ok(Object::FileElement(Self {
            name,
            path,
            source_tree,
            file_encoding,
            kind,
        }))
    }

    pub(super) fn encode(&self, fields: &mut Fields) {
        fields::put_optional_string(fields, "name", self.name.as_deref());
        fields::put_optional_string(fields, "path", self.path.as_deref());
        fields::put_string(fields, "sourceTree", self.source_tree.as_str());
        fields::put_optional_int(fields, "fileEncoding", self.file_encoding);
        match &self.kind {
            FileElementKind::FileReference {
                last_known_file_type,
            } => fields::put_optional_string(
                fields,
                "lastKnownFileType",
                last_known_file_type.as_ref().map(FileType::as_str),
            ),
            FileElementKind::ReferenceProxy { remote_ref } => {
                fields::put_id(fields, "remoteRef", remote_ref);
            }
            FileElementKind::Group { children } | FileElementKind::VariantGroup { children } => {
                fields::put_ids(fields, "children", children);
            }
            FileElementKind::VersionGroup { children } => {
                fields::put_ids(fields, "children", children);
            }
        }
    }

    pub(super) fn collect_references<'a>(&'a self, edges: &mut Vec<Edge<'a>>) {
        match &self.kind {
            FileElementKind::FileReference { .. } => {}
            FileElementKind::ReferenceProxy { remote_ref } => {
                edges.push(Edge::new("remoteRef", remote_ref.id()));
            }
            FileElementKind::Group { children } | FileElementKind::VariantGroup { children } => {
                edges.extend(children.iter().map(|h| Edge::new("children", h.id())));
            }
            FileElementKind::VersionGroup { children } => {
                edges.extend(children.iter().map(|h| Edge::new("children", h.id())));
            }
        }
    }
}

/// Kind marker: a plain or variant group
///
/// `Handle<Group>` resolves to the group's [`FileElement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Group;

/// Kind marker: a file reference
///
/// `Handle<FileReference>` resolves to the reference's [`FileElement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileReference;

impl private::Sealed for Group {}

impl RecordKind for Group {
    type View = FileElement;
    const NAME: &'static str = "group";

    fn narrow(object: &Object) -> Option<&FileElement> {
        match object {
            Object::FileElement(element) if element.is_group() => Some(element),
            _ => None,
        }
    }

    fn narrow_mut(object: &mut Object) -> Option<&mut FileElement> {
        match object {
            Object::FileElement(element) if element.is_group() => Some(element),
            _ => None,
        }
    }
}

impl private::Sealed for FileReference {}

impl RecordKind for FileReference {
    type View = FileElement;
    const NAME: &'static str = "file reference";

    fn narrow(object: &Object) -> Option<&FileElement> {
        match object {
            Object::FileElement(element) if element.is_file_reference() => Some(element),
            _ => None,
        }
    }

    fn narrow_mut(object: &mut Object) -> Option<&mut FileElement> {
        match object {
            Object::FileElement(element) if element.is_file_reference() => Some(element),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ObjectId;
    use crate::object::Record;
    use crate::source_tree::SourceTreeFolder;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn decode(store: &mut ObjectStore, id: &str, value: Value) -> Record {
        Record::decode(ObjectId::from(id), value.as_object().cloned().unwrap(), store).unwrap()
    }

    #[test]
    fn file_reference_round_trip_with_unknown_type() {
        let raw = json!({
            "isa": "PBXFileReference",
            "fileEncoding": "4",
            "lastKnownFileType": "sourcecode.metal",
            "path": "Shaders.metal",
            "sourceTree": "<group>",
        });
        let mut store = ObjectStore::new();
        let mut record = decode(&mut store, "F", raw.clone());
        let Object::FileElement(element) = record.object() else {
            panic!("expected element");
        };
        assert_eq!(element.file_encoding, Some(4));
        assert_eq!(
            element.last_known_file_type(),
            Some(&FileType::Other("sourcecode.metal".into()))
        );
        record.apply_changes();
        assert_eq!(Value::Object(record.fields().clone()), raw);
    }

    #[test]
    fn source_tree_is_required_and_checked() {
        let mut store = ObjectStore::new();
        let fields = json!({"isa": "PBXGroup", "children": [], "sourceTree": "<nowhere>"})
            .as_object()
            .cloned()
            .unwrap();
        let err = Record::decode(ObjectId::from("G"), fields, &mut store).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::WrongType { ref key, expected: "source tree", .. } if key == "sourceTree"
        ));
    }

    #[test]
    fn group_views_filter_by_kind() {
        let mut store = ObjectStore::new();
        let root = decode(
            &mut store,
            "ROOT",
            json!({"isa": "PBXGroup", "children": ["SUB", "FILE", "VAR"], "sourceTree": "<group>"}),
        );
        let sub = decode(
            &mut store,
            "SUB",
            json!({"isa": "PBXGroup", "children": [], "path": "Sub", "sourceTree": "<group>"}),
        );
        let file = decode(
            &mut store,
            "FILE",
            json!({"isa": "PBXFileReference", "path": "a.c", "sourceTree": "SOURCE_ROOT"}),
        );
        let variant = decode(
            &mut store,
            "VAR",
            json!({"isa": "PBXVariantGroup", "children": [], "name": "Main.strings", "sourceTree": "<group>"}),
        );
        for record in [sub, file, variant] {
            store.insert_decoded(record);
        }

        let Object::FileElement(root) = root.object() else {
            panic!("expected group");
        };
        let groups: Vec<_> = root.sub_groups(&store).iter().map(|h| h.id().to_string()).collect();
        let files: Vec<_> = root.file_refs(&store).iter().map(|h| h.id().to_string()).collect();
        assert_eq!(groups, vec!["SUB", "VAR"]);
        assert_eq!(files, vec!["FILE"]);
    }

    #[test]
    fn add_child_skips_duplicates_and_non_groups() {
        let mut group = FileElement::group(Some("G".into()), None, SourceTree::Group);
        let child: Handle<FileElement> = Handle::detached(ObjectId::from("C"));
        assert!(group.add_child(child.clone()).is_none());
        assert!(group.add_child(child.clone()).is_some());
        assert_eq!(group.children().map(<[_]>::len), Some(1));

        let mut file = FileElement::file_reference(
            "x.c",
            SourceTree::RelativeTo(SourceTreeFolder::SourceRoot),
            None,
        );
        assert!(file.add_child(child).is_some());
        assert!(!file.is_group());
        assert!(group.is_simple_group());
    }
}
