//! Derived path resolution over the group tree
//!
//! Walks the tree top-down from the main group, carrying a string prefix.
//! A child's path is composed from the child's own source tree and the
//! source tree of the group that directly contains it:
//!
//! | child tree        | parent tree     | result                               |
//! |-------------------|-----------------|--------------------------------------|
//! | `<group>`         | `<absolute>`    | absolute `prefix/path`               |
//! | `<group>`         | `<group>`       | relative to `SOURCE_ROOT`, `prefix/path` |
//! | `<group>`         | folder `F`      | relative to `F`, `prefix/path`       |
//! | `<absolute>`      | any             | absolute `path`                      |
//! | folder `F`        | any             | relative to `F`, `path`              |
//!
//! Only the immediate parent's tree is consulted, never the chain above it.
//! The prefix handed to a subgroup is `prefix/path` for a group-relative
//! subgroup and the bare `path` otherwise; a subgroup without a path passes
//! the current prefix through.

use crate::handle::Handle;
use crate::id::ObjectId;
use crate::object::{FileElement, Group};
use crate::source_tree::{ElementPath, SourceTree, SourceTreeFolder};
use crate::store::ObjectStore;
use std::collections::{BTreeMap, HashSet};

/// Path of a child element, given its containing group's tree and prefix
#[must_use]
pub fn compose(child: SourceTree, parent: SourceTree, prefix: &str, path: &str) -> ElementPath {
    match child {
        SourceTree::Group => {
            let joined = format!("{prefix}/{path}");
            match parent {
                SourceTree::Absolute => ElementPath::Absolute(joined),
                SourceTree::Group => ElementPath::RelativeTo(SourceTreeFolder::SourceRoot, joined),
                SourceTree::RelativeTo(folder) => ElementPath::RelativeTo(folder, joined),
            }
        }
        SourceTree::Absolute => ElementPath::Absolute(path.to_string()),
        SourceTree::RelativeTo(folder) => ElementPath::RelativeTo(folder, path.to_string()),
    }
}

/// Prefix a subgroup hands down to its own children
#[must_use]
pub fn subgroup_prefix(group: &FileElement, prefix: &str) -> String {
    match (&group.path, group.source_tree) {
        (None, _) => prefix.to_string(),
        (Some(path), SourceTree::Group) => format!("{prefix}/{path}"),
        (Some(path), _) => path.clone(),
    }
}

/// Path of every group and file reference reachable from `main_group`
///
/// Elements without a `path`, or not reachable through groups, are absent.
/// Dangling children are skipped. A group reached a second time (a cycle in
/// a malformed tree) is not walked again.
#[must_use]
pub fn resolve_paths(store: &ObjectStore, main_group: &Handle<Group>) -> BTreeMap<ObjectId, ElementPath> {
    let mut resolved = BTreeMap::new();
    let mut visited = HashSet::new();
    walk(store, main_group, "", &mut resolved, &mut visited);
    resolved
}

fn walk(
    store: &ObjectStore,
    group_handle: &Handle<Group>,
    prefix: &str,
    resolved: &mut BTreeMap<ObjectId, ElementPath>,
    visited: &mut HashSet<ObjectId>,
) {
    if !visited.insert(group_handle.id().clone()) {
        tracing::warn!(group = %group_handle, "group tree has a cycle");
        return;
    }
    let Some(group) = store.get(group_handle) else {
        return;
    };

    let file_refs = group.file_refs(store);
    let sub_groups = group.sub_groups(store);

    let children = file_refs
        .iter()
        .filter_map(|h| store.get(h).map(|element| (h.id(), element)))
        .chain(
            sub_groups
                .iter()
                .filter_map(|h| store.get(h).map(|element| (h.id(), element))),
        );
    for (id, child) in children {
        if let Some(path) = &child.path {
            let composed = compose(child.source_tree, group.source_tree, prefix, path);
            resolved.insert(id.clone(), composed);
        }
    }

    for sub_group in &sub_groups {
        if let Some(child) = store.get(sub_group) {
            let next_prefix = subgroup_prefix(child, prefix);
            walk(store, sub_group, &next_prefix, resolved, visited);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source_tree::SourceTreeFolder::{BuildProductsDir, SdkRoot, SourceRoot};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn composition_table() {
        let group = SourceTree::Group;
        let absolute = SourceTree::Absolute;
        let sdk = SourceTree::RelativeTo(SdkRoot);
        assert_eq!(compose(group, absolute, "/opt", "x"), ElementPath::absolute("/opt/x"));
        assert_eq!(compose(group, group, "/A", "x"), ElementPath::relative(SourceRoot, "/A/x"));
        assert_eq!(compose(group, sdk, "usr/lib", "x"), ElementPath::relative(SdkRoot, "usr/lib/x"));
        assert_eq!(compose(absolute, sdk, "/ignored", "/x"), ElementPath::absolute("/x"));
        assert_eq!(
            compose(SourceTree::RelativeTo(BuildProductsDir), absolute, "/ignored", "App.app"),
            ElementPath::relative(BuildProductsDir, "App.app")
        );
    }

    #[test]
    fn folder_relative_parent_only_affects_direct_children() {
        let objects = json!({
            "ROOT": {"isa": "PBXGroup", "children": ["SDK"], "sourceTree": "<group>"},
            "SDK": {"isa": "PBXGroup", "children": ["INNER"], "path": "usr", "sourceTree": "SDKROOT"},
            "INNER": {"isa": "PBXGroup", "children": ["LIB"], "path": "lib", "sourceTree": "<group>"},
            "LIB": {"isa": "PBXFileReference", "path": "libz.tbd", "sourceTree": "<group>"},
        });
        let store = ObjectStore::decode(objects.as_object().unwrap()).unwrap();
        let paths = resolve_paths(&store, &Handle::detached(ObjectId::from("ROOT")));

        assert_eq!(paths[&ObjectId::from("SDK")], ElementPath::relative(SdkRoot, "usr"));
        assert_eq!(paths[&ObjectId::from("INNER")], ElementPath::relative(SdkRoot, "usr/lib"));
        assert_eq!(
            paths[&ObjectId::from("LIB")],
            ElementPath::relative(SourceRoot, "usr/lib/libz.tbd")
        );
    }

    #[test]
    fn pathless_elements_are_absent_and_cycles_terminate() {
        let objects = json!({
            "ROOT": {"isa": "PBXGroup", "children": ["LOOP", "NOPATH"], "sourceTree": "<group>"},
            "LOOP": {"isa": "PBXGroup", "children": ["ROOT", "GONE"], "path": "L", "sourceTree": "<group>"},
            "NOPATH": {"isa": "PBXFileReference", "name": "x", "sourceTree": "<group>"},
        });
        let store = ObjectStore::decode(objects.as_object().unwrap()).unwrap();
        let paths = resolve_paths(&store, &Handle::detached(ObjectId::from("ROOT")));
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[&ObjectId::from("LOOP")], ElementPath::relative(SourceRoot, "/L"));
    }
}
