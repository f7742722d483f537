//! Project edits
//!
//! Higher-level operations on a loaded project: adding files and
//! frameworks to groups and targets, removing them again, reshaping build
//! phases and build settings.
//!
//! New records are created under identifiers derived from the record they
//! are attached to. Handles returned by `new_*` are counted and must be
//! attached somewhere (or released); every other handle returned here is
//! uncounted.

use crate::error::EditError;
use crate::project_file::XcProjectFile;
use indexmap::IndexMap;
use pbx_graph::{
    BuildFile, BuildPhase, BuildPhaseType, FileElement, FileElementKind, FileReference, FileType,
    Group, Handle, Object, ObjectId, ObjectStore, PhaseKind, SettingValue, ShellScript, SourceTree,
    SourceTreeFolder, StoreError, Target,
};
use serde_json::{json, Value};
use std::collections::HashSet;

/// How a framework is attached to a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameworkLink {
    /// Linked in the frameworks phase
    Library,
    /// Copied into the product, signed, headers stripped
    Embedded,
    /// Linked and embedded
    Both,
}

impl FrameworkLink {
    fn links(self) -> bool {
        matches!(self, Self::Library | Self::Both)
    }

    fn embeds(self) -> bool {
        matches!(self, Self::Embedded | Self::Both)
    }
}

impl XcProjectFile {
    /// First target with the given name
    #[must_use]
    pub fn target_named(&self, name: &str) -> Option<Handle<Target>> {
        self.targets()
            .into_iter()
            .find(|t| self.store().get(t).is_some_and(|target| target.name == name))
    }

    /// Targets by name, in the order given
    ///
    /// # Errors
    /// `TargetNotFound` for the first name with no target.
    pub fn targets_named(&self, names: &[&str]) -> Result<Vec<Handle<Target>>, EditError> {
        names
            .iter()
            .map(|name| {
                self.target_named(name)
                    .ok_or_else(|| EditError::TargetNotFound((*name).to_string()))
            })
            .collect()
    }

    /// New file reference, not yet in any group
    ///
    /// `name` defaults to the last component of `path`. The handle is
    /// counted.
    pub fn new_file_reference(
        &mut self,
        name: Option<&str>,
        path: &str,
        source_tree: SourceTree,
    ) -> Handle<FileReference> {
        let mut element = FileElement::file_reference(path, source_tree, None);
        element.name = Some(name.unwrap_or_else(|| last_component(path)).to_string());
        let seed = self.project_handle().into_id();
        self.store_mut().create(&seed, element)
    }

    /// New framework reference, by default relative to the SDK
    ///
    /// The handle is counted.
    pub fn new_framework_reference(
        &mut self,
        path: &str,
        source_tree: Option<SourceTree>,
        file_type: Option<FileType>,
    ) -> Handle<FileReference> {
        let source_tree = source_tree.unwrap_or(SourceTree::RelativeTo(SourceTreeFolder::SdkRoot));
        let mut element = FileElement::file_reference(
            path,
            source_tree,
            Some(file_type.unwrap_or(FileType::Framework)),
        );
        element.name = Some(last_component(path).to_string());
        let seed = self.project_handle().into_id();
        self.store_mut().create(&seed, element)
    }

    /// Subgroup of `parent` whose path or name is `name`, created if missing
    ///
    /// A new group gets `path` (default: `name`) and `source_tree`.
    ///
    /// # Errors
    /// `Store` if `parent` does not resolve to a group.
    pub fn group_named(
        &mut self,
        parent: &Handle<Group>,
        name: &str,
        path: Option<&str>,
        source_tree: SourceTree,
    ) -> Result<Handle<Group>, EditError> {
        let store = self.store();
        let existing = store.try_get(parent)?.sub_groups(store).into_iter().find(|group| {
            store.get(group).is_some_and(|g| {
                g.path.as_deref() == Some(name) || g.name.as_deref() == Some(name)
            })
        });
        if let Some(group) = existing {
            return Ok(group);
        }

        let element = FileElement::group(
            Some(name.to_string()),
            Some(path.unwrap_or(name).to_string()),
            source_tree,
        );
        let store = self.store_mut();
        let group: Handle<Group> = store.create(parent.id(), element);
        let found = group.detach();
        attach_child(store, parent, group.cast())?;
        tracing::debug!(%parent, group = %found, name, "created group");
        Ok(found)
    }

    /// Group at a chain of group names below `parent`, creating each link
    ///
    /// # Errors
    /// As [`group_named`](Self::group_named).
    pub fn group_with_path(
        &mut self,
        parent: &Handle<Group>,
        components: &[&str],
    ) -> Result<Handle<Group>, EditError> {
        let mut group = parent.detach();
        for component in components {
            group = self.group_named(&group, component, None, SourceTree::Group)?;
        }
        Ok(group)
    }

    /// Put files into a group and compile them in each target
    ///
    /// `files` are counted handles, typically from
    /// [`new_file_reference`](Self::new_file_reference); the group takes them
    /// over. `group` defaults to the main group.
    ///
    /// # Errors
    /// `MainGroupMissing` if no group resolves, `Store` if a target does not.
    pub fn add_source_files(
        &mut self,
        files: Vec<Handle<FileReference>>,
        group: Option<&Handle<Group>>,
        targets: &[Handle<Target>],
    ) -> Result<(), EditError> {
        let group = match group {
            Some(group) => group.detach(),
            None => self.main_group().map_err(|_| EditError::MainGroupMissing)?,
        };
        if self.store().get(&group).is_none() {
            return Err(EditError::MainGroupMissing);
        }
        for target in targets {
            self.store().try_get(target)?;
        }

        let file_ids: Vec<Handle<FileReference>> = files.iter().map(Handle::detach).collect();
        let store = self.store_mut();
        for file in files {
            attach_child(store, &group, file.cast())?;
        }
        for target in targets {
            let phase = store.build_phase_or_insert(target, BuildPhaseType::Sources)?;
            for file in &file_ids {
                add_build_file(store, &phase, file, None)?;
            }
        }
        tracing::debug!(files = file_ids.len(), targets = targets.len(), "added source files");
        Ok(())
    }

    /// Put a framework into a group and attach it to targets
    ///
    /// A framework without a file type is marked as `wrapper.framework`.
    /// Embedded copies carry `ATTRIBUTES = (CodeSignOnCopy,
    /// RemoveHeadersOnCopy)`.
    ///
    /// # Errors
    /// `Store` if the framework, the group or a target does not resolve.
    pub fn add_framework(
        &mut self,
        framework: Handle<FileReference>,
        group: &Handle<Group>,
        targets: &[(FrameworkLink, Handle<Target>)],
    ) -> Result<(), EditError> {
        let store = self.store_mut();
        store.try_get(group)?;
        for (_, target) in targets {
            store.try_get(target)?;
        }
        if let FileElementKind::FileReference {
            last_known_file_type,
        } = &mut store.try_get_mut(&framework)?.kind
        {
            last_known_file_type.get_or_insert(FileType::Framework);
        }

        let file = framework.detach();
        attach_child(store, group, framework.cast())?;
        for (link, target) in targets {
            if link.embeds() {
                let phase = store.build_phase_or_insert(target, BuildPhaseType::CopyFiles)?;
                let settings = json!({"ATTRIBUTES": ["CodeSignOnCopy", "RemoveHeadersOnCopy"]});
                add_build_file(store, &phase, &file, Some(settings))?;
            }
            if link.links() {
                let phase = store.build_phase_or_insert(target, BuildPhaseType::Frameworks)?;
                add_build_file(store, &phase, &file, None)?;
            }
        }
        tracing::debug!(framework = %file, targets = targets.len(), "added framework");
        Ok(())
    }

    /// Detach frameworks from groups and from every build phase
    ///
    /// Build files pointing at a framework are dropped from all phases.
    /// Records whose last reference goes away are evicted; returns how many.
    ///
    /// # Errors
    /// `Store` if a reference count is already zero.
    pub fn remove_frameworks(
        &mut self,
        frameworks: &HashSet<ObjectId>,
        groups: &[Handle<Group>],
    ) -> Result<usize, StoreError> {
        let store = self.store_mut();
        let mut evicted = 0;

        for group in groups {
            let Some(children) = store.get_mut(group).and_then(FileElement::children_mut) else {
                continue;
            };
            let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(children)
                .into_iter()
                .partition(|child| frameworks.contains(child.id()));
            *children = kept;
            for child in removed {
                evicted += store.release_cascading(child)?;
            }
        }

        let doomed: HashSet<ObjectId> = store
            .records()
            .filter(|record| match record.object() {
                Object::BuildFile(file) => file
                    .file_ref
                    .as_ref()
                    .is_some_and(|file_ref| frameworks.contains(file_ref.id())),
                _ => false,
            })
            .map(|record| record.id().clone())
            .collect();
        for handle in store.handles_of::<BuildPhase>() {
            let Some(phase) = store.get_mut(&handle) else {
                continue;
            };
            let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut phase.files)
                .into_iter()
                .partition(|file| doomed.contains(file.id()));
            phase.files = kept;
            for file in removed {
                evicted += store.release_cascading(file)?;
            }
        }
        tracing::debug!(frameworks = frameworks.len(), evicted, "removed frameworks");
        Ok(evicted)
    }

    /// Drop a target's build phases matching `predicate`, with their build
    /// files
    ///
    /// Phases that no longer resolve are dropped as well. Returns the number
    /// of phases removed.
    ///
    /// # Errors
    /// `Store` if the target does not resolve or a count is already zero.
    pub fn delete_build_phases<P>(
        &mut self,
        target: &Handle<Target>,
        predicate: P,
    ) -> Result<usize, EditError>
    where
        P: Fn(&BuildPhase) -> bool,
    {
        let store = self.store_mut();
        let phases = std::mem::take(&mut store.try_get_mut(target)?.build_phases);
        let (removed, kept): (Vec<_>, Vec<_>) = phases
            .into_iter()
            .partition(|phase| store.get(phase).map_or(true, &predicate));
        store.try_get_mut(target)?.build_phases = kept;

        let count = removed.len();
        for phase in removed {
            store.release_cascading(phase)?;
        }
        tracing::debug!(%target, removed = count, "deleted build phases");
        Ok(count)
    }

    /// Sort the children of every plain group
    ///
    /// Children without a name or path come first, then groups, then
    /// everything else; within each, by last path component.
    pub fn sort_groups(&mut self) {
        let store = self.store_mut();
        for group in store.handles_of::<Group>() {
            let Some(element) = store.get(&group).filter(|g| g.is_simple_group()) else {
                continue;
            };
            let mut children: Vec<_> = element.children().unwrap_or_default().to_vec();
            children.sort_by_cached_key(|child| match store.get(child) {
                Some(element) => match element.path.as_deref().or(element.name.as_deref()) {
                    Some(label) => (
                        if element.is_simple_group() { 1 } else { 2 },
                        last_component(label).to_string(),
                    ),
                    None => (0, String::new()),
                },
                None => (0, String::new()),
            });
            if let Some(slot) = store.get_mut(&group).and_then(FileElement::children_mut) {
                *slot = children;
            }
        }
    }

    /// Set one build setting in every configuration of a target
    ///
    /// # Errors
    /// `ConfigurationListMissing` if the target has no configuration list.
    pub fn set_build_setting(
        &mut self,
        target: &Handle<Target>,
        key: &str,
        value: impl Into<SettingValue>,
    ) -> Result<(), EditError> {
        let value = value.into();
        self.update_build_settings(target, [(key.to_string(), value)])
    }

    /// Merge settings into every configuration of a target, overriding
    /// existing keys
    ///
    /// # Errors
    /// `ConfigurationListMissing` if the target has no configuration list.
    pub fn update_build_settings<I>(&mut self, target: &Handle<Target>, settings: I) -> Result<(), EditError>
    where
        I: IntoIterator<Item = (String, SettingValue)>,
    {
        let settings: Vec<_> = settings.into_iter().collect();
        self.for_each_configuration(target, |build_settings| {
            for (key, value) in &settings {
                build_settings.insert(key.clone(), value.clone());
            }
        })
    }

    /// Append values to a list setting in every configuration of a target
    ///
    /// A scalar value becomes the first list element; values already in the
    /// list are not repeated.
    ///
    /// # Errors
    /// `ConfigurationListMissing` if the target has no configuration list.
    pub fn append_setting_values(
        &mut self,
        target: &Handle<Target>,
        key: &str,
        values: &[&str],
    ) -> Result<(), EditError> {
        self.for_each_configuration(target, |build_settings| {
            build_settings
                .entry(key.to_string())
                .or_insert_with(|| SettingValue::List(Vec::new()))
                .append(values.iter().copied());
        })
    }

    fn for_each_configuration<F>(&mut self, target: &Handle<Target>, mut apply: F) -> Result<(), EditError>
    where
        F: FnMut(&mut IndexMap<String, SettingValue>),
    {
        let store = self.store_mut();
        let resolved = store.try_get(target)?;
        let name = resolved.name.clone();
        let configurations = store
            .get(&resolved.build_configuration_list)
            .map(|list| list.build_configurations.clone())
            .ok_or(EditError::ConfigurationListMissing(name))?;
        for configuration in &configurations {
            if let Some(configuration) = store.get_mut(configuration) {
                apply(&mut configuration.build_settings);
            }
        }
        Ok(())
    }

    /// Shell script phase of a target with the given name, created if
    /// missing; its script body is set to `script`
    ///
    /// # Errors
    /// `Store` if the target does not resolve.
    pub fn add_shell_script_phase(
        &mut self,
        target: &Handle<Target>,
        name: &str,
        script: &str,
    ) -> Result<Handle<BuildPhase>, EditError> {
        let store = self.store_mut();
        let phase = store.build_phase_or_insert_with(
            target,
            PhaseKind::ShellScript(ShellScript::new(name, script)),
            |phase| phase.name() == Some(name),
            Vec::push,
        )?;
        if let Some(PhaseKind::ShellScript(existing)) = store.get_mut(&phase).map(|p| &mut p.kind) {
            existing.shell_script = script.to_string();
        }
        Ok(phase)
    }

    /// Copy a target under a new name and add it to the project
    ///
    /// # Errors
    /// `ConfigurationListMissing` if the target's configurations do not
    /// resolve, `Store` for other unresolvable records.
    pub fn duplicate_target(&mut self, target: &Handle<Target>, name: &str) -> Result<Handle<Target>, EditError> {
        let original = self.store().try_get(target)?.name.clone();
        let store = self.store_mut();
        let copy = store.deep_clone_target(target).map_err(|err| match err {
            StoreError::Missing { .. } | StoreError::WrongKind { .. } => {
                EditError::ConfigurationListMissing(original.clone())
            }
            other => EditError::Store(other),
        })?;
        let found = copy.detach();
        if let Some(cloned) = store.get_mut(&copy) {
            cloned.name = name.to_string();
            cloned.product_name = name.to_string();
        }
        self.project_mut()?.targets.push(copy);
        tracing::debug!(%original, copy = %found, "duplicated target");
        Ok(found)
    }
}

/// Move a counted child handle into a group, releasing it if the group
/// already holds it
fn attach_child(
    store: &mut ObjectStore,
    group: &Handle<Group>,
    child: Handle<FileElement>,
) -> Result<(), StoreError> {
    let rejected = store.try_get_mut(group)?.add_child(child);
    if let Some(rejected) = rejected {
        store.release(rejected)?;
    }
    Ok(())
}

/// New build file for `file` in `phase`, unless the phase already has one
/// for that file
fn add_build_file(
    store: &mut ObjectStore,
    phase: &Handle<BuildPhase>,
    file: &Handle<FileReference>,
    settings: Option<Value>,
) -> Result<(), StoreError> {
    let present = store.try_get(phase)?.files.iter().any(|existing| {
        store
            .get(existing)
            .and_then(|bf| bf.file_ref.as_ref())
            .is_some_and(|file_ref| file_ref.id() == file.id())
    });
    if present {
        return Ok(());
    }
    let file_ref = store.share(file).cast();
    let build_file = BuildFile {
        file_ref: Some(file_ref),
        settings,
    };
    let handle: Handle<BuildFile> = store.create(phase.id(), build_file);
    let rejected = store.try_get_mut(phase)?.add_build_file(handle);
    if let Some(rejected) = rejected {
        store.release_cascading(rejected)?;
    }
    Ok(())
}

fn last_component(path: &str) -> &str {
    path.rsplit('/').find(|s| !s.is_empty()).unwrap_or(path)
}
