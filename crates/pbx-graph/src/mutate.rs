//! Cloning records and locating build phases
//!
//! Clones are stored under fresh identifiers derived from the original's
//! and retain every reference they hold, so they share no state with the
//! original beyond the records both point at.

use crate::error::StoreError;
use crate::fields::Fields;
use crate::handle::Handle;
use crate::object::{
    BuildPhase, BuildPhaseType, ConfigurationList, Object, PhaseKind, Record, RecordKind, Target,
};
use crate::store::ObjectStore;
use serde_json::Value;

impl ObjectStore {
    /// Copy a record under a fresh identifier
    ///
    /// The copy's references are retained again and the copy itself is
    /// retained once; the returned handle is counted.
    ///
    /// # Errors
    /// `Missing`/`WrongKind` if the handle does not resolve to a `T`.
    pub fn clone_record<T: RecordKind>(&mut self, handle: &Handle<T>) -> Result<Handle<T>, StoreError> {
        self.try_get(handle)?;
        let original = self
            .resolve(handle.id())
            .cloned()
            .ok_or_else(|| StoreError::Missing {
                id: handle.id().clone(),
                expected: T::NAME,
            })?;
        let targets: Vec<_> = original
            .references()
            .iter()
            .map(|edge| edge.target.clone())
            .collect();
        for target in &targets {
            let _: Handle<Object> = self.retain(target);
        }
        let id = self.fresh_id(handle.id());
        tracing::debug!(original = %handle, clone = %id, "cloned record");
        Ok(self.insert(original.with_id(id)))
    }

    /// Copy a configuration list together with its configurations
    ///
    /// # Errors
    /// `Missing`/`WrongKind` for the list or any of its configurations.
    pub fn deep_clone_configuration_list(
        &mut self,
        list: &Handle<ConfigurationList>,
    ) -> Result<Handle<ConfigurationList>, StoreError> {
        let original = self.try_get(list)?.clone();
        for configuration in &original.build_configurations {
            self.try_get(configuration)?;
        }

        let mut build_configurations = Vec::with_capacity(original.build_configurations.len());
        for configuration in &original.build_configurations {
            build_configurations.push(self.clone_record(configuration)?);
        }
        let payload = ConfigurationList {
            build_configurations,
            ..original
        };
        Ok(self.insert_copy(list, payload))
    }

    /// Copy a target with copies of its build phases, its dependencies and
    /// its configuration list
    ///
    /// Phases and dependencies that do not resolve are left out of the copy.
    /// Build files are shared between the original phases and their copies.
    ///
    /// # Errors
    /// `Missing`/`WrongKind` for the target or its configuration list, checked
    /// before anything is copied.
    pub fn deep_clone_target(&mut self, target: &Handle<Target>) -> Result<Handle<Target>, StoreError> {
        let original = self.try_get(target)?.clone();
        self.try_get(&original.build_configuration_list)?;

        let build_configuration_list =
            self.deep_clone_configuration_list(&original.build_configuration_list)?;

        let mut build_phases = Vec::with_capacity(original.build_phases.len());
        for phase in &original.build_phases {
            if self.get(phase).is_some() {
                build_phases.push(self.clone_record(phase)?);
            }
        }
        let mut dependencies = Vec::with_capacity(original.dependencies.len());
        for dependency in &original.dependencies {
            if self.get(dependency).is_some() {
                dependencies.push(self.clone_record(dependency)?);
            }
        }

        let payload = Target {
            build_configuration_list,
            build_phases,
            dependencies,
            ..original
        };
        Ok(self.insert_copy(target, payload))
    }

    /// Store `payload` under a fresh identifier, with the raw fields of
    /// `original` carried over
    fn insert_copy<T>(&mut self, original: &Handle<T>, payload: impl Into<Object>) -> Handle<T> {
        let fields = self
            .resolve(original.id())
            .map(|r| r.fields().clone())
            .unwrap_or_default();
        let id = self.fresh_id(original.id());
        let mut record = Record::with_fields(id, fields, payload);
        record.apply_changes();
        self.insert(record)
    }

    /// First build phase of a target with the given variant
    ///
    /// The returned handle is not counted.
    #[must_use]
    pub fn build_phase_of(
        &self,
        target: &Handle<Target>,
        phase_type: BuildPhaseType,
    ) -> Option<Handle<BuildPhase>> {
        self.build_phase_where(target, |phase| phase.phase_type() == phase_type)
    }

    /// First build phase of a target matching a predicate
    ///
    /// The returned handle is not counted.
    pub fn build_phase_where<P>(&self, target: &Handle<Target>, predicate: P) -> Option<Handle<BuildPhase>>
    where
        P: Fn(&BuildPhase) -> bool,
    {
        self.get(target)?
            .build_phases
            .iter()
            .find(|h| self.get(*h).is_some_and(&predicate))
            .map(Handle::detach)
    }

    /// Build phase of the given variant, appended to the target if missing
    ///
    /// # Errors
    /// `Missing`/`WrongKind` if the target does not resolve.
    pub fn build_phase_or_insert(
        &mut self,
        target: &Handle<Target>,
        phase_type: BuildPhaseType,
    ) -> Result<Handle<BuildPhase>, StoreError> {
        self.build_phase_or_insert_with(target, phase_type.default_kind(), |_| true, Vec::push)
    }

    /// Build phase of `kind`'s variant matching `predicate`, created if missing
    ///
    /// A new phase holds `kind` and is placed in the target's phase list by
    /// `insert`. The returned handle is not counted.
    ///
    /// # Errors
    /// `Missing`/`WrongKind` if the target does not resolve; nothing is
    /// created in that case.
    pub fn build_phase_or_insert_with<P, I>(
        &mut self,
        target: &Handle<Target>,
        kind: PhaseKind,
        predicate: P,
        insert: I,
    ) -> Result<Handle<BuildPhase>, StoreError>
    where
        P: Fn(&BuildPhase) -> bool,
        I: FnOnce(&mut Vec<Handle<BuildPhase>>, Handle<BuildPhase>),
    {
        self.try_get(target)?;
        let phase_type = kind.phase_type();
        if let Some(found) =
            self.build_phase_where(target, |phase| phase.phase_type() == phase_type && predicate(phase))
        {
            return Ok(found);
        }

        let phase: Handle<BuildPhase> =
            self.create_with_fields(target.id(), default_phase_fields(), BuildPhase::new(kind));
        let found = phase.detach();
        let target = self.try_get_mut(target)?;
        insert(&mut target.build_phases, phase);
        tracing::debug!(phase = %found, %phase_type, "added build phase");
        Ok(found)
    }
}

/// Raw fields every new build phase starts with
fn default_phase_fields() -> Fields {
    let mut fields = Fields::new();
    fields.insert(
        "buildActionMask".to_string(),
        Value::String(BuildPhase::RESOURCES_BUILD_ACTION_MASK.to_string()),
    );
    fields.insert(
        "runOnlyForDeploymentPostprocessing".to_string(),
        Value::String("0".to_string()),
    );
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ObjectId;
    use crate::object::{BuildConfiguration, SettingValue, ShellScript};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample() -> ObjectStore {
        let objects = json!({
            "T": {
                "isa": "PBXNativeTarget",
                "buildConfigurationList": "L",
                "buildPhases": ["S", "FW"],
                "dependencies": [],
                "name": "App",
                "productName": "App",
                "productType": "com.apple.product-type.application",
            },
            "L": {
                "isa": "XCConfigurationList",
                "buildConfigurations": ["D"],
                "defaultConfigurationIsVisible": "0",
                "defaultConfigurationName": "Debug",
            },
            "D": {"isa": "XCBuildConfiguration", "buildSettings": {"A": "1"}, "name": "Debug"},
            "S": {"isa": "PBXSourcesBuildPhase", "buildActionMask": "2147483647", "files": ["BF"], "runOnlyForDeploymentPostprocessing": "0"},
            "FW": {"isa": "PBXFrameworksBuildPhase", "buildActionMask": "2147483647", "files": [], "runOnlyForDeploymentPostprocessing": "0"},
            "BF": {"isa": "PBXBuildFile", "fileRef": "F"},
            "F": {"isa": "PBXFileReference", "path": "main.c", "sourceTree": "<group>"},
        });
        let mut store = ObjectStore::decode(objects.as_object().unwrap()).unwrap();
        let _target: Handle<Target> = store.retain(&ObjectId::from("T"));
        store
    }

    #[test]
    fn clone_record_retains_outgoing_references() {
        let mut store = sample();
        let phase: Handle<BuildPhase> = Handle::detached(ObjectId::from("S"));
        let copy = store.clone_record(&phase).unwrap();
        assert_ne!(copy.id(), phase.id());
        assert_eq!(store.ref_count(&ObjectId::from("BF")), 2);
        assert_eq!(store.ref_count(copy.id()), 1);
        assert_eq!(store.get(&copy), store.get(&phase));
    }

    #[test]
    fn deep_clone_target_shares_no_configuration_state() {
        let mut store = sample();
        let target: Handle<Target> = Handle::detached(ObjectId::from("T"));
        let copy = store.deep_clone_target(&target).unwrap();

        let original = store.get(&target).unwrap().clone();
        let cloned = store.get(&copy).unwrap().clone();
        assert_eq!(cloned.name, "App");
        assert_ne!(cloned.build_configuration_list, original.build_configuration_list);
        assert_eq!(cloned.build_phases.len(), 2);
        assert!(cloned
            .build_phases
            .iter()
            .all(|phase| !original.build_phases.contains(phase)));

        let list = store.get(&cloned.build_configuration_list).unwrap().clone();
        assert_eq!(list.default_configuration_name.as_deref(), Some("Debug"));
        let config = list.default_configuration(&store).unwrap();
        assert_ne!(config.id().as_str(), "D");

        store.get_mut(&config).unwrap().build_settings.insert("A".into(), SettingValue::from("2"));
        let original_config: Handle<BuildConfiguration> = Handle::detached(ObjectId::from("D"));
        assert_eq!(
            store.get(&original_config).unwrap().setting("A"),
            Some(&SettingValue::from("1"))
        );
        let raw = store.resolve(list_id(&cloned)).unwrap().fields();
        assert_eq!(raw["defaultConfigurationIsVisible"], json!("0"));
    }

    fn list_id(target: &Target) -> &ObjectId {
        target.build_configuration_list.id()
    }

    #[test]
    fn deep_clone_fails_cleanly_without_configuration_list() {
        let mut store = sample();
        let list: Handle<ConfigurationList> = store.retain(&ObjectId::from("L"));
        store.release(list).unwrap();
        store.release(Handle::<ConfigurationList>::detached(ObjectId::from("L"))).unwrap();
        let before = store.len();
        let target: Handle<Target> = Handle::detached(ObjectId::from("T"));
        assert!(matches!(
            store.deep_clone_target(&target),
            Err(StoreError::Missing { .. })
        ));
        assert_eq!(store.len(), before);
    }

    #[test]
    fn build_phase_lookup_and_insert() {
        let mut store = sample();
        let target: Handle<Target> = Handle::detached(ObjectId::from("T"));
        let sources = store.build_phase_of(&target, BuildPhaseType::Sources).unwrap();
        assert_eq!(sources.id().as_str(), "S");
        assert_eq!(
            store.build_phase_or_insert(&target, BuildPhaseType::Sources).unwrap(),
            sources
        );
        assert!(store.build_phase_of(&target, BuildPhaseType::Resources).is_none());

        let resources = store.build_phase_or_insert(&target, BuildPhaseType::Resources).unwrap();
        let phases = &store.get(&target).unwrap().build_phases;
        assert_eq!(phases.last(), Some(&resources));
        assert_eq!(store.ref_count(resources.id()), 1);
        let raw = store.resolve(resources.id()).unwrap().fields();
        assert_eq!(raw["isa"], json!("PBXResourcesBuildPhase"));
        assert_eq!(raw["buildActionMask"], json!("2147483647"));
    }

    #[test]
    fn build_phase_insert_with_custom_position() {
        let mut store = sample();
        let target: Handle<Target> = Handle::detached(ObjectId::from("T"));
        let script = store
            .build_phase_or_insert_with(
                &target,
                PhaseKind::ShellScript(ShellScript::new("Lint", "swiftlint")),
                |phase| phase.name() == Some("Lint"),
                |phases, phase| phases.insert(0, phase),
            )
            .unwrap();
        assert_eq!(store.get(&target).unwrap().build_phases[0], script);

        let again = store
            .build_phase_or_insert_with(
                &target,
                PhaseKind::ShellScript(ShellScript::new("Lint", "other")),
                |phase| phase.name() == Some("Lint"),
                Vec::push,
            )
            .unwrap();
        assert_eq!(again, script);
        assert_eq!(store.get(&target).unwrap().build_phases.len(), 3);
    }
}
