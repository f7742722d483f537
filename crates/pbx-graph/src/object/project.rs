//! Root project record
//!
//! One per document, named by `rootObject`. Everything else hangs off its
//! main group and its targets.

use super::{ConfigurationList, Decoder, Edge, Group, Object, Target};
use crate::error::DecodeError;
use crate::fields::{self, Fields};
use crate::handle::Handle;
use crate::store::ObjectStore;
use serde_json::Value;

/// Root record of a project file
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    /// Project-level configurations
    pub build_configuration_list: Handle<ConfigurationList>,
    /// Development region, e.g. `en`
    pub development_region: String,
    /// Whether Xcode scanned the sources for text encodings
    pub has_scanned_for_encodings: bool,
    /// Localizations known to the project
    pub known_regions: Vec<String>,
    /// Root of the group tree
    pub main_group: Handle<Group>,
    /// Targets, in display order
    pub targets: Vec<Handle<Target>>,
    /// References to other projects; `None` when the key is absent
    pub project_references: Option<Vec<ProjectReference>>,
}

/// Reference to another project file embedded in this one
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectReference {
    /// Group holding the other project's products
    pub product_group: Handle<Group>,
    /// File reference to the other `.xcodeproj`
    pub project_ref: Handle<super::FileReference>,
}

impl Project {
    pub(super) fn decode(d: &mut Decoder<'_>) -> Result<Object, DecodeError> {
        let development_region = d.string("developmentRegion")?;
        let has_scanned_for_encodings = d.bool("hasScannedForEncodings")?;
        let known_regions = d.strings("knownRegions")?;
        let build_configuration_list = d.handle("buildConfigurationList")?;
        let main_group = d.handle("mainGroup")?;
        let targets = d.handles("targets")?;

        let project_references = match d.optional_objects("projectReferences")? {
            None => None,
            Some(items) => {
                let mut references = Vec::with_capacity(items.len());
                for item in items {
                    references.push(ProjectReference {
                        product_group: d.nested_handle(
                            item,
                            "ProductGroup",
                            "projectReferences.ProductGroup",
                        )?,
                        project_ref: d.nested_handle(
                            item,
                            "ProjectRef",
                            "projectReferences.ProjectRef",
                        )?,
                    });
                }
                Some(references)
            }
        };

        Ok(Object::Project(Self {
            build_configuration_list,
            development_region,
            has_scanned_for_encodings,
            known_regions,
            main_group,
            targets,
            project_references,
        }))
    }

    pub(super) fn encode(&self, fields: &mut Fields) {
        fields::put_id(fields, "buildConfigurationList", &self.build_configuration_list);
        fields::put_string(fields, "developmentRegion", &self.development_region);
        fields::put_bool(fields, "hasScannedForEncodings", self.has_scanned_for_encodings);
        fields::put_strings(fields, "knownRegions", &self.known_regions);
        fields::put_id(fields, "mainGroup", &self.main_group);
        fields::put_ids(fields, "targets", &self.targets);

        match &self.project_references {
            None => {
                fields.shift_remove("projectReferences");
            }
            Some(references) => {
                let existing = fields
                    .get("projectReferences")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                let list = references
                    .iter()
                    .enumerate()
                    .map(|(index, reference)| {
                        let mut entry = existing
                            .get(index)
                            .and_then(Value::as_object)
                            .cloned()
                            .unwrap_or_default();
                        fields::put_id(&mut entry, "ProductGroup", &reference.product_group);
                        fields::put_id(&mut entry, "ProjectRef", &reference.project_ref);
                        Value::Object(entry)
                    })
                    .collect();
                fields.insert("projectReferences".to_string(), Value::Array(list));
            }
        }
    }

    pub(super) fn collect_references<'a>(&'a self, edges: &mut Vec<Edge<'a>>) {
        edges.push(Edge::new("buildConfigurationList", self.build_configuration_list.id()));
        edges.push(Edge::new("mainGroup", self.main_group.id()));
        edges.extend(self.targets.iter().map(|h| Edge::new("targets", h.id())));
        for reference in self.project_references.iter().flatten() {
            edges.push(Edge::new(
                "projectReferences.ProductGroup",
                reference.product_group.id(),
            ));
            edges.push(Edge::new(
                "projectReferences.ProjectRef",
                reference.project_ref.id(),
            ));
        }
    }

    /// Every group in the store
    ///
    /// Derived on demand; the handles are not counted. A loaded project file
    /// holds its own counted handle to each group present at load.
    #[must_use]
    pub fn groups(&self, store: &ObjectStore) -> Vec<Handle<Group>> {
        store.handles_of::<Group>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ObjectId;
    use crate::object::Record;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn project_fields() -> Fields {
        json!({
            "isa": "PBXProject",
            "buildConfigurationList": "L",
            "developmentRegion": "en",
            "hasScannedForEncodings": "0",
            "knownRegions": ["en", "Base"],
            "mainGroup": "G",
            "targets": ["T1", "T2"],
            "attributes": {"LastUpgradeCheck": "1500"},
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn decode_retains_every_reference() {
        let mut store = ObjectStore::new();
        let record = Record::decode(ObjectId::from("P"), project_fields(), &mut store).unwrap();
        let Object::Project(project) = record.object() else {
            panic!("expected project");
        };
        assert_eq!(project.development_region, "en");
        assert!(!project.has_scanned_for_encodings);
        assert_eq!(project.targets.len(), 2);
        assert_eq!(project.project_references, None);
        for id in ["L", "G", "T1", "T2"] {
            assert_eq!(store.ref_count(&ObjectId::from(id)), 1);
        }
    }

    #[test]
    fn encode_is_stable_and_keeps_unmodeled_keys() {
        let mut store = ObjectStore::new();
        let raw = project_fields();
        let mut record = Record::decode(ObjectId::from("P"), raw.clone(), &mut store).unwrap();
        record.apply_changes();
        assert_eq!(record.fields(), &raw);
    }

    #[test]
    fn project_references_use_dotted_key_paths() {
        let mut raw = project_fields();
        raw.insert(
            "projectReferences".into(),
            json!([{"ProductGroup": "PG", "ProjectRef": "PR"}]),
        );
        let mut store = ObjectStore::new();
        let record = Record::decode(ObjectId::from("P"), raw, &mut store).unwrap();
        let paths: Vec<_> = record
            .references()
            .iter()
            .map(|edge| (edge.key_path, edge.target.to_string()))
            .collect();
        assert!(paths.contains(&("projectReferences.ProductGroup", "PG".to_string())));
        assert!(paths.contains(&("projectReferences.ProjectRef", "PR".to_string())));
    }

    #[test]
    fn missing_nested_field_names_key_path() {
        let mut raw = project_fields();
        raw.insert("projectReferences".into(), json!([{"ProductGroup": "PG"}]));
        let mut store = ObjectStore::new();
        let err = Record::decode(ObjectId::from("P"), raw, &mut store).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::FieldMissing { ref key, .. } if key == "projectReferences.ProjectRef"
        ));
    }
}
