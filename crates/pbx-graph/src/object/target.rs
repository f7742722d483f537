//! Targets and the dependency edges between them

use super::{BuildPhase, ConfigurationList, ContainerItemProxy, Decoder, Edge, Isa, Object};
use crate::error::DecodeError;
use crate::fields::{self, Fields};
use crate::handle::Handle;

/// Target variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// `PBXAggregateTarget`
    Aggregate,
    /// `PBXLegacyTarget`
    Legacy,
    /// `PBXNativeTarget`
    Native,
}

impl TargetKind {
    /// Discriminator of targets of this kind
    #[must_use]
    pub const fn isa(self) -> Isa {
        match self {
            Self::Aggregate => Isa::AggregateTarget,
            Self::Legacy => Isa::LegacyTarget,
            Self::Native => Isa::NativeTarget,
        }
    }
}

/// A buildable target
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    /// Variant
    pub kind: TargetKind,
    /// Target-level configurations
    pub build_configuration_list: Handle<ConfigurationList>,
    /// Target name
    pub name: String,
    /// Product name
    pub product_name: String,
    /// Product type identifier, e.g. `com.apple.product-type.application`
    pub product_type: Option<String>,
    /// Build phases, in build order
    pub build_phases: Vec<Handle<BuildPhase>>,
    /// Dependencies on other targets
    pub dependencies: Vec<Handle<TargetDependency>>,
}

impl Target {
    /// Discriminator
    #[inline]
    #[must_use]
    pub fn isa(&self) -> Isa {
        self.kind.isa()
    }

    pub(super) fn decode(d: &mut Decoder<'_>) -> Result<Object, DecodeError> {
        let kind = match d.isa() {
            Isa::AggregateTarget => TargetKind::Aggregate,
            Isa::LegacyTarget => TargetKind::Legacy,
            _ => TargetKind::Native,
        };
        let name = d.string("name")?;
        let product_name = d.string("productName")?;
        let product_type = d.optional_string("productType")?;
        let build_configuration_list = d.handle("buildConfigurationList")?;
        let build_phases = d.handles("buildPhases")?;
        let dependencies = d.handles("dependencies")?;
        Ok(Object::Target(Self {
            kind,
            build_configuration_list,
            name,
            product_name,
            product_type,
            build_phases,
            dependencies,
        }))
    }

    pub(super) fn encode(&self, fields: &mut Fields) {
        fields::put_ids(fields, "buildPhases", &self.build_phases);
        fields::put_string(fields, "name", &self.name);
        fields::put_string(fields, "productName", &self.product_name);
        fields::put_optional_string(fields, "productType", self.product_type.as_deref());
        fields::put_id(fields, "buildConfigurationList", &self.build_configuration_list);
        fields::put_ids(fields, "dependencies", &self.dependencies);
    }

    pub(super) fn collect_references<'a>(&'a self, edges: &mut Vec<Edge<'a>>) {
        edges.push(Edge::new("buildConfigurationList", self.build_configuration_list.id()));
        edges.extend(self.build_phases.iter().map(|h| Edge::new("buildPhases", h.id())));
        edges.extend(self.dependencies.iter().map(|h| Edge::new("dependencies", h.id())));
    }
}

/// Dependency of a target on another target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDependency {
    /// Proxy naming the target, possibly in another project
    pub target_proxy: Option<Handle<ContainerItemProxy>>,
    /// Direct reference to a target of this project
    pub target: Option<Handle<Target>>,
}

impl TargetDependency {
    pub(super) fn decode(d: &mut Decoder<'_>) -> Result<Object, DecodeError> {
        let target_proxy = d.optional_handle("targetProxy")?;
        let target = d.optional_handle("target")?;
        Ok(Object::TargetDependency(Self {
            target_proxy,
            target,
        }))
    }

    pub(super) fn encode(&self, fields: &mut Fields) {
        fields::put_optional_id(fields, "target", self.target.as_ref());
        fields::put_optional_id(fields, "targetProxy", self.target_proxy.as_ref());
    }

    pub(super) fn collect_references<'a>(&'a self, edges: &mut Vec<Edge<'a>>) {
        edges.extend(self.target_proxy.iter().map(|h| Edge::new("targetProxy", h.id())));
        edges.extend(self.target.iter().map(|h| Edge::new("target", h.id())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ObjectId;
    use crate::object::Record;
    use crate::store::ObjectStore;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    #[test]
    fn aggregate_target_without_product_type() {
        let raw = json!({
            "isa": "PBXAggregateTarget",
            "buildConfigurationList": "L",
            "buildPhases": ["S"],
            "dependencies": [],
            "name": "Docs",
            "productName": "Docs",
        });
        let mut store = ObjectStore::new();
        let mut record =
            Record::decode(ObjectId::from("T"), raw.as_object().cloned().unwrap(), &mut store)
                .unwrap();
        assert_eq!(record.isa(), Isa::AggregateTarget);
        let Object::Target(target) = record.object() else {
            panic!("expected target");
        };
        assert_eq!(target.product_type, None);
        let edges: Vec<_> = record.references().iter().map(|e| e.key_path).collect();
        assert_eq!(edges, vec!["buildConfigurationList", "buildPhases"]);
        record.apply_changes();
        assert_eq!(Value::Object(record.fields().clone()), raw);
    }

    #[test]
    fn dependency_fields_are_optional() {
        let mut store = ObjectStore::new();
        let fields = json!({"isa": "PBXTargetDependency", "targetProxy": "X"})
            .as_object()
            .cloned()
            .unwrap();
        let record = Record::decode(ObjectId::from("D"), fields, &mut store).unwrap();
        let Object::TargetDependency(dependency) = record.object() else {
            panic!("expected dependency");
        };
        assert!(dependency.target.is_none());
        assert_eq!(dependency.target_proxy.as_ref().map(|h| h.id().as_str()), Some("X"));
    }

    #[test]
    fn target_requires_name() {
        let mut store = ObjectStore::new();
        let fields = json!({"isa": "PBXNativeTarget", "productName": "App"})
            .as_object()
            .cloned()
            .unwrap();
        let err = Record::decode(ObjectId::from("T"), fields, &mut store).unwrap_err();
        assert!(matches!(err, DecodeError::FieldMissing { ref key, .. } if key == "name"));
    }
}
