use pbx_graph::{Group, Handle, Isa, ObjectId, ObjectStore, ReferenceError, ReferenceValidator};
use pbx_test_utils::{file_reference, group, ids, sample_builder, sample_objects};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{Map, Value};

fn load(objects: &Map<String, Value>, root: &str) -> ObjectStore {
    let mut store = ObjectStore::decode(objects).unwrap();
    let _root: Handle<Group> = store.retain(&ObjectId::from(root));
    store
}

proptest! {
    #[test]
    fn prop_reports_exactly_the_introduced_violations(
        live in 0usize..6,
        dead in 0usize..6,
        orphans in 0usize..6,
    ) {
        let mut children: Vec<String> = (0..live).map(|i| format!("LIVE{i}")).collect();
        children.extend((0..dead).map(|i| format!("DEAD{i}")));
        let child_refs: Vec<&str> = children.iter().map(String::as_str).collect();

        let mut objects = Map::new();
        objects.insert("ROOT".into(), group(&child_refs, None, "<group>"));
        for i in 0..live {
            objects.insert(format!("LIVE{i}"), file_reference("a.c", "<group>", "sourcecode.c.c"));
        }
        for i in 0..orphans {
            objects.insert(format!("ORPHAN{i}"), file_reference("b.c", "<group>", "sourcecode.c.c"));
        }

        let store = load(&objects, "ROOT");
        let report = ReferenceValidator::new().validate(&store);
        prop_assert_eq!(report.dead_references().count(), dead);
        prop_assert_eq!(report.orphans().count(), orphans);
        prop_assert_eq!(report.len(), dead + orphans);
    }
}

#[test]
fn sample_project_is_consistent() {
    let store = load(&sample_objects(), ids::PROJECT);
    assert!(ReferenceValidator::new().validate(&store).is_empty());
}

#[test]
fn one_unreferenced_record_among_five_is_the_only_orphan() {
    let mut objects = Map::new();
    objects.insert("ROOT".into(), group(&["F1", "F2", "F3", "F4"], None, "<group>"));
    for id in ["F1", "F2", "F3", "F4", "F5"] {
        objects.insert(id.into(), file_reference("x.c", "<group>", "sourcecode.c.c"));
    }
    let store = load(&objects, "ROOT");

    let report = ReferenceValidator::new().validate(&store);
    assert_eq!(
        report.errors(),
        &[ReferenceError::OrphanObject {
            isa: Isa::FileReference,
            id: ObjectId::from("F5"),
        }]
    );
}

#[test]
fn removed_record_is_reported_with_its_key_path() {
    let objects = sample_builder().without(ids::LIB_A).objects().clone();
    let store = load(&objects, ids::PROJECT);

    let report = ReferenceValidator::new().validate(&store);
    let dead: Vec<String> = report.dead_references().map(ToString::to_string).collect();
    assert_eq!(
        dead,
        vec![
            format!("PBXGroup ({}) references missing children {}", ids::VENDOR_GROUP, ids::LIB_A),
            format!("PBXBuildFile ({}) references missing fileRef {}", ids::LIB_A_BUILD, ids::LIB_A),
        ]
    );
    assert_eq!(report.orphans().count(), 0);
}

#[test]
fn both_scans_run_even_when_one_finds_nothing() {
    let mut objects = sample_objects();
    objects.insert("STRAY".into(), file_reference("stray.c", "<group>", "sourcecode.c.c"));
    let store = load(&objects, ids::PROJECT);

    let report = ReferenceValidator::new().validate(&store);
    assert_eq!(report.dead_references().count(), 0);
    assert_eq!(report.orphans().map(|e| e.id().as_str()).collect::<Vec<_>>(), vec!["STRAY"]);
}
