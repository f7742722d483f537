//! Record store
//!
//! [`ObjectStore`] is the arena owning every record of one project file.
//! Records are keyed by [`ObjectId`]; graph edges are [`Handle`]s resolved
//! against the store on demand.
//!
//! # Reference counting
//! Each identifier has a count of the handles stored in record fields (plus
//! any counted handle held by a caller). Decoding a record retains every
//! reference it holds; [`ObjectStore::insert`] retains the inserted record
//! once. A record is evicted when its count drops from 1 to 0. Releasing an
//! identifier whose count is already 0 is a [`StoreError::OverRelease`].
//!
//! Counts may exist for identifiers with no record (a reference decoded
//! before its target, or a dangling one) and records may exist with a count
//! of 0 (orphans); the validator reports both.

use crate::error::{DecodeError, StoreError};
use crate::fields::Fields;
use crate::handle::Handle;
use crate::id::{ObjectId, PbxIdentifier};
use crate::object::{Group, Object, Record, RecordKind};
use crate::paths;
use crate::source_tree::ElementPath;
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Number of structured candidates tried by [`ObjectStore::fresh_id`]
pub const FRESH_ID_ATTEMPTS: u32 = 10;

/// Arena of records with per-identifier reference counts
#[derive(Debug, Clone, Default)]
pub struct ObjectStore {
    records: IndexMap<ObjectId, Record>,
    ref_counts: HashMap<ObjectId, usize>,
    derived_paths: BTreeMap<ObjectId, ElementPath>,
}

impl ObjectStore {
    /// Empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode every record of an `objects` dictionary
    ///
    /// Records are stored in document order without being retained; counts
    /// come from the references the records hold.
    ///
    /// # Errors
    /// The first record that fails to decode aborts the whole load.
    pub fn decode(objects: &Fields) -> Result<Self, DecodeError> {
        let mut store = Self::new();
        for (key, value) in objects {
            let id = ObjectId::from(key.as_str());
            let fields = value
                .as_object()
                .cloned()
                .ok_or_else(|| DecodeError::InvalidDocument {
                    key: format!("objects.{key}"),
                    expected: "a dictionary",
                })?;
            let record = Record::decode(id, fields, &mut store)?;
            store.insert_decoded(record);
        }
        tracing::debug!(records = store.len(), "decoded object store");
        Ok(store)
    }

    /// Write every record's typed state into its raw bag and collect the bags
    pub fn encode(&mut self) -> Fields {
        self.apply_changes();
        self.records
            .iter()
            .map(|(id, record)| (id.to_string(), Value::Object(record.fields().clone())))
            .collect()
    }

    /// Run [`Record::apply_changes`] on every record
    pub fn apply_changes(&mut self) {
        for record in self.records.values_mut() {
            record.apply_changes();
        }
    }

    /// Number of stored records
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if no records are stored
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True if a record is stored under `id`
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.records.contains_key(id)
    }

    /// Stored records, in insertion order
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    /// Identifiers with a positive reference count
    pub fn referenced_ids(&self) -> impl Iterator<Item = &ObjectId> {
        self.ref_counts
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(id, _)| id)
    }

    /// Record by identifier; never touches counts
    #[inline]
    #[must_use]
    pub fn resolve(&self, id: &ObjectId) -> Option<&Record> {
        self.records.get(id)
    }

    /// Mutable record by identifier
    #[inline]
    pub fn resolve_mut(&mut self, id: &ObjectId) -> Option<&mut Record> {
        self.records.get_mut(id)
    }

    /// Resolve a handle and narrow to its kind
    ///
    /// `None` if the target is missing or of another kind.
    #[must_use]
    pub fn get<T: RecordKind>(&self, handle: &Handle<T>) -> Option<&T::View> {
        self.resolve(handle.id()).and_then(|r| T::narrow(r.object()))
    }

    /// Mutable variant of [`get`](Self::get)
    pub fn get_mut<T: RecordKind>(&mut self, handle: &Handle<T>) -> Option<&mut T::View> {
        self.resolve_mut(handle.id())
            .and_then(|r| T::narrow_mut(r.object_mut()))
    }

    /// Like [`get`](Self::get), telling a missing target from a wrong kind
    ///
    /// # Errors
    /// `Missing` or `WrongKind`.
    pub fn try_get<T: RecordKind>(&self, handle: &Handle<T>) -> Result<&T::View, StoreError> {
        let record = self.resolve(handle.id()).ok_or_else(|| StoreError::Missing {
            id: handle.id().clone(),
            expected: T::NAME,
        })?;
        T::narrow(record.object()).ok_or_else(|| StoreError::WrongKind {
            id: handle.id().clone(),
            expected: T::NAME,
            actual: record.isa().to_string(),
        })
    }

    /// Mutable variant of [`try_get`](Self::try_get)
    ///
    /// # Errors
    /// `Missing` or `WrongKind`.
    pub fn try_get_mut<T: RecordKind>(
        &mut self,
        handle: &Handle<T>,
    ) -> Result<&mut T::View, StoreError> {
        let record = self
            .records
            .get_mut(handle.id())
            .ok_or_else(|| StoreError::Missing {
                id: handle.id().clone(),
                expected: T::NAME,
            })?;
        let actual = record.isa();
        T::narrow_mut(record.object_mut()).ok_or_else(|| StoreError::WrongKind {
            id: handle.id().clone(),
            expected: T::NAME,
            actual: actual.to_string(),
        })
    }

    /// Current reference count of `id`
    #[inline]
    #[must_use]
    pub fn ref_count(&self, id: &ObjectId) -> usize {
        self.ref_counts.get(id).copied().unwrap_or(0)
    }

    /// Take a counted reference to `id`
    ///
    /// The target need not exist yet. The null identifier is never counted.
    pub fn retain<T>(&mut self, id: &ObjectId) -> Handle<T> {
        if !id.is_null() {
            *self.ref_counts.entry(id.clone()).or_insert(0) += 1;
        }
        Handle::new(id.clone())
    }

    /// Take another counted reference to a handle's target
    pub fn share<T>(&mut self, handle: &Handle<T>) -> Handle<T> {
        self.retain(handle.id())
    }

    /// Retain each identifier in order
    pub fn retain_all<T>(&mut self, ids: &[ObjectId]) -> Vec<Handle<T>> {
        ids.iter().map(|id| self.retain(id)).collect()
    }

    /// Retain every stored record of kind `T`
    pub fn retain_typed<T: RecordKind>(&mut self) -> Vec<Handle<T>> {
        let ids: Vec<ObjectId> = self.handles_of::<T>().into_iter().map(Handle::into_id).collect();
        self.retain_all(&ids)
    }

    /// Uncounted handles to every stored record of kind `T`
    #[must_use]
    pub fn handles_of<T: RecordKind>(&self) -> Vec<Handle<T>> {
        self.records
            .values()
            .filter(|r| T::narrow(r.object()).is_some())
            .map(|r| Handle::new(r.id().clone()))
            .collect()
    }

    /// Store a record under its own identifier and retain it once
    ///
    /// A record already stored under that identifier is replaced; its count
    /// carries over.
    pub fn insert<T>(&mut self, record: Record) -> Handle<T> {
        let id = record.id().clone();
        if self.records.insert(id.clone(), record).is_some() {
            tracing::warn!(%id, "replaced existing record");
        }
        self.retain(&id)
    }

    /// Store a new payload under a fresh identifier derived from `seed`
    pub fn create<T>(&mut self, seed: &ObjectId, object: impl Into<Object>) -> Handle<T> {
        self.create_with_fields(seed, Fields::new(), object)
    }

    /// Like [`create`](Self::create), seeding unmodeled raw fields
    pub fn create_with_fields<T>(
        &mut self,
        seed: &ObjectId,
        fields: Fields,
        object: impl Into<Object>,
    ) -> Handle<T> {
        let id = self.fresh_id(seed);
        let mut record = Record::with_fields(id, fields, object);
        record.apply_changes();
        self.insert(record)
    }

    pub(crate) fn insert_decoded(&mut self, record: Record) {
        self.records.insert(record.id().clone(), record);
    }

    /// Give back one counted reference
    ///
    /// Returns the evicted record when the count drops to zero. Releasing the
    /// null handle does nothing.
    ///
    /// # Errors
    /// `OverRelease` if the count is already zero; the store is unchanged.
    pub fn release<T>(&mut self, handle: Handle<T>) -> Result<Option<Record>, StoreError> {
        self.release_id(handle.id())
    }

    /// Release every handle, stopping at the first over-release
    ///
    /// # Errors
    /// `OverRelease` from the first failing release.
    pub fn release_all<T, I>(&mut self, handles: I) -> Result<Vec<Record>, StoreError>
    where
        I: IntoIterator<Item = Handle<T>>,
    {
        let mut evicted = Vec::new();
        for handle in handles {
            evicted.extend(self.release(handle)?);
        }
        Ok(evicted)
    }

    /// Release a handle and, for every evicted record, the references it held
    ///
    /// Returns the number of records evicted.
    ///
    /// # Errors
    /// `OverRelease` if any count on the way is already zero.
    pub fn release_cascading<T>(&mut self, handle: Handle<T>) -> Result<usize, StoreError> {
        let mut pending = vec![handle.into_id()];
        let mut evicted = 0;
        while let Some(id) = pending.pop() {
            if let Some(record) = self.release_id(&id)? {
                evicted += 1;
                pending.extend(record.references().iter().map(|edge| edge.target.clone()));
            }
        }
        Ok(evicted)
    }

    fn release_id(&mut self, id: &ObjectId) -> Result<Option<Record>, StoreError> {
        if id.is_null() {
            return Ok(None);
        }
        let Some(count) = self.ref_counts.get_mut(id).filter(|count| **count > 0) else {
            tracing::error!(%id, "release with reference count zero");
            return Err(StoreError::OverRelease { id: id.clone() });
        };
        *count -= 1;
        if *count > 0 {
            return Ok(None);
        }
        self.ref_counts.remove(id);
        let evicted = self.records.shift_remove(id);
        if evicted.is_some() {
            self.derived_paths.remove(id);
            tracing::trace!(%id, "evicted record");
        }
        Ok(evicted)
    }

    fn is_taken(&self, id: &ObjectId) -> bool {
        id.is_null() || self.records.contains_key(id) || self.ref_count(id) > 0
    }

    /// Identifier not used by any record or reference
    ///
    /// A seed in Xcode's 24-digit form yields up to
    /// [`FRESH_ID_ATTEMPTS`] neighbours of the seed (same origin, stepped
    /// sequence). Other seeds, or a seed whose neighbours are all taken, get
    /// a random identifier.
    #[must_use]
    pub fn fresh_id(&self, seed: &ObjectId) -> ObjectId {
        if let Ok(structured) = PbxIdentifier::try_from(seed) {
            for step in 1..=FRESH_ID_ATTEMPTS {
                let candidate = structured.successor(step).to_object_id();
                if !self.is_taken(&candidate) {
                    return candidate;
                }
            }
            tracing::debug!(%seed, "structured candidates exhausted, using random identifier");
        }
        loop {
            let candidate = ObjectId::random();
            if !self.is_taken(&candidate) {
                return candidate;
            }
        }
    }

    /// Recompute derived paths by walking the group tree from `main_group`
    pub fn refresh_paths(&mut self, main_group: &Handle<Group>) {
        self.derived_paths = paths::resolve_paths(self, main_group);
        tracing::debug!(paths = self.derived_paths.len(), "resolved element paths");
    }

    /// Derived path of a group or file reference
    #[inline]
    #[must_use]
    pub fn path_of(&self, id: &ObjectId) -> Option<&ElementPath> {
        self.derived_paths.get(id)
    }

    /// Every derived path, by identifier
    #[inline]
    #[must_use]
    pub fn derived_paths(&self) -> &BTreeMap<ObjectId, ElementPath> {
        &self.derived_paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{BuildFile, ContainerItemProxy, FileElement, Isa};
    use crate::source_tree::SourceTree;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn proxy(id: &str) -> Record {
        Record::new(ObjectId::from(id), ContainerItemProxy)
    }

    #[test]
    fn insert_retains_once_and_release_evicts() {
        let mut store = ObjectStore::new();
        let handle: Handle<ContainerItemProxy> = store.insert(proxy("A"));
        assert_eq!(store.ref_count(&ObjectId::from("A")), 1);

        let second = store.share(&handle);
        assert_eq!(store.ref_count(handle.id()), 2);
        assert!(store.release(second).unwrap().is_none());
        assert!(store.contains(handle.id()));

        let evicted = store.release(handle).unwrap().unwrap();
        assert_eq!(evicted.id().as_str(), "A");
        assert!(!store.contains(&ObjectId::from("A")));
    }

    #[test]
    fn over_release_is_an_error() {
        let mut store = ObjectStore::new();
        store.insert_decoded(proxy("A"));
        let err = store
            .release(Handle::<ContainerItemProxy>::detached(ObjectId::from("A")))
            .unwrap_err();
        assert_eq!(err, StoreError::OverRelease { id: ObjectId::from("A") });
        assert!(store.contains(&ObjectId::from("A")));
    }

    #[test]
    fn retain_before_insert_is_legal() {
        let mut store = ObjectStore::new();
        let early: Handle<ContainerItemProxy> = store.retain(&ObjectId::from("LATER"));
        assert!(store.get(&early).is_none());
        store.insert_decoded(proxy("LATER"));
        assert!(store.get(&early).is_some());
        assert_eq!(store.ref_count(early.id()), 1);
    }

    #[test]
    fn null_is_never_counted() {
        let mut store = ObjectStore::new();
        let null: Handle<ContainerItemProxy> = store.retain(&ObjectId::null());
        assert_eq!(store.ref_count(&ObjectId::null()), 0);
        assert_eq!(store.release(null), Ok(None));
    }

    #[test]
    fn typed_resolution_reports_mismatch() {
        let mut store = ObjectStore::new();
        let handle: Handle<ContainerItemProxy> = store.insert(proxy("A"));
        let wrong: Handle<BuildFile> = handle.clone().cast();
        assert!(store.get(&wrong).is_none());
        assert_eq!(
            store.try_get(&wrong).unwrap_err(),
            StoreError::WrongKind {
                id: ObjectId::from("A"),
                expected: "build file",
                actual: "PBXContainerItemProxy".into(),
            }
        );
        let missing: Handle<BuildFile> = Handle::detached(ObjectId::from("B"));
        assert!(matches!(store.try_get(&missing), Err(StoreError::Missing { .. })));
    }

    #[test]
    fn retain_typed_counts_matches_only() {
        let mut store = ObjectStore::new();
        store.insert_decoded(proxy("P"));
        store.insert_decoded(Record::new(
            ObjectId::from("G"),
            FileElement::group(None, None, SourceTree::Group),
        ));
        let groups = store.retain_typed::<Group>();
        assert_eq!(groups.len(), 1);
        assert_eq!(store.ref_count(&ObjectId::from("G")), 1);
        assert_eq!(store.ref_count(&ObjectId::from("P")), 0);
    }

    #[test]
    fn fresh_id_steps_structured_seed() {
        let mut store = ObjectStore::new();
        let seed = ObjectId::from("13B07F961A680F5B00A75B9A");
        store.insert_decoded(Record::new(seed.clone(), ContainerItemProxy));
        store.insert_decoded(proxy("13B07F961A680F5C00A75B9A"));
        assert_eq!(store.fresh_id(&seed).as_str(), "13B07F961A680F5D00A75B9A");
    }

    #[test]
    fn fresh_id_avoids_pending_references() {
        let mut store = ObjectStore::new();
        let seed = ObjectId::from("13B07F961A680F5B00A75B9A");
        let _pending: Handle<ContainerItemProxy> =
            store.retain(&ObjectId::from("13B07F961A680F5C00A75B9A"));
        assert_eq!(store.fresh_id(&seed).as_str(), "13B07F961A680F5D00A75B9A");
    }

    #[test]
    fn fresh_id_falls_back_after_ten_collisions() {
        let mut store = ObjectStore::new();
        let seed: PbxIdentifier = "13B07F961A680F5B00A75B9A".parse().unwrap();
        for step in 1..=FRESH_ID_ATTEMPTS {
            store.insert_decoded(Record::new(seed.successor(step).to_object_id(), ContainerItemProxy));
        }
        let fresh = store.fresh_id(&seed.to_object_id());
        assert!(!store.contains(&fresh));
        assert_eq!(fresh.as_str().len(), PbxIdentifier::TEXT_LEN);
    }

    #[test]
    fn fresh_id_for_unstructured_seed_is_random() {
        let store = ObjectStore::new();
        let fresh = store.fresh_id(&ObjectId::from("not-structured"));
        assert!(fresh.as_str().parse::<PbxIdentifier>().is_ok());
    }

    #[test]
    fn create_writes_raw_fields() {
        let mut store = ObjectStore::new();
        let seed = ObjectId::from("13B07F961A680F5B00A75B9A");
        let handle: Handle<ContainerItemProxy> = store.create(&seed, ContainerItemProxy);
        let record = store.resolve(handle.id()).unwrap();
        assert_eq!(record.isa(), Isa::ContainerItemProxy);
        assert_eq!(record.fields()["isa"], json!("PBXContainerItemProxy"));
        assert_eq!(store.ref_count(handle.id()), 1);
    }

    #[test]
    fn release_cascading_follows_owned_edges() {
        let objects = json!({
            "G": {"isa": "PBXGroup", "children": ["F"], "sourceTree": "<group>"},
            "F": {"isa": "PBXFileReference", "path": "a.c", "sourceTree": "<group>"},
        });
        let mut store = ObjectStore::decode(objects.as_object().unwrap()).unwrap();
        let group: Handle<Group> = store.retain(&ObjectId::from("G"));
        assert_eq!(store.release_cascading(group), Ok(2));
        assert!(store.is_empty());
    }

    #[test]
    fn decode_rejects_non_dictionary_records() {
        let objects = json!({"X": ["not", "a", "record"]});
        let err = ObjectStore::decode(objects.as_object().unwrap()).unwrap_err();
        assert_eq!(
            err,
            DecodeError::InvalidDocument {
                key: "objects.X".into(),
                expected: "a dictionary",
            }
        );
    }
}
