//! Typed handles
//!
//! A [`Handle<T>`] is a typed edge of the object graph: an [`ObjectId`] plus
//! the record kind the edge is expected to point at. Handles never own
//! records; they are resolved against an [`ObjectStore`](crate::ObjectStore)
//! on demand.

use crate::id::ObjectId;
use std::cmp::Ordering;
use std::fmt::{self, Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Typed reference to a record by identifier
///
/// # Invariants
/// - Equality, ordering and hashing use the identifier only
/// - Resolving may yield nothing: the target can be missing or of another kind
///
/// Handles obtained from [`ObjectStore::retain`](crate::ObjectStore::retain)
/// or [`ObjectStore::insert`](crate::ObjectStore::insert) are *counted*: each
/// one accounts for a single reference and should end up stored in a record
/// field or be given back with [`ObjectStore::release`](crate::ObjectStore::release).
/// Handles built with [`Handle::detached`] or returned by lookups are not
/// counted and are meant for navigation only.
pub struct Handle<T> {
    id: ObjectId,
    _kind: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    #[inline]
    pub(crate) fn new(id: ObjectId) -> Self {
        Self {
            id,
            _kind: PhantomData,
        }
    }

    /// Uncounted handle, for lookups only
    #[inline]
    #[must_use]
    pub fn detached(id: ObjectId) -> Self {
        Self::new(id)
    }

    /// Null handle (reserved empty identifier)
    #[inline]
    #[must_use]
    pub fn null() -> Self {
        Self::new(ObjectId::null())
    }

    /// Target identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    /// Consume into the target identifier
    #[inline]
    #[must_use]
    pub fn into_id(self) -> ObjectId {
        self.id
    }

    /// True if this is the null handle
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.id.is_null()
    }

    /// Reinterpret as a handle to another record kind
    ///
    /// Reference counts are untouched: a counted handle stays counted.
    #[inline]
    #[must_use]
    pub fn cast<U>(self) -> Handle<U> {
        Handle::new(self.id)
    }

    /// Uncounted copy of this handle
    #[inline]
    #[must_use]
    pub fn detach(&self) -> Self {
        Self::new(self.id.clone())
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        self.detach()
    }
}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Handle<T> {}

impl<T> PartialOrd for Handle<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Handle<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> Debug for Handle<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.id)
    }
}

impl<T> Display for Handle<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.id, f)
    }
}
