//! Error types for the object graph
//!
//! - [`DecodeError`]: a raw document cannot be turned into typed records.
//!   Fatal for a load; a malformed document is never partially loaded.
//! - [`StoreError`]: misuse of the record store or a handle that does not
//!   resolve to what the caller needs.
//!
//! Reference violations (dangling and orphaned records) are aggregated in
//! [`ValidationReport`](crate::ValidationReport) instead.

use crate::id::ObjectId;

/// Errors while decoding raw records
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Required key absent from a record
    #[error("{isa} ({id}) is missing required field '{key}'")]
    FieldMissing {
        isa: String,
        id: ObjectId,
        key: String,
    },

    /// Key present with a value of the wrong shape
    #[error("{isa} ({id}) field '{key}' has the wrong type, expected {expected}")]
    WrongType {
        isa: String,
        id: ObjectId,
        key: String,
        expected: &'static str,
    },

    /// Discriminator names no known record type
    #[error("object {id} has unknown isa '{isa}'")]
    UnknownIsa { isa: String, id: ObjectId },

    /// Top-level document key absent or malformed
    #[error("document key '{key}' is missing or is not {expected}")]
    InvalidDocument { key: String, expected: &'static str },

    /// Referenced object required for loading is absent
    #[error("required object {id} is missing")]
    ObjectMissing { id: ObjectId },

    /// Root object exists but is not a project
    #[error("root object {id} is a {isa}, expected PBXProject")]
    RootNotProject { id: ObjectId, isa: String },
}

/// Errors raised by the record store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Release on an identifier whose count is already zero
    ///
    /// Always a bug in the caller, never a property of input data.
    #[error("released {id} with reference count zero")]
    OverRelease { id: ObjectId },

    /// Handle target not present
    #[error("{expected} {id} not found")]
    Missing { id: ObjectId, expected: &'static str },

    /// Handle target present but of another record kind
    #[error("object {id} is a {actual}, expected {expected}")]
    WrongKind {
        id: ObjectId,
        expected: &'static str,
        actual: String,
    },
}

impl StoreError {
    /// Identifier the error is about
    #[inline]
    #[must_use]
    pub fn id(&self) -> &ObjectId {
        match self {
            Self::OverRelease { id } | Self::Missing { id, .. } | Self::WrongKind { id, .. } => id,
        }
    }

    /// True if the error signals store misuse rather than a missing record
    #[inline]
    #[must_use]
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::OverRelease { .. })
    }
}
